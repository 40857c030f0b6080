use crate::errors::CoreError;
use crate::models::quote::QuoteSnapshot;
use crate::models::symbol::Symbol;
use crate::providers::traits::QuoteProvider;

/// Turns one symbol into a display-ready [`QuoteSnapshot`].
///
/// A single provider lookup per call: no retries, no caching. Empty input is
/// rejected before any request is made.
pub struct QuoteRefresher {
    provider: Box<dyn QuoteProvider>,
}

impl QuoteRefresher {
    pub fn new(provider: Box<dyn QuoteProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch and round the latest quote for `symbol`.
    pub async fn fetch(&self, symbol: &str) -> Result<QuoteSnapshot, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        let raw = self.provider.latest_quote(&symbol).await?;
        Ok(QuoteSnapshot::from_raw(raw))
    }

    /// Public quote page for `symbol`.
    pub fn info_url(&self, symbol: &Symbol) -> String {
        self.provider.info_url(symbol)
    }
}
