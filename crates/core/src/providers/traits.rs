use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::quote::RawQuote;
use crate::models::symbol::Symbol;

/// Abstraction over the quote web service.
///
/// The registry only ever talks to this trait, so tests and alternative
/// backends can stand in for the live HTTP endpoint.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch the current price and change for one symbol.
    ///
    /// Implementations map a non-success status to `CoreError::Provider` and
    /// an unreadable payload to `CoreError::Parse`. They never retry.
    async fn latest_quote(&self, symbol: &Symbol) -> Result<RawQuote, CoreError>;

    /// Public web page describing `symbol`.
    fn info_url(&self, symbol: &Symbol) -> String;
}
