use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::CoreError;
use crate::models::quote::RawQuote;
use crate::models::settings::PanelConfig;
use crate::models::symbol::Symbol;
use super::traits::QuoteProvider;

const PROVIDER_NAME: &str = "Yahoo Finance";
const CORS_DOMAIN: &str = "finance.yahoo.com";

/// Yahoo Finance v7 quote endpoint.
///
/// - **Free**: no API key required (unofficial public API).
/// - **Request**: `GET <quote_url>?lang=..&region=..&corsDomain=..&symbols=<SYMBOL>`
/// - **Response**: `{ quoteResponse: { result: [ { regularMarketPrice, ... } ] } }`,
///   only the first result entry is consumed.
///
/// Every request is bounded by the configured timeout; a timeout or
/// connection failure surfaces as `CoreError::Provider` without a status.
pub struct YahooQuoteProvider {
    client: Client,
    quote_url: String,
    info_url: String,
    lang: String,
    region: String,
}

impl YahooQuoteProvider {
    pub fn new(config: &PanelConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CoreError::Provider {
                status: None,
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            quote_url: config.quote_url.clone(),
            info_url: config.info_url.trim_end_matches('/').to_string(),
            lang: config.lang.clone(),
            region: config.region.clone(),
        })
    }
}

// ── Yahoo API response types ────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResponse,
}

#[derive(Deserialize)]
struct QuoteResponse {
    result: Vec<QuoteEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEntry {
    regular_market_price: Option<f64>,
    regular_market_change: Option<f64>,
    regular_market_change_percent: Option<f64>,
}

/// Parse a quote response body into the first entry's raw fields.
pub fn parse_quote_response(body: &str) -> Result<RawQuote, CoreError> {
    let envelope: QuoteEnvelope = serde_json::from_str(body)
        .map_err(|e| CoreError::Parse(format!("Malformed quote response: {e}")))?;
    first_quote(envelope)
}

fn first_quote(envelope: QuoteEnvelope) -> Result<RawQuote, CoreError> {
    let entry = envelope
        .quote_response
        .result
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::Parse("Quote response contains no results".into()))?;

    Ok(RawQuote {
        price: to_decimal("regularMarketPrice", entry.regular_market_price)?,
        change: to_decimal("regularMarketChange", entry.regular_market_change)?,
        change_percent: to_decimal(
            "regularMarketChangePercent",
            entry.regular_market_change_percent,
        )?,
    })
}

/// Convert through the shortest round-trip decimal text of the float, so
/// `-1.2345` arrives as exactly `-1.2345` rather than its binary neighbour.
fn to_decimal(field: &str, value: Option<f64>) -> Result<Decimal, CoreError> {
    let value = value.ok_or_else(|| CoreError::Parse(format!("Missing field {field}")))?;
    value
        .to_string()
        .parse()
        .map_err(|e| CoreError::Parse(format!("Invalid {field} value {value}: {e}")))
}

#[async_trait]
impl QuoteProvider for YahooQuoteProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn latest_quote(&self, symbol: &Symbol) -> Result<RawQuote, CoreError> {
        let resp = self
            .client
            .get(&self.quote_url)
            .query(&[
                ("lang", self.lang.as_str()),
                ("region", self.region.as_str()),
                ("corsDomain", CORS_DOMAIN),
                ("symbols", symbol.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::Provider {
                status: Some(status.as_u16()),
                message: format!("{PROVIDER_NAME} answered {status} for {symbol}"),
            });
        }

        let envelope: QuoteEnvelope = resp.json().await.map_err(|e| {
            CoreError::Parse(format!("Malformed quote response for {symbol}: {e}"))
        })?;
        first_quote(envelope)
    }

    fn info_url(&self, symbol: &Symbol) -> String {
        format!("{}/{}", self.info_url, symbol)
    }
}
