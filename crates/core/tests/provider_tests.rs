// ═══════════════════════════════════════════════════════════════════
// Provider Tests — Yahoo response parsing, HTTP status handling,
// QuoteRefresher validation
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use stonks_core::errors::CoreError;
use stonks_core::models::quote::{DisplayMode, RawQuote};
use stonks_core::models::settings::PanelConfig;
use stonks_core::models::symbol::Symbol;
use stonks_core::providers::traits::QuoteProvider;
use stonks_core::providers::yahoo::{parse_quote_response, YahooQuoteProvider};
use stonks_core::services::quote_refresher::QuoteRefresher;

const AAPL_BODY: &str = r#"{"quoteResponse":{"result":[{"symbol":"AAPL","regularMarketPrice":187.4,"regularMarketChange":-1.2345,"regularMarketChangePercent":-0.654}],"error":null}}"#;

// ═══════════════════════════════════════════════════════════════════
// Test Helpers — stub HTTP server, counting provider
// ═══════════════════════════════════════════════════════════════════

/// Serve a single canned HTTP response; the join handle yields the raw request.
async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&request).into_owned()
    });
    (format!("http://{addr}/v7/finance/quote"), handle)
}

fn provider_for(url: &str) -> YahooQuoteProvider {
    let config = PanelConfig {
        quote_url: url.to_string(),
        timeout_secs: 2,
        ..PanelConfig::default()
    };
    YahooQuoteProvider::new(&config).unwrap()
}

fn aapl() -> Symbol {
    Symbol::parse("AAPL").unwrap()
}

struct CountingProvider {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl QuoteProvider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    async fn latest_quote(&self, _symbol: &Symbol) -> Result<RawQuote, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RawQuote {
            price: dec!(10),
            change: dec!(-1.2345),
            change_percent: dec!(0.5),
        })
    }

    fn info_url(&self, symbol: &Symbol) -> String {
        format!("https://example.test/{symbol}")
    }
}

// ═══════════════════════════════════════════════════════════════════
// Response parsing
// ═══════════════════════════════════════════════════════════════════

mod parsing {
    use super::*;

    #[test]
    fn first_result_fields() {
        let q = parse_quote_response(AAPL_BODY).unwrap();
        assert_eq!(q.price, dec!(187.4));
        assert_eq!(q.change, dec!(-1.2345));
        assert_eq!(q.change_percent, dec!(-0.654));
    }

    #[test]
    fn only_first_entry_is_used() {
        let body = r#"{"quoteResponse":{"result":[
            {"regularMarketPrice":1.5,"regularMarketChange":0.1,"regularMarketChangePercent":2.0},
            {"regularMarketPrice":99.0,"regularMarketChange":9.0,"regularMarketChangePercent":9.0}
        ]}}"#;
        let q = parse_quote_response(body).unwrap();
        assert_eq!(q.price, dec!(1.5));
    }

    #[test]
    fn integer_prices_parse() {
        let body = r#"{"quoteResponse":{"result":[{"regularMarketPrice":42,"regularMarketChange":0,"regularMarketChangePercent":0}]}}"#;
        let q = parse_quote_response(body).unwrap();
        assert_eq!(q.price, dec!(42));
        assert!(q.change.is_zero());
    }

    #[test]
    fn empty_result_is_parse_error() {
        let body = r#"{"quoteResponse":{"result":[],"error":null}}"#;
        assert!(matches!(parse_quote_response(body), Err(CoreError::Parse(_))));
    }

    #[test]
    fn missing_field_is_parse_error() {
        let body = r#"{"quoteResponse":{"result":[{"regularMarketPrice":1.0,"regularMarketChange":0.1}]}}"#;
        let err = parse_quote_response(body).unwrap_err();
        assert!(matches!(err, CoreError::Parse(ref m) if m.contains("regularMarketChangePercent")));
    }

    #[test]
    fn garbage_is_parse_error() {
        assert!(matches!(parse_quote_response("<html>"), Err(CoreError::Parse(_))));
        assert!(matches!(parse_quote_response("{}"), Err(CoreError::Parse(_))));
    }
}

// ═══════════════════════════════════════════════════════════════════
// YahooQuoteProvider over HTTP
// ═══════════════════════════════════════════════════════════════════

mod yahoo_http {
    use super::*;

    #[tokio::test]
    async fn success_sends_expected_query() {
        let (url, server) = serve_once("200 OK", AAPL_BODY).await;
        let quote = provider_for(&url).latest_quote(&aapl()).await.unwrap();
        assert_eq!(quote.price, dec!(187.4));

        let request = server.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert!(request_line.starts_with("GET /v7/finance/quote?"));
        assert!(request_line.contains("symbols=AAPL"));
        assert!(request_line.contains("lang=en-US"));
        assert!(request_line.contains("region=US"));
    }

    #[tokio::test]
    async fn server_error_carries_status() {
        let (url, server) = serve_once("500 Internal Server Error", "{}").await;
        let err = provider_for(&url).latest_quote(&aapl()).await.unwrap_err();
        assert!(matches!(err, CoreError::Provider { status: Some(500), .. }));
        assert_eq!(err.status_code(), Some(500));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn not_found_carries_status() {
        let (url, server) = serve_once("404 Not Found", "").await;
        let err = provider_for(&url).latest_quote(&aapl()).await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let (url, server) = serve_once("200 OK", "{\"quoteResponse\":").await;
        let err = provider_for(&url).latest_quote(&aapl()).await.unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn empty_result_list_over_http_is_parse_error() {
        let (url, server) = serve_once("200 OK", r#"{"quoteResponse":{"result":[]}}"#).await;
        let err = provider_for(&url).latest_quote(&aapl()).await.unwrap_err();
        assert!(matches!(err, CoreError::Parse(ref m) if m.contains("no results")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unresponsive_server_times_out_as_provider_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        });

        let config = PanelConfig {
            quote_url: format!("http://{addr}/quote"),
            timeout_secs: 1,
            ..PanelConfig::default()
        };
        let provider = YahooQuoteProvider::new(&config).unwrap();
        let err = provider.latest_quote(&aapl()).await.unwrap_err();
        assert!(matches!(err, CoreError::Provider { status: None, .. }));
        assert!(!err.to_string().contains("symbols="));
        server.abort();
    }

    #[test]
    fn info_url_appends_symbol() {
        let config = PanelConfig {
            info_url: "https://finance.yahoo.com/quote/".into(),
            ..PanelConfig::default()
        };
        let provider = YahooQuoteProvider::new(&config).unwrap();
        assert_eq!(provider.info_url(&aapl()), "https://finance.yahoo.com/quote/AAPL");
        assert_eq!(provider.name(), "Yahoo Finance");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PanelConfig {
            timeout_secs: 0,
            ..PanelConfig::default()
        };
        assert!(matches!(YahooQuoteProvider::new(&config), Err(CoreError::Config(_))));
    }
}

// ═══════════════════════════════════════════════════════════════════
// QuoteRefresher
// ═══════════════════════════════════════════════════════════════════

mod refresher {
    use super::*;

    fn counting() -> (QuoteRefresher, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let refresher = QuoteRefresher::new(Box::new(CountingProvider {
            calls: calls.clone(),
        }));
        (refresher, calls)
    }

    #[tokio::test]
    async fn empty_symbol_never_reaches_provider() {
        let (refresher, calls) = counting();
        assert!(matches!(refresher.fetch("").await, Err(CoreError::InvalidSymbol)));
        assert!(matches!(refresher.fetch("   ").await, Err(CoreError::InvalidSymbol)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn snapshot_is_rounded_and_labelled() {
        let (refresher, calls) = counting();
        let snapshot = refresher.fetch("aapl").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.price_label(), "10.00");
        assert_eq!(snapshot.change_label(DisplayMode::Absolute), "-1.235");
        assert_eq!(snapshot.change_label(DisplayMode::Percent), "+0.500%");
    }

    #[tokio::test]
    async fn http_failure_propagates() {
        let (url, server) = serve_once("503 Service Unavailable", "").await;
        let refresher = QuoteRefresher::new(Box::new(provider_for(&url)));
        let err = refresher.fetch("AAPL").await.unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        server.await.unwrap();
    }

    #[test]
    fn info_url_delegates_to_provider() {
        let (refresher, _) = counting();
        assert_eq!(refresher.info_url(&aapl()), "https://example.test/AAPL");
        assert_eq!(refresher.provider_name(), "counting");
    }
}
