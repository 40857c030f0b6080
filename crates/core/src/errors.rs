use thiserror::Error;

/// Unified error type for the entire stonks-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input ───────────────────────────────────────────────────────
    #[error("Invalid symbol — unable to load price for an empty stock ticker")]
    InvalidSymbol,

    // ── Quote provider ──────────────────────────────────────────────
    #[error("Provider error{}: {message}", http_suffix(.status))]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    // ── Storage ─────────────────────────────────────────────────────
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── Configuration ───────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    /// HTTP status of a provider failure, if the provider answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CoreError::Provider { status, .. } => *status,
            _ => None,
        }
    }
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Parse(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors embed the full request URL; keep the path only.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Provider {
            status: e.status().map(|s| s.as_u16()),
            message: sanitized,
        }
    }
}
