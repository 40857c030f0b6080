use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::CoreError;

pub const DEFAULT_QUOTE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote";
pub const DEFAULT_INFO_URL: &str = "https://finance.yahoo.com/quote";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Panel configuration. Every field has a default, so a partial JSON
/// document (or `{}`) is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Quote endpoint queried with `?symbols=<SYMBOL>&lang=..&region=..`.
    pub quote_url: String,

    /// Base of the public quote page opened on item click (`<info_url>/<SYMBOL>`).
    pub info_url: String,

    pub lang: String,
    pub region: String,

    /// Upper bound on a single quote request.
    pub timeout_secs: u64,

    /// Emit registry traces at `info` instead of `debug`.
    pub debug: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            quote_url: DEFAULT_QUOTE_URL.to_string(),
            info_url: DEFAULT_INFO_URL.to_string(),
            lang: "en-US".to_string(),
            region: "US".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            debug: false,
        }
    }
}

impl PanelConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("Malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; a missing file yields the defaults.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.timeout_secs == 0 {
            return Err(CoreError::Config("timeout_secs must be greater than zero".into()));
        }
        if self.quote_url.trim().is_empty() {
            return Err(CoreError::Config("quote_url must not be empty".into()));
        }
        if self.info_url.trim().is_empty() {
            return Err(CoreError::Config("info_url must not be empty".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
