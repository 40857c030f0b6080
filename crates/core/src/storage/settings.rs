use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::errors::CoreError;
use super::json_file::write_replacing;
use super::traits::SymbolStore;

/// Settings key holding the tracked symbol list.
pub const STOCKS_KEY: &str = "stocks";

/// Settings key enabling verbose registry traces.
pub const DEBUG_KEY: &str = "debug";

/// Key-value settings document persisted as a JSON object.
///
/// Symbols live under the string-list key `stocks`; other keys (such as
/// `debug`) are preserved untouched when the symbol list is rewritten.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value of the `debug` key; absent means `false`.
    pub fn debug(&self) -> Result<bool, CoreError> {
        match self.read_map()?.get(DEBUG_KEY) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(CoreError::Persistence(format!(
                "Setting '{DEBUG_KEY}' must be a boolean, found {other}"
            ))),
        }
    }

    pub fn set_debug(&self, debug: bool) -> Result<(), CoreError> {
        let mut map = self.read_map()?;
        map.insert(DEBUG_KEY.to_string(), Value::Bool(debug));
        self.write_map(&map)
    }

    fn read_map(&self) -> Result<Map<String, Value>, CoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let json = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&json).map_err(|e| {
            CoreError::Persistence(format!(
                "Settings file {} is malformed: {e}",
                self.path.display()
            ))
        })
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| CoreError::Persistence(format!("Failed to encode settings: {e}")))?;
        write_replacing(&self.path, json.as_bytes())
    }
}

impl SymbolStore for SettingsStore {
    fn describe(&self) -> String {
        format!("{} [{STOCKS_KEY}]", self.path.display())
    }

    fn load(&self) -> Result<Vec<String>, CoreError> {
        match self.read_map()?.remove(STOCKS_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                CoreError::Persistence(format!(
                    "Setting '{STOCKS_KEY}' in {} is malformed: {e}",
                    self.path.display()
                ))
            }),
        }
    }

    fn save(&self, symbols: &[String]) -> Result<(), CoreError> {
        let mut map = self.read_map()?;
        map.insert(
            STOCKS_KEY.to_string(),
            Value::Array(symbols.iter().cloned().map(Value::String).collect()),
        );
        self.write_map(&map)
    }
}
