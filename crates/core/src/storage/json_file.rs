use std::path::{Path, PathBuf};

use crate::errors::CoreError;
use super::traits::SymbolStore;

/// Flat JSON file holding an array of symbol strings, e.g. `["AAPL","MSFT"]`.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SymbolStore for JsonFileStore {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Vec<String>, CoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&json).map_err(|e| {
            CoreError::Persistence(format!(
                "Symbols database {} is malformed: {e}",
                self.path.display()
            ))
        })
    }

    fn save(&self, symbols: &[String]) -> Result<(), CoreError> {
        let json = serde_json::to_string(symbols)
            .map_err(|e| CoreError::Persistence(format!("Failed to encode symbols: {e}")))?;
        write_replacing(&self.path, json.as_bytes())
    }
}

/// Write through a sibling temp file and rename, so a crash mid-write never
/// leaves a truncated database behind.
pub(crate) fn write_replacing(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
