use std::sync::{Arc, Mutex};

use crate::errors::CoreError;
use super::traits::SymbolStore;

#[derive(Debug, Default)]
struct MemoryState {
    symbols: Vec<String>,
    writes: usize,
    fail_writes: bool,
}

/// In-process symbol store.
///
/// Clones share the same state, so a host can keep a handle after boxing
/// one copy into the registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `symbols`.
    pub fn with_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        store.lock().symbols = symbols.into_iter().map(Into::into).collect();
        store
    }

    /// Current stored symbols.
    pub fn symbols(&self) -> Vec<String> {
        self.lock().symbols.clone()
    }

    /// Number of successful `save` calls so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Make subsequent saves fail, simulating a read-only backend.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SymbolStore for MemoryStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn load(&self) -> Result<Vec<String>, CoreError> {
        Ok(self.symbols())
    }

    fn save(&self, symbols: &[String]) -> Result<(), CoreError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(CoreError::Persistence("memory store is read-only".into()));
        }
        state.symbols = symbols.to_vec();
        state.writes += 1;
        Ok(())
    }
}
