use crate::errors::CoreError;

/// Persistence collaborator for the ordered list of tracked symbols.
///
/// Only symbol strings are stored, never prices.
pub trait SymbolStore: Send + Sync {
    /// Human-readable description of where symbols live (for logs/notices).
    fn describe(&self) -> String;

    /// Read the stored symbols in order. A store that was never written
    /// yields an empty list.
    fn load(&self) -> Result<Vec<String>, CoreError>;

    /// Replace the stored symbols.
    fn save(&self, symbols: &[String]) -> Result<(), CoreError>;
}
