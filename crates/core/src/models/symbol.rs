use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::CoreError;

/// A normalized stock ticker: trimmed, uppercased and never empty.
///
/// This is the identity key of the registry, so two inputs that differ only
/// in case or surrounding whitespace ("aapl ", "AAPL") are the same symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Normalize a single raw ticker.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidSymbol);
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    /// Split free-text entry on commas and normalize every token.
    ///
    /// Empty tokens are discarded and repeated tickers collapse to their first
    /// occurrence, so `"aapl, MSFT,,aapl"` yields `[AAPL, MSFT]`.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut symbols: Vec<Self> = Vec::new();
        for token in raw.split(',') {
            if let Ok(symbol) = Self::parse(token) {
                if !symbols.contains(&symbol) {
                    symbols.push(symbol);
                }
            }
        }
        symbols
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Symbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
