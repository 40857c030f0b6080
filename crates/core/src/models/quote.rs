use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::symbol::Symbol;

/// Decimal places shown for the market price.
pub const PRICE_DECIMALS: u32 = 2;

/// Decimal places kept for absolute and percent change.
pub const CHANGE_DECIMALS: u32 = 3;

/// Placeholder shown for a row that has never been fetched.
pub const NOT_AVAILABLE: &str = "NA";

/// Raw quote fields as reported by a provider, before any rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuote {
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
}

/// Whether change labels show the currency delta or the percent delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    #[default]
    Absolute,
    Percent,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Absolute => DisplayMode::Percent,
            DisplayMode::Percent => DisplayMode::Absolute,
        }
    }

    /// Suffix appended to change labels.
    pub fn unit(self) -> &'static str {
        match self {
            DisplayMode::Absolute => "",
            DisplayMode::Percent => "%",
        }
    }
}

/// Visual state of a tracked row.
///
/// `Unknown` until the first successful fetch, then `Positive`/`Negative`;
/// any failed fetch greys every row out as `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayState {
    #[default]
    Unknown,
    Positive,
    Negative,
    Error,
}

impl DisplayState {
    pub fn is_ok(self) -> bool {
        matches!(self, DisplayState::Positive | DisplayState::Negative)
    }
}

/// A display-ready quote. Replaced wholesale on every successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    /// Market price, rounded to [`PRICE_DECIMALS`].
    pub price: Decimal,
    /// Signed currency change, rounded to [`CHANGE_DECIMALS`].
    pub absolute_change: Decimal,
    /// Signed percent change, rounded to [`CHANGE_DECIMALS`].
    pub percent_change: Decimal,
    pub fetched_at: DateTime<Utc>,
}

impl QuoteSnapshot {
    /// Round the provider's raw fields into a snapshot.
    ///
    /// Midpoints round away from zero, so a change of `-1.2345` becomes `-1.235`.
    pub fn from_raw(raw: RawQuote) -> Self {
        Self {
            price: round(raw.price, PRICE_DECIMALS),
            absolute_change: round(raw.change, CHANGE_DECIMALS),
            percent_change: round(raw.change_percent, CHANGE_DECIMALS),
            fetched_at: Utc::now(),
        }
    }

    /// The change value rendered under `mode`.
    pub fn change(&self, mode: DisplayMode) -> Decimal {
        match mode {
            DisplayMode::Absolute => self.absolute_change,
            DisplayMode::Percent => self.percent_change,
        }
    }

    /// `Negative` when the rounded change is below zero, `Positive` otherwise.
    pub fn direction(&self, mode: DisplayMode) -> DisplayState {
        let change = self.change(mode);
        if change.is_sign_negative() && !change.is_zero() {
            DisplayState::Negative
        } else {
            DisplayState::Positive
        }
    }

    /// Price with exactly two decimals, e.g. `"187.40"`.
    pub fn price_label(&self) -> String {
        fixed(self.price, PRICE_DECIMALS)
    }

    /// Signed change label, e.g. `"-1.235"` or `"+0.500%"`. Both signs keep
    /// three decimals, so `-1.2` renders as `"-1.200"`.
    pub fn change_label(&self, mode: DisplayMode) -> String {
        let sign = match self.direction(mode) {
            DisplayState::Negative => '-',
            _ => '+',
        };
        let magnitude = fixed(self.change(mode).abs(), CHANGE_DECIMALS);
        format!("{sign}{magnitude}{}", mode.unit())
    }
}

/// A tracked ticker together with its latest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedStock {
    pub symbol: Symbol,
    pub snapshot: Option<QuoteSnapshot>,
    pub state: DisplayState,
}

impl TrackedStock {
    /// A row whose price is unknown until its first refresh.
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            snapshot: None,
            state: DisplayState::Unknown,
        }
    }

    /// Replace the snapshot and reclassify under `mode`.
    pub fn apply(&mut self, snapshot: QuoteSnapshot, mode: DisplayMode) {
        self.state = snapshot.direction(mode);
        self.snapshot = Some(snapshot);
    }

    /// Grey the row out, keeping the last known prices.
    pub fn degrade(&mut self) {
        self.state = DisplayState::Error;
    }

    pub fn price_label(&self) -> String {
        self.snapshot
            .as_ref()
            .map(QuoteSnapshot::price_label)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn change_label(&self, mode: DisplayMode) -> String {
        self.snapshot
            .as_ref()
            .map(|s| s.change_label(mode))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

fn fixed(value: Decimal, dp: u32) -> String {
    let mut scaled = round(value, dp);
    scaled.rescale(dp);
    scaled.to_string()
}
