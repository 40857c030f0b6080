use futures::future::join_all;
use log::{log, warn, Level};
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::notice::{Notice, NoticeKind};
use crate::models::quote::{DisplayMode, QuoteSnapshot, TrackedStock};
use crate::models::symbol::Symbol;
use crate::storage::traits::SymbolStore;
use super::quote_refresher::QuoteRefresher;

/// Result of one `add` call, per normalized input symbol.
#[derive(Debug, Default)]
pub struct AddOutcome {
    /// Newly tracked after a successful first fetch.
    pub added: Vec<Symbol>,
    /// Already tracked; only refreshed.
    pub refreshed: Vec<Symbol>,
    /// First fetch failed; the symbol was not tracked.
    pub failed: Vec<(Symbol, CoreError)>,
}

/// Result of one `refresh_all` pass.
#[derive(Debug, Default)]
pub struct RefreshSummary {
    pub updated: Vec<Symbol>,
    pub failed: Vec<(Symbol, CoreError)>,
}

impl RefreshSummary {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Quote lookups detached from the registry, so they can run while other
/// callers keep using it. Produced by `begin_add`/`begin_refresh`.
pub struct FetchBatch {
    refresher: Arc<QuoteRefresher>,
    /// Symbol and whether it was tracked when the batch was taken.
    entries: Vec<(Symbol, bool)>,
}

impl FetchBatch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Issue every lookup at once and wait for all of them.
    pub async fn fetch(self) -> FetchedBatch {
        let FetchBatch { refresher, entries } = self;
        let results = join_all(entries.iter().map(|(s, _)| refresher.fetch(s.as_str()))).await;
        let quotes = entries
            .into_iter()
            .zip(results)
            .map(|((symbol, was_tracked), result)| FetchedQuote {
                symbol,
                was_tracked,
                result,
            })
            .collect();
        FetchedBatch { quotes }
    }
}

struct FetchedQuote {
    symbol: Symbol,
    was_tracked: bool,
    result: Result<QuoteSnapshot, CoreError>,
}

/// Completed lookups, ready to be applied with `finish_add`/`finish_refresh`.
pub struct FetchedBatch {
    quotes: Vec<FetchedQuote>,
}

/// Insertion-ordered set of tracked tickers and their latest snapshots.
///
/// Invariants:
/// - a symbol appears at most once;
/// - a symbol reaches the store only after its first successful fetch;
/// - every successful add and every removal rewrites the store.
///
/// A failed fetch greys out *every* tracked row, not only the failing one.
/// Successful results from the same pass are still applied first, so prices
/// stay current even when the rows end up in the error state.
pub struct SymbolRegistry {
    refresher: Arc<QuoteRefresher>,
    store: Box<dyn SymbolStore>,
    stocks: Vec<TrackedStock>,
    mode: DisplayMode,
    notices: Vec<Notice>,
    /// Set after a failed write so repeated failures raise a single notice.
    persist_failing: bool,
    trace_level: Level,
}

impl std::fmt::Debug for SymbolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolRegistry")
            .field("provider", &self.refresher.provider_name())
            .field("store", &self.store.describe())
            .field("symbols", &self.symbols())
            .field("mode", &self.mode)
            .field("pending_notices", &self.notices.len())
            .finish()
    }
}

impl SymbolRegistry {
    /// An empty registry. Call [`load`](Self::load) to read stored symbols.
    pub fn new(refresher: QuoteRefresher, store: Box<dyn SymbolStore>) -> Self {
        Self {
            refresher: Arc::new(refresher),
            store,
            stocks: Vec::new(),
            mode: DisplayMode::default(),
            notices: Vec::new(),
            persist_failing: false,
            trace_level: Level::Debug,
        }
    }

    /// Emit add/refresh/persist traces at `info` instead of `debug`.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.trace_level = if verbose { Level::Info } else { Level::Debug };
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Replace the tracked set with the stored symbols, prices unknown.
    ///
    /// A malformed or unreadable store queues a notice and leaves the
    /// registry empty. Returns the number of symbols loaded.
    pub fn load(&mut self) -> usize {
        self.stocks.clear();
        log!(self.trace_level, "loading symbols from {}", self.store.describe());

        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!("failed to load symbols from {}: {e}", self.store.describe());
                let kind = match e {
                    CoreError::Persistence(_) => NoticeKind::DatabaseMalformed,
                    _ => NoticeKind::PersistenceFailed,
                };
                self.notices.push(Notice::new(
                    kind,
                    format!("Stock database is malformed or unreadable, starting empty: {e}"),
                ));
                return 0;
            }
        };

        for raw in stored {
            match Symbol::parse(&raw) {
                Ok(symbol) if self.position(&symbol).is_none() => {
                    self.stocks.push(TrackedStock::new(symbol));
                }
                Ok(symbol) => warn!("skipping duplicate stored symbol {symbol}"),
                Err(_) => warn!("skipping empty stored symbol"),
            }
        }
        log!(self.trace_level, "loaded {:?}", self.symbols());
        self.stocks.len()
    }

    /// Write the ordered symbol list (never prices) to the store.
    pub fn persist(&mut self) -> Result<(), CoreError> {
        let symbols = self.symbols();
        self.store.save(&symbols)?;
        self.persist_failing = false;
        log!(self.trace_level, "saved {} symbols to {}", symbols.len(), self.store.describe());
        Ok(())
    }

    /// Persist, converting a failure into a one-time notice.
    fn persist_or_notify(&mut self) {
        if let Err(e) = self.persist() {
            warn!("failed to persist symbols: {e}");
            if !self.persist_failing {
                self.persist_failing = true;
                self.notices.push(Notice::new(
                    NoticeKind::PersistenceFailed,
                    format!("Unable to save tracked stocks, changes are kept in memory only: {e}"),
                ));
            }
        }
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Track every ticker in a comma-separated entry.
    ///
    /// Tokens are trimmed and uppercased; empty tokens are dropped. Input with
    /// no usable token fails with `InvalidSymbol` and changes nothing.
    /// New symbols are fetched concurrently and committed (then persisted)
    /// only on success; tickers already tracked are refreshed.
    pub async fn add(&mut self, raw_input: &str) -> Result<AddOutcome, CoreError> {
        let batch = self.begin_add(raw_input)?;
        let fetched = batch.fetch().await;
        Ok(self.finish_add(fetched))
    }

    /// First half of [`add`](Self::add): parse the entry and detach the lookups.
    pub fn begin_add(&self, raw_input: &str) -> Result<FetchBatch, CoreError> {
        let symbols = Symbol::parse_list(raw_input);
        if symbols.is_empty() {
            return Err(CoreError::InvalidSymbol);
        }
        let entries = symbols
            .into_iter()
            .map(|s| {
                let tracked = self.position(&s).is_some();
                (s, tracked)
            })
            .collect();
        Ok(self.batch(entries))
    }

    /// Second half of [`add`](Self::add): commit the fetched quotes.
    ///
    /// A symbol tracked when the batch began is only refreshed, even if it
    /// was removed while its lookup was in flight.
    pub fn finish_add(&mut self, fetched: FetchedBatch) -> AddOutcome {
        let mut outcome = AddOutcome::default();
        let mut any_failed = false;

        for quote in fetched.quotes {
            let FetchedQuote {
                symbol,
                was_tracked,
                result,
            } = quote;

            if was_tracked || self.position(&symbol).is_some() {
                match result {
                    Ok(snapshot) => {
                        self.apply_snapshot(&symbol, snapshot);
                    }
                    Err(e) => {
                        warn!("refresh of {symbol} failed: {e}");
                        any_failed = true;
                    }
                }
                outcome.refreshed.push(symbol);
                continue;
            }

            match result {
                Ok(snapshot) => {
                    log!(self.trace_level, "tracking {symbol}");
                    let mut stock = TrackedStock::new(symbol.clone());
                    stock.apply(snapshot, self.mode);
                    self.stocks.push(stock);
                    self.persist_or_notify();
                    outcome.added.push(symbol);
                }
                Err(e) => {
                    warn!("got {e} from stock price provider for {symbol}, disabling");
                    any_failed = true;
                    outcome.failed.push((symbol, e));
                }
            }
        }

        if any_failed {
            self.degrade_all();
        }
        outcome
    }

    /// Stop tracking `symbol`. Unknown symbols are logged and ignored.
    /// Returns whether an entry was removed.
    pub fn remove(&mut self, symbol: &str) -> bool {
        let Some(idx) = Symbol::parse(symbol).ok().and_then(|s| self.position(&s)) else {
            warn!("unable to delete {symbol:?}: not tracked");
            return false;
        };
        let removed = self.stocks.remove(idx);
        log!(self.trace_level, "removed {}", removed.symbol);
        self.persist_or_notify();
        true
    }

    /// Refetch every tracked symbol.
    ///
    /// Requests go out together in insertion order and complete in any
    /// order; one failure never stops the others from being applied.
    pub async fn refresh_all(&mut self) -> RefreshSummary {
        let batch = self.begin_refresh();
        let fetched = batch.fetch().await;
        self.finish_refresh(fetched)
    }

    /// First half of [`refresh_all`](Self::refresh_all): detach one lookup
    /// per tracked symbol.
    pub fn begin_refresh(&self) -> FetchBatch {
        let entries = self
            .stocks
            .iter()
            .map(|s| {
                log!(self.trace_level, "refresh prices for {}", s.symbol);
                (s.symbol.clone(), true)
            })
            .collect();
        self.batch(entries)
    }

    /// Second half of [`refresh_all`](Self::refresh_all).
    ///
    /// Quotes for symbols removed while in flight are dropped.
    pub fn finish_refresh(&mut self, fetched: FetchedBatch) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        for quote in fetched.quotes {
            match quote.result {
                Ok(snapshot) => {
                    if self.apply_snapshot(&quote.symbol, snapshot) {
                        summary.updated.push(quote.symbol);
                    }
                }
                Err(e) => {
                    warn!(
                        "got {e} from stock price provider for {}, disabling",
                        quote.symbol
                    );
                    summary.failed.push((quote.symbol, e));
                }
            }
        }

        if !summary.all_ok() {
            self.degrade_all();
        }
        summary
    }

    /// Flip between absolute and percent change without refetching.
    pub fn flip_display_mode(&mut self) -> DisplayMode {
        self.mode = self.mode.toggled();
        log!(self.trace_level, "display mode is now {:?}", self.mode);
        self.mode
    }

    /// Switch between absolute and percent change, then refresh everything.
    pub async fn toggle_display_mode(&mut self) -> RefreshSummary {
        self.flip_display_mode();
        self.refresh_all().await
    }

    fn batch(&self, entries: Vec<(Symbol, bool)>) -> FetchBatch {
        FetchBatch {
            refresher: Arc::clone(&self.refresher),
            entries,
        }
    }

    /// Returns false when `symbol` is no longer tracked.
    fn apply_snapshot(&mut self, symbol: &Symbol, snapshot: QuoteSnapshot) -> bool {
        let mode = self.mode;
        match self.stocks.iter_mut().find(|s| &s.symbol == symbol) {
            Some(stock) => {
                stock.apply(snapshot, mode);
                true
            }
            None => false,
        }
    }

    fn degrade_all(&mut self) {
        for stock in &mut self.stocks {
            stock.degrade();
        }
    }

    // ── Queries ─────────────────────────────────────────────────────

    fn position(&self, symbol: &Symbol) -> Option<usize> {
        self.stocks.iter().position(|s| &s.symbol == symbol)
    }

    /// Tracked rows in insertion order.
    pub fn tracked(&self) -> &[TrackedStock] {
        &self.stocks
    }

    /// Look up a row; input is normalized first.
    pub fn get(&self, symbol: &str) -> Option<&TrackedStock> {
        let symbol = Symbol::parse(symbol).ok()?;
        self.position(&symbol).map(|idx| &self.stocks[idx])
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    /// Ordered symbol strings, as persisted.
    pub fn symbols(&self) -> Vec<String> {
        self.stocks.iter().map(|s| s.symbol.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.mode
    }

    /// Change label of a row under the current display mode.
    pub fn change_label(&self, symbol: &str) -> Option<String> {
        self.get(symbol).map(|s| s.change_label(self.mode))
    }

    pub fn info_url(&self, symbol: &Symbol) -> String {
        self.refresher.info_url(symbol)
    }

    /// Drain queued user notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
