pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::Mutex;

use errors::CoreError;
use models::{
    notice::Notice,
    quote::{DisplayMode, DisplayState},
    settings::PanelConfig,
    symbol::Symbol,
};
use providers::{traits::QuoteProvider, yahoo::YahooQuoteProvider};
use services::{
    browser::{BrowserLauncher, CommandLauncher},
    quote_refresher::QuoteRefresher,
    symbol_registry::{AddOutcome, RefreshSummary, SymbolRegistry},
};
use storage::{settings::SettingsStore, traits::SymbolStore};

/// One rendered menu row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelRow {
    pub symbol: String,
    pub price: String,
    pub change: String,
    pub state: DisplayState,
}

/// Main entry point for the Stonks panel core.
///
/// Owns the symbol registry and exposes one method per UI callback:
/// entry submit, delete icon, menu open, change-label click and row click.
/// `create` corresponds to the host enabling the panel, `dispose` to
/// disabling it.
#[must_use]
pub struct StockPanel {
    registry: Mutex<SymbolRegistry>,
    launcher: Box<dyn BrowserLauncher>,
}

impl std::fmt::Debug for StockPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockPanel")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl StockPanel {
    /// Enable the panel against the live quote endpoint and load stored symbols.
    pub fn create(config: &PanelConfig, store: Box<dyn SymbolStore>) -> Result<Self, CoreError> {
        let provider = YahooQuoteProvider::new(config)?;
        Ok(Self::with_parts(config, Box::new(provider), store, Box::new(CommandLauncher::default())))
    }

    /// Enable the panel with symbols kept in a settings document.
    ///
    /// The document's `debug` key enables verbose traces in addition to
    /// `config.debug`.
    pub fn create_with_settings(
        config: &PanelConfig,
        settings_path: impl Into<PathBuf>,
    ) -> Result<Self, CoreError> {
        let settings = SettingsStore::new(settings_path);
        let debug = settings.debug().unwrap_or_else(|e| {
            warn!("ignoring unreadable debug setting: {e}");
            false
        });
        let config = PanelConfig {
            debug: config.debug || debug,
            ..config.clone()
        };
        Self::create(&config, Box::new(settings))
    }

    /// Assemble a panel from explicit collaborators.
    pub fn with_parts(
        config: &PanelConfig,
        provider: Box<dyn QuoteProvider>,
        store: Box<dyn SymbolStore>,
        launcher: Box<dyn BrowserLauncher>,
    ) -> Self {
        let mut registry = SymbolRegistry::new(QuoteRefresher::new(provider), store);
        registry.set_verbose(config.debug);
        let loaded = registry.load();
        info!("stock panel enabled with {loaded} tracked symbols");
        Self {
            registry: Mutex::new(registry),
            launcher,
        }
    }

    /// Disable the panel. Returns the symbols that were tracked.
    pub fn dispose(self) -> Vec<String> {
        let symbols = self.registry.into_inner().symbols();
        info!("stock panel disabled ({} symbols)", symbols.len());
        symbols
    }

    // ── UI callbacks ────────────────────────────────────────────────

    /// Enter pressed in the search entry. `None` stands for an entry with no text.
    pub async fn on_entry_submit(&self, text: Option<&str>) -> Result<AddOutcome, CoreError> {
        let text = text.ok_or(CoreError::InvalidSymbol)?;
        let batch = self.registry.lock().await.begin_add(text)?;
        let fetched = batch.fetch().await;
        Ok(self.registry.lock().await.finish_add(fetched))
    }

    /// Delete icon of a row activated.
    pub async fn on_delete(&self, symbol: &str) -> bool {
        self.registry.lock().await.remove(symbol)
    }

    /// Popup menu opened.
    ///
    /// The registry stays unlocked while quotes are in flight, so deletes
    /// and rendering are not held up by a slow provider.
    pub async fn on_menu_open(&self) -> RefreshSummary {
        let batch = self.registry.lock().await.begin_refresh();
        let fetched = batch.fetch().await;
        self.registry.lock().await.finish_refresh(fetched)
    }

    /// Change label clicked: flip absolute/percent display.
    pub async fn on_change_click(&self) -> RefreshSummary {
        let batch = {
            let mut registry = self.registry.lock().await;
            registry.flip_display_mode();
            registry.begin_refresh()
        };
        let fetched = batch.fetch().await;
        self.registry.lock().await.finish_refresh(fetched)
    }

    /// Row clicked: open the provider's quote page. Returns the URL opened.
    pub async fn on_item_click(&self, symbol: &str) -> Result<String, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        let url = self.registry.lock().await.info_url(&symbol);
        self.launcher.open(&url).await?;
        Ok(url)
    }

    // ── Rendering ───────────────────────────────────────────────────

    /// Rows in insertion order, labelled under the current display mode.
    pub async fn rows(&self) -> Vec<PanelRow> {
        let registry = self.registry.lock().await;
        let mode = registry.display_mode();
        registry
            .tracked()
            .iter()
            .map(|stock| PanelRow {
                symbol: stock.symbol.to_string(),
                price: stock.price_label(),
                change: stock.change_label(mode),
                state: stock.state,
            })
            .collect()
    }

    pub async fn display_mode(&self) -> DisplayMode {
        self.registry.lock().await.display_mode()
    }

    pub async fn symbols(&self) -> Vec<String> {
        self.registry.lock().await.symbols()
    }

    /// Drain notices the host should show to the user once.
    pub async fn take_notices(&self) -> Vec<Notice> {
        self.registry.lock().await.take_notices()
    }
}
