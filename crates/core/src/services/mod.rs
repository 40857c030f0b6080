pub mod browser;
pub mod quote_refresher;
pub mod symbol_registry;
