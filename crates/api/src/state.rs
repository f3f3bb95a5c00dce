//! Services shared by every handler.

use std::sync::Arc;

use analytics::ReportComposer;
use ledger_store::InventoryStore;
use stock::{CatalogService, LedgerService, NotificationService, StockService};

use crate::config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub stock: StockService<S>,
    pub ledger: LedgerService<S>,
    pub catalog: CatalogService<S>,
    pub notifications: NotificationService<S>,
    pub reports: ReportComposer<S>,

    /// Default minimum age for ledger purges.
    pub retention_days: i64,

    /// Name of the storage backend, reported by `/health`.
    pub backend: &'static str,
}

impl<S: InventoryStore + Clone> AppState<S> {
    pub fn new(store: S, backend: &'static str, config: &Config) -> Self {
        let stock_config = config.stock_config();
        Self {
            stock: StockService::with_config(store.clone(), stock_config.clone()),
            ledger: LedgerService::with_config(store.clone(), stock_config.clone()),
            catalog: CatalogService::with_config(store.clone(), stock_config.clone()),
            notifications: NotificationService::with_config(store.clone(), stock_config.clone()),
            retention_days: stock_config.retention_floor_days(),
            reports: ReportComposer::with_config(store, config.report_config(), stock_config),
            backend,
        }
    }
}

/// Builds shared state over `store` with the given configuration.
pub fn create_state<S: InventoryStore + Clone + 'static>(
    store: S,
    backend: &'static str,
    config: &Config,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, backend, config))
}
