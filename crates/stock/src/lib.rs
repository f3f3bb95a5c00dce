//! Stock services for the inventory ledger.
//!
//! This crate provides:
//! - `StockService`, the only writer of product quantity, which commits each
//!   change together with its ledger entry
//! - `LedgerService` for filtered, paginated ledger reads and retention cleanup
//! - `CatalogService` for product creation and catalog edits
//! - `NotificationService` and the best-effort low-stock notification rules

pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod mutation;
pub mod notify;

pub use catalog::{CatalogService, INITIAL_STOCK_REASON, NewProduct};
pub use common::ErrorKind;
pub use config::{MIN_RETENTION_DAYS, StockConfig};
pub use error::{Result, StockError};
pub use ledger::{ConsistencyReport, LedgerPage, LedgerService};
pub use mutation::{QuantityChange, StockChange, StockChangeOutcome, StockService};
pub use notify::{NotificationService, notifications_for, raise_stock_notifications};
