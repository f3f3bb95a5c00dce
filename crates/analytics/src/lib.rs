//! Aggregation, stock alerts and reports over the inventory ledger.
//!
//! - [`Aggregator`] folds a ledger stream into grouped totals
//! - [`alerts`] scores low-stock products and estimates stockout dates
//! - [`ReportComposer`] builds the six reports under a time budget

pub mod aggregate;
pub mod alerts;
pub mod config;
pub mod error;
pub mod reports;
pub mod trend;

pub use aggregate::{
    Aggregation, Aggregator, DailySummary, GroupSummary, OperationSummary, ProductActivity,
    UserActivity,
};
pub use alerts::{Confidence, ConsumptionBasis, ConsumptionEstimate, Priority, StockAlert};
pub use config::ReportConfig;
pub use error::{AnalyticsError, Result};
pub use reports::{Report, ReportComposer, ReportOptions, ReportType};
pub use trend::{Trend, TrendDirection, compute_trend};
