//! Analytics error types.

use std::time::Duration;

use common::ErrorKind;
use ledger_store::{InvalidQuery, StoreError};
use stock::StockError;
use thiserror::Error;

/// Errors that can occur while computing reports.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Invalid report options.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A ledger or catalog read failed.
    #[error(transparent)]
    Stock(#[from] StockError),

    /// The report did not finish within its execution budget.
    #[error("{report_type} report exceeded its {}s budget", .budget.as_secs_f64())]
    Timeout {
        report_type: &'static str,
        budget: Duration,
    },
}

impl AnalyticsError {
    /// Returns the failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyticsError::InvalidInput(_) => ErrorKind::InvalidInput,
            AnalyticsError::Stock(e) => e.kind(),
            AnalyticsError::Timeout { .. } => ErrorKind::Timeout,
        }
    }
}

impl From<StoreError> for AnalyticsError {
    fn from(err: StoreError) -> Self {
        AnalyticsError::Stock(err.into())
    }
}

impl From<InvalidQuery> for AnalyticsError {
    fn from(err: InvalidQuery) -> Self {
        AnalyticsError::Stock(err.into())
    }
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
