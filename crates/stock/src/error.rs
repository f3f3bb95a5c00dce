//! Stock service error types.

use common::ErrorKind;
use ledger_store::{InvalidQuery, StoreError};
use thiserror::Error;

/// Errors returned by the stock, ledger and catalog services.
#[derive(Debug, Error)]
pub enum StockError {
    /// Malformed or missing input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A ledger query was rejected.
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] InvalidQuery),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A business rule rejected the change.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The request collides with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage failed. The source is kept for logging and never shown to callers.
    #[error("storage operation failed")]
    Storage(#[source] StoreError),
}

impl StockError {
    /// Returns the failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StockError::InvalidInput(_) | StockError::InvalidQuery(_) => ErrorKind::InvalidInput,
            StockError::NotFound { .. } => ErrorKind::NotFound,
            StockError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            StockError::Conflict(_) => ErrorKind::Conflict,
            StockError::Storage(_) => ErrorKind::StorageFailure,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StockError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for StockError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => StockError::NotFound { entity, id },
            StoreError::DuplicateSku(sku) => {
                StockError::Conflict(format!("SKU already exists: {sku}"))
            }
            StoreError::InvalidMutation(msg) => StockError::InvalidOperation(msg),
            other => StockError::Storage(other),
        }
    }
}

/// Result type for stock operations.
pub type Result<T> = std::result::Result<T, StockError>;
