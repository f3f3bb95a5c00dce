use common::ProductId;
use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with the ledger and product stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The product row changed between read and write.
    /// The expected version did not match the stored version.
    #[error(
        "Concurrency conflict for product {product_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        product_id: ProductId,
        expected: Version,
        actual: Version,
    },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Another product already uses this SKU.
    #[error("SKU already exists: {0}")]
    DuplicateSku(String),

    /// A mutation was rejected before reaching storage.
    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be decoded into its domain type.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// The backend refused the operation (also used for injected faults).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn product_not_found(id: ProductId) -> Self {
        StoreError::NotFound {
            entity: "product",
            id: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
