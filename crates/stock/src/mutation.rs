//! The stock mutation service: the only writer of product quantity.

use common::{OperationType, ProductId, UserId};
use ledger_store::{InventoryStore, LedgerEntry, Product, StockMutation, StoreError};
use serde::{Deserialize, Serialize};

use crate::config::StockConfig;
use crate::error::{Result, StockError};
use crate::notify::raise_stock_notifications;

/// How the quantity should change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityChange {
    /// Replace the quantity with this value.
    Set(i64),
    /// Add this (possibly negative) amount to the current quantity.
    Adjust(i64),
}

impl QuantityChange {
    /// Resolves the change against the current quantity.
    ///
    /// A negative absolute target is invalid input. A delta that would drive
    /// stock below zero is rejected unless the operation is a correction, in
    /// which case the result is clamped to zero.
    pub fn resolve(&self, current: i64, operation_type: OperationType) -> Result<i64> {
        let target = match *self {
            QuantityChange::Set(n) if n < 0 => {
                return Err(StockError::InvalidInput(format!(
                    "new quantity must be non-negative, got {n}"
                )));
            }
            QuantityChange::Set(n) => n,
            QuantityChange::Adjust(delta) => current.checked_add(delta).ok_or_else(|| {
                StockError::InvalidInput(format!("adjustment {delta} overflows quantity"))
            })?,
        };

        if target >= 0 {
            return Ok(target);
        }
        if operation_type == OperationType::Correction {
            return Ok(0);
        }
        Err(StockError::InvalidOperation(format!(
            "quantity cannot go below zero: {current} would become {target} \
             (use a correction to reset stock)"
        )))
    }
}

/// A request to change one product's stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub product_id: ProductId,
    pub change: QuantityChange,
    pub user_id: UserId,
    pub reason: String,
    pub operation_type: OperationType,
}

impl StockChange {
    /// Sets an absolute quantity.
    pub fn set(
        product_id: ProductId,
        new_quantity: i64,
        user_id: UserId,
        reason: impl Into<String>,
        operation_type: OperationType,
    ) -> Self {
        Self {
            product_id,
            change: QuantityChange::Set(new_quantity),
            user_id,
            reason: reason.into(),
            operation_type,
        }
    }

    /// Applies a relative change.
    pub fn adjust(
        product_id: ProductId,
        delta: i64,
        user_id: UserId,
        reason: impl Into<String>,
        operation_type: OperationType,
    ) -> Self {
        Self {
            product_id,
            change: QuantityChange::Adjust(delta),
            user_id,
            reason: reason.into(),
            operation_type,
        }
    }
}

/// The committed result of a stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockChangeOutcome {
    pub product: Product,
    pub entry: LedgerEntry,
}

/// Applies stock changes so that the product quantity and its ledger entry
/// are always committed together.
///
/// Concurrent changes to the same product are serialized by the product's
/// version: a writer that read a stale version loses at commit time, re-reads
/// and tries again.
pub struct StockService<S> {
    store: S,
    config: StockConfig,
}

impl<S: InventoryStore> StockService<S> {
    /// Creates a new stock service with default settings.
    pub fn new(store: S) -> Self {
        Self::with_config(store, StockConfig::default())
    }

    pub fn with_config(store: S, config: StockConfig) -> Self {
        Self { store, config }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Applies a stock change and records it in the ledger.
    ///
    /// After the commit, low-stock notifications are raised on a best-effort
    /// basis; their failures never reach the caller.
    #[tracing::instrument(
        name = "apply_stock_change",
        skip(self, change),
        fields(
            product_id = %change.product_id,
            user_id = %change.user_id,
            operation_type = %change.operation_type,
        )
    )]
    pub async fn apply_stock_change(&self, change: StockChange) -> Result<StockChangeOutcome> {
        let reason = change.reason.trim();
        if reason.is_empty() {
            return Err(StockError::InvalidInput("reason is required".to_string()));
        }

        if self.store.get_user(change.user_id).await?.is_none() {
            return Err(StockError::not_found("user", change.user_id));
        }

        let outcome = self.commit_with_retry(&change, reason).await?;

        metrics::counter!(
            "stock_mutations_total",
            "operation_type" => change.operation_type.as_str()
        )
        .increment(1);

        let entry = &outcome.entry;
        if change.operation_type != OperationType::Correction
            && entry.decrease() > self.config.large_reduction_threshold.max(0) as u64
        {
            tracing::warn!(
                product_id = %entry.product_id,
                old_quantity = entry.old_quantity,
                new_quantity = entry.new_quantity,
                "large stock reduction"
            );
        }

        tracing::info!(
            old_quantity = entry.old_quantity,
            new_quantity = entry.new_quantity,
            delta = entry.delta(),
            "stock change committed"
        );

        raise_stock_notifications(&self.store, &outcome.product).await;

        Ok(outcome)
    }

    async fn commit_with_retry(&self, change: &StockChange, reason: &str) -> Result<StockChangeOutcome> {
        let mut last_conflict = None;

        for attempt in 0..=self.config.max_retries {
            let product = self
                .store
                .get_product(change.product_id)
                .await?
                .ok_or_else(|| StockError::not_found("product", change.product_id))?;

            let new_quantity = change
                .change
                .resolve(product.quantity, change.operation_type)?;

            let entry = LedgerEntry::new(
                product.id,
                change.user_id,
                product.quantity,
                new_quantity,
                reason,
                change.operation_type,
            );
            let mutation = StockMutation {
                product_id: product.id,
                expected_version: product.version,
                new_quantity,
                entry: entry.clone(),
            };

            match self.store.commit_mutation(mutation).await {
                Ok(product) => return Ok(StockChangeOutcome { product, entry }),
                Err(err @ StoreError::ConcurrencyConflict { .. }) => {
                    metrics::counter!("stock_mutation_conflicts_total").increment(1);
                    tracing::debug!(attempt, error = %err, "stock change lost a race, retrying");
                    last_conflict = Some(err);
                }
                Err(err) => {
                    metrics::counter!("stock_mutation_failures_total").increment(1);
                    tracing::error!(error = %err, "stock change failed");
                    return Err(err.into());
                }
            }
        }

        metrics::counter!("stock_mutation_failures_total").increment(1);
        tracing::error!(
            retries = self.config.max_retries,
            "stock change gave up after repeated conflicts"
        );
        Err(StockError::Storage(last_conflict.unwrap_or_else(|| {
            StoreError::Unavailable("no commit attempt was made".to_string())
        })))
    }
}
