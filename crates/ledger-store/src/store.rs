use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{NotificationId, ProductId, UserId};
use futures_core::Stream;

use crate::{
    LedgerEntry, LedgerQuery, Notification, NotificationType, Pagination, Product, ProductFilter,
    ProductUpdate, Result, SortOrder, StoreError, User, Version,
};

/// A quantity change ready to be committed.
///
/// The product row is written only if it is still at `expected_version`;
/// otherwise nothing is written and `ConcurrencyConflict` is returned.
#[derive(Debug, Clone)]
pub struct StockMutation {
    pub product_id: ProductId,
    pub expected_version: Version,
    pub new_quantity: i64,

    /// The ledger entry recorded in the same transaction.
    pub entry: LedgerEntry,
}

/// Validates a mutation before it reaches storage.
pub fn validate_mutation(mutation: &StockMutation) -> Result<()> {
    if mutation.entry.product_id != mutation.product_id {
        return Err(StoreError::InvalidMutation(
            "ledger entry must reference the mutated product".to_string(),
        ));
    }
    if mutation.entry.new_quantity != mutation.new_quantity {
        return Err(StoreError::InvalidMutation(format!(
            "ledger entry records {} but product would be set to {}",
            mutation.entry.new_quantity, mutation.new_quantity
        )));
    }
    if mutation.new_quantity < 0 {
        return Err(StoreError::InvalidMutation(format!(
            "quantity cannot be negative: {}",
            mutation.new_quantity
        )));
    }
    Ok(())
}

/// Validates the first ledger entry recorded alongside a new product.
pub fn validate_initial_entry(product: &Product, entry: &LedgerEntry) -> Result<()> {
    if entry.product_id != product.id
        || entry.old_quantity != 0
        || entry.new_quantity != product.quantity
    {
        return Err(StoreError::InvalidMutation(
            "initial entry must move the new product from 0 to its starting quantity".to_string(),
        ));
    }
    Ok(())
}

/// A stream of ledger entries.
pub type EntryStream = Pin<Box<dyn Stream<Item = Result<LedgerEntry>> + Send>>;

/// Append-only storage of ledger entries plus the transactional quantity write.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Writes the new product quantity and appends the ledger entry atomically.
    ///
    /// Either both writes become visible or neither does. Returns the product
    /// as committed.
    async fn commit_mutation(&self, mutation: StockMutation) -> Result<Product>;

    /// Retrieves one page of entries matching a query, plus the total number
    /// of matching entries ignoring pagination.
    async fn query_entries(&self, query: &LedgerQuery) -> Result<(Vec<LedgerEntry>, u64)>;

    /// Streams every entry matching the query's filters, oldest first.
    ///
    /// Pagination and sort order on the query are ignored.
    async fn stream_entries(&self, query: &LedgerQuery) -> Result<EntryStream>;

    /// Deletes entries created strictly before `cutoff`. Returns how many were removed.
    async fn purge_entries_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Product table. Quantity is only changed through [`LedgerStore::commit_mutation`].
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>>;

    /// Inserts a product together with its first ledger entry, if any, atomically.
    ///
    /// Fails with `DuplicateSku` when the SKU is taken.
    async fn insert_product(&self, product: Product, initial_entry: Option<LedgerEntry>)
    -> Result<()>;

    /// Applies a catalog update. Fails with `NotFound` when the product is missing.
    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product>;

    /// Lists products ordered by name, with the total count ignoring pagination.
    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<(Vec<Product>, u64)>;
}

/// Read-only user lookup for attribution.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Registers a user. Account management lives elsewhere; this exists for seeding.
    async fn insert_user(&self, user: User) -> Result<()>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Creates an unread notification unless an unread one already exists for
    /// this product and type. Returns true when a notification was created.
    async fn create_if_absent(&self, product_id: ProductId, kind: NotificationType)
    -> Result<bool>;

    /// Lists notifications, newest first.
    async fn list_notifications(&self, unread_only: bool, limit: usize)
    -> Result<Vec<Notification>>;

    /// Marks a notification read. Returns false when it does not exist.
    async fn mark_read(&self, id: NotificationId) -> Result<bool>;
}

/// Extension trait providing convenience reads on top of [`LedgerStore`].
#[async_trait]
pub trait LedgerStoreExt: LedgerStore {
    /// All entries for a product created at or after `since`, oldest first.
    async fn entries_since(
        &self,
        product_id: ProductId,
        since: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>> {
        let query = LedgerQuery::for_product(product_id)
            .from(since)
            .order(SortOrder::OldestFirst);
        let (entries, _) = self.query_entries(&query).await?;
        Ok(entries)
    }

    /// The `n` most recent entries for a product, newest first.
    async fn recent_entries(&self, product_id: ProductId, n: usize) -> Result<Vec<LedgerEntry>> {
        let query = LedgerQuery::for_product(product_id).limit(n);
        let (entries, _) = self.query_entries(&query).await?;
        Ok(entries)
    }

    /// Number of entries matching the query's filters.
    async fn count_entries(&self, query: &LedgerQuery) -> Result<u64> {
        let (_, total) = self.query_entries(&query.unpaged().limit(1)).await?;
        Ok(total)
    }
}

// Blanket implementation for all LedgerStore implementations
impl<T: LedgerStore + ?Sized> LedgerStoreExt for T {}

/// Convenience bound for a backend that provides every store.
pub trait InventoryStore: LedgerStore + ProductStore + UserStore + NotificationStore {}

impl<T: LedgerStore + ProductStore + UserStore + NotificationStore + ?Sized> InventoryStore for T {}

#[cfg(test)]
mod tests {
    use common::{OperationType, UserId};

    use super::*;

    fn mutation(new_quantity: i64, entry_new: i64) -> StockMutation {
        let product_id = ProductId::new();
        StockMutation {
            product_id,
            expected_version: Version::first(),
            new_quantity,
            entry: LedgerEntry::new(
                product_id,
                UserId::new(),
                10,
                entry_new,
                "count",
                OperationType::Correction,
            ),
        }
    }

    #[test]
    fn validate_accepts_consistent_mutation() {
        assert!(validate_mutation(&mutation(4, 4)).is_ok());
    }

    #[test]
    fn validate_rejects_mismatched_entry() {
        assert!(matches!(
            validate_mutation(&mutation(4, 5)),
            Err(StoreError::InvalidMutation(_))
        ));
    }

    #[test]
    fn validate_rejects_negative_quantity() {
        assert!(validate_mutation(&mutation(-1, -1)).is_err());
    }

    #[test]
    fn validate_rejects_entry_for_other_product() {
        let mut m = mutation(4, 4);
        m.entry.product_id = ProductId::new();
        assert!(validate_mutation(&m).is_err());
    }
}
