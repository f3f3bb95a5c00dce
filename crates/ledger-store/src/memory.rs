use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{NotificationId, ProductId, UserId};
use tokio::sync::RwLock;

use crate::{
    LedgerEntry, LedgerQuery, Notification, NotificationType, Pagination, Product, ProductFilter,
    ProductUpdate, Result, SortOrder, StoreError, User,
    store::{
        EntryStream, LedgerStore, NotificationStore, ProductStore, StockMutation, UserStore,
        validate_initial_entry, validate_mutation,
    },
};

/// Points inside a write at which the in-memory store can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// The product row has been staged but the ledger entry has not.
    AfterProductWrite,
    /// Both rows have been staged but not yet committed.
    AfterLedgerWrite,
}

#[derive(Default)]
struct StoreState {
    products: HashMap<ProductId, Product>,
    entries: Vec<LedgerEntry>,
    users: HashMap<UserId, User>,
    notifications: Vec<Notification>,
    fail_point: Option<FailPoint>,
    fail_notifications: bool,
}

impl StoreState {
    fn check(&self, point: FailPoint) -> Result<()> {
        if self.fail_point == Some(point) {
            return Err(StoreError::Unavailable(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

/// In-memory implementation of every store, for testing and single-process use.
///
/// Writes stage their changes and apply them only once every step has
/// succeeded, which gives the same all-or-nothing behaviour as a database
/// transaction.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of ledger entries stored.
    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Makes subsequent writes fail at the given point. `None` clears it.
    pub async fn set_fail_point(&self, point: Option<FailPoint>) {
        self.state.write().await.fail_point = point;
    }

    /// Makes notification writes fail.
    pub async fn set_fail_notifications(&self, fail: bool) {
        self.state.write().await.fail_notifications = fail;
    }

    /// Appends an entry directly, bypassing the product row.
    ///
    /// Only for seeding historical data in tests and benchmarks.
    pub async fn seed_entry(&self, entry: LedgerEntry) {
        self.state.write().await.entries.push(entry);
    }

    fn sorted_matches(state: &StoreState, query: &LedgerQuery) -> Vec<LedgerEntry> {
        let mut entries: Vec<_> = state
            .entries
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();

        // Stable sort keeps insertion order for equal timestamps.
        entries.sort_by_key(|e| e.created_at);
        if query.order == SortOrder::NewestFirst {
            entries.reverse();
        }
        entries
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn commit_mutation(&self, mutation: StockMutation) -> Result<Product> {
        validate_mutation(&mutation)?;

        let mut state = self.state.write().await;

        let current = state
            .products
            .get(&mutation.product_id)
            .ok_or_else(|| StoreError::product_not_found(mutation.product_id))?;

        if current.version != mutation.expected_version {
            return Err(StoreError::ConcurrencyConflict {
                product_id: mutation.product_id,
                expected: mutation.expected_version,
                actual: current.version,
            });
        }

        let mut updated = current.clone();
        updated.quantity = mutation.new_quantity;
        updated.version = updated.version.next();
        updated.updated_at = mutation.entry.created_at;
        state.check(FailPoint::AfterProductWrite)?;

        let entry = mutation.entry;
        state.check(FailPoint::AfterLedgerWrite)?;

        state.products.insert(updated.id, updated.clone());
        state.entries.push(entry);
        Ok(updated)
    }

    async fn query_entries(&self, query: &LedgerQuery) -> Result<(Vec<LedgerEntry>, u64)> {
        let state = self.state.read().await;
        let entries = Self::sorted_matches(&state, query);
        let total = entries.len() as u64;

        // Apply offset and limit
        let offset = query.offset.unwrap_or(0);
        let page: Vec<_> = match query.limit {
            Some(limit) => entries.into_iter().skip(offset).take(limit).collect(),
            None => entries.into_iter().skip(offset).collect(),
        };

        Ok((page, total))
    }

    async fn stream_entries(&self, query: &LedgerQuery) -> Result<EntryStream> {
        use futures_util::stream;

        let query = query.unpaged().order(SortOrder::OldestFirst);
        let entries = {
            let state = self.state.read().await;
            Self::sorted_matches(&state, &query)
        };

        let stream = stream::iter(entries.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }

    async fn purge_entries_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|e| e.created_at >= cutoff);
        Ok((before - state.entries.len()) as u64)
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.values().find(|p| p.sku == sku).cloned())
    }

    async fn insert_product(
        &self,
        product: Product,
        initial_entry: Option<LedgerEntry>,
    ) -> Result<()> {
        if let Some(entry) = &initial_entry {
            validate_initial_entry(&product, entry)?;
        }

        let mut state = self.state.write().await;

        if state.products.values().any(|p| p.sku == product.sku) {
            return Err(StoreError::DuplicateSku(product.sku));
        }
        state.check(FailPoint::AfterProductWrite)?;
        if initial_entry.is_some() {
            state.check(FailPoint::AfterLedgerWrite)?;
        }

        state.products.insert(product.id, product);
        if let Some(entry) = initial_entry {
            state.entries.push(entry);
        }
        Ok(())
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::product_not_found(id))?;
        update.apply_to(product, Utc::now());
        Ok(product.clone())
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<(Vec<Product>, u64)> {
        let state = self.state.read().await;
        let mut products: Vec<_> = state
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.sku.cmp(&b.sku)));

        let total = products.len() as u64;
        let products = products
            .into_iter()
            .skip(page.offset)
            .take(page.limit.unwrap_or(usize::MAX))
            .collect();
        Ok((products, total))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        self.state.write().await.users.insert(user.id, user);
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn create_if_absent(
        &self,
        product_id: ProductId,
        kind: NotificationType,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.fail_notifications {
            return Err(StoreError::Unavailable(
                "injected notification failure".to_string(),
            ));
        }

        let exists = state
            .notifications
            .iter()
            .any(|n| n.product_id == product_id && n.kind == kind && !n.is_read);
        if exists {
            return Ok(false);
        }

        state
            .notifications
            .push(Notification::new(product_id, kind));
        Ok(true)
    }

    async fn list_notifications(
        &self,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let state = self.state.read().await;
        let mut notifications: Vec<_> = state
            .notifications
            .iter()
            .filter(|n| !unread_only || !n.is_read)
            .cloned()
            .collect();
        notifications.reverse();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(limit);
        Ok(notifications)
    }

    async fn mark_read(&self, id: NotificationId) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
