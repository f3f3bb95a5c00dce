//! Stock notifications: which ones a product state calls for, and the
//! best-effort path that records them.

use common::NotificationId;
use ledger_store::{Notification, NotificationStore, NotificationType, Product};

use crate::config::StockConfig;
use crate::error::{Result, StockError};

/// Notification types warranted by a product's current quantity.
///
/// - quantity 0: `out_of_stock`
/// - 0 < quantity <= reorder level: `low_stock`
/// - additionally `reorder_required` once 0 < quantity <= reorder level / 2
pub fn notifications_for(product: &Product) -> Vec<NotificationType> {
    if product.quantity == 0 {
        return vec![NotificationType::OutOfStock];
    }
    if !product.is_low_stock() {
        return Vec::new();
    }

    let mut kinds = vec![NotificationType::LowStock];
    if product.quantity <= product.reorder_level / 2 {
        kinds.push(NotificationType::ReorderRequired);
    }
    kinds
}

/// Records the notifications a product state calls for.
///
/// Never fails: storage errors are logged and counted, then swallowed, so
/// the committed mutation that triggered this is never affected. Returns how
/// many notifications were created.
pub async fn raise_stock_notifications<S>(store: &S, product: &Product) -> usize
where
    S: NotificationStore + ?Sized,
{
    let mut created = 0;
    for kind in notifications_for(product) {
        match store.create_if_absent(product.id, kind).await {
            Ok(true) => {
                metrics::counter!("notifications_created_total").increment(1);
                tracing::info!(
                    product_id = %product.id,
                    sku = %product.sku,
                    kind = %kind,
                    quantity = product.quantity,
                    "stock notification created"
                );
                created += 1;
            }
            Ok(false) => {
                tracing::debug!(product_id = %product.id, kind = %kind, "unread notification already exists");
            }
            Err(e) => {
                metrics::counter!("notifications_failed_total").increment(1);
                tracing::warn!(
                    product_id = %product.id,
                    kind = %kind,
                    error = %e,
                    "failed to create stock notification"
                );
            }
        }
    }
    created
}

/// Read and acknowledge stock notifications.
pub struct NotificationService<S> {
    store: S,
    config: StockConfig,
}

impl<S: NotificationStore> NotificationService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, StockConfig::default())
    }

    pub fn with_config(store: S, config: StockConfig) -> Self {
        Self { store, config }
    }

    /// Lists notifications, newest first. `limit` is capped at the
    /// configured maximum page size.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, unread_only: bool, limit: usize) -> Result<Vec<Notification>> {
        if limit == 0 {
            return Err(StockError::InvalidInput(
                "limit must be at least 1".to_string(),
            ));
        }
        let limit = limit.min(self.config.max_page_size);
        Ok(self.store.list_notifications(unread_only, limit).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_read(&self, id: NotificationId) -> Result<()> {
        if self.store.mark_read(id).await? {
            Ok(())
        } else {
            Err(StockError::not_found("notification", id))
        }
    }
}
