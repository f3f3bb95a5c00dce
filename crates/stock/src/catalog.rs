//! Product catalog: creation, lookup, catalog edits and listing.
//!
//! Quantity is never edited here. A positive starting quantity is recorded as
//! the product's first ledger entry, a `purchase` from zero.

use chrono::Utc;
use common::{Money, OperationType, ProductId, UserId};
use ledger_store::{
    InventoryStore, LedgerEntry, Pagination, Product, ProductFilter, ProductUpdate, Version,
};
use serde::{Deserialize, Serialize};

use crate::config::StockConfig;
use crate::error::{Result, StockError};
use crate::notify::raise_stock_notifications;

/// Reason recorded on the first ledger entry of a product created with stock.
pub const INITIAL_STOCK_REASON: &str = "initial stock";

/// Fields for a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub unit_price: Money,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub reorder_level: i64,
    pub location: Option<String>,
    pub supplier: Option<String>,
}

impl NewProduct {
    fn validate(&self) -> Result<()> {
        if self.sku.trim().is_empty() {
            return Err(StockError::InvalidInput("sku is required".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(StockError::InvalidInput("name is required".to_string()));
        }
        if self.category.trim().is_empty() {
            return Err(StockError::InvalidInput("category is required".to_string()));
        }
        if self.unit_price.is_negative() {
            return Err(StockError::InvalidInput(
                "unit price cannot be negative".to_string(),
            ));
        }
        if self.quantity < 0 {
            return Err(StockError::InvalidInput(
                "quantity cannot be negative".to_string(),
            ));
        }
        if self.reorder_level < 0 {
            return Err(StockError::InvalidInput(
                "reorder level cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_update(update: &ProductUpdate) -> Result<()> {
    if update.is_empty() {
        return Err(StockError::InvalidInput("no fields to update".to_string()));
    }
    if let Some(name) = &update.name
        && name.trim().is_empty()
    {
        return Err(StockError::InvalidInput("name cannot be empty".to_string()));
    }
    if let Some(category) = &update.category
        && category.trim().is_empty()
    {
        return Err(StockError::InvalidInput(
            "category cannot be empty".to_string(),
        ));
    }
    if update.unit_price.is_some_and(|p| p.is_negative()) {
        return Err(StockError::InvalidInput(
            "unit price cannot be negative".to_string(),
        ));
    }
    if update.reorder_level.is_some_and(|l| l < 0) {
        return Err(StockError::InvalidInput(
            "reorder level cannot be negative".to_string(),
        ));
    }
    Ok(())
}

pub struct CatalogService<S> {
    store: S,
    config: StockConfig,
}

impl<S: InventoryStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, StockConfig::default())
    }

    pub fn with_config(store: S, config: StockConfig) -> Self {
        Self { store, config }
    }

    /// Creates a product. `created_by` is credited with the initial stock entry.
    #[tracing::instrument(skip(self, new), fields(sku = %new.sku))]
    pub async fn create_product(&self, new: NewProduct, created_by: UserId) -> Result<Product> {
        new.validate()?;

        let sku = new.sku.trim().to_string();
        if self.store.find_by_sku(&sku).await?.is_some() {
            return Err(StockError::Conflict(format!("SKU already exists: {sku}")));
        }

        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            sku,
            name: new.name.trim().to_string(),
            category: new.category.trim().to_string(),
            unit_price: new.unit_price,
            quantity: new.quantity,
            reorder_level: new.reorder_level,
            location: new.location,
            supplier: new.supplier,
            version: Version::first(),
            created_at: now,
            updated_at: now,
        };

        let initial_entry = if product.quantity > 0 {
            if self.store.get_user(created_by).await?.is_none() {
                return Err(StockError::not_found("user", created_by));
            }
            let mut entry = LedgerEntry::new(
                product.id,
                created_by,
                0,
                product.quantity,
                INITIAL_STOCK_REASON,
                OperationType::Purchase,
            );
            entry.created_at = now;
            Some(entry)
        } else {
            None
        };

        self.store
            .insert_product(product.clone(), initial_entry)
            .await?;

        if product.quantity > 0 {
            metrics::counter!(
                "stock_mutations_total",
                "operation_type" => OperationType::Purchase.as_str()
            )
            .increment(1);
        }
        tracing::info!(product_id = %product.id, quantity = product.quantity, "product created");

        raise_stock_notifications(&self.store, &product).await;
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| StockError::not_found("product", id))
    }

    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>> {
        Ok(self.store.find_by_sku(sku).await?)
    }

    /// Updates catalog fields. SKU and quantity cannot be changed this way.
    ///
    /// A changed reorder level can make a product low on stock, so
    /// notifications are re-evaluated afterwards.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product> {
        validate_update(&update)?;

        let reorder_changed = update.reorder_level.is_some();
        let product = self.store.update_product(id, update).await?;
        if reorder_changed {
            raise_stock_notifications(&self.store, &product).await;
        }
        Ok(product)
    }

    /// Lists products ordered by name, with the total matching count.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<(Vec<Product>, u64)> {
        let limit = page.limit.unwrap_or(self.config.default_page_size);
        if limit == 0 || limit > self.config.max_page_size {
            return Err(StockError::InvalidInput(format!(
                "limit {limit} is out of range (1..={})",
                self.config.max_page_size
            )));
        }
        Ok(self
            .store
            .list_products(filter, Pagination::new(limit, page.offset))
            .await?)
    }
}
