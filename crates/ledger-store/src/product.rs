//! Product rows and catalog filters.

use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::Version;

/// Current state of a product.
///
/// `quantity` is only ever written through a committed stock mutation; all
/// other fields belong to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    /// Unique, immutable after creation.
    pub sku: String,

    pub name: String,
    pub category: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub reorder_level: i64,
    pub location: Option<String>,
    pub supplier: Option<String>,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns true when the quantity has reached the reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    /// Value of the units on hand at the current unit price.
    pub fn stock_value(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Partial update of catalog fields. `None` leaves a field untouched.
///
/// SKU and quantity are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit_price: Option<Money>,
    pub reorder_level: Option<i64>,
    pub location: Option<String>,
    pub supplier: Option<String>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ProductUpdate::default()
    }

    /// Applies the set fields to a product, bumping `updated_at`.
    pub fn apply_to(&self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
        if let Some(price) = self.unit_price {
            product.unit_price = price;
        }
        if let Some(level) = self.reorder_level {
            product.reorder_level = level;
        }
        if let Some(location) = &self.location {
            product.location = Some(location.clone());
        }
        if let Some(supplier) = &self.supplier {
            product.supplier = Some(supplier.clone());
        }
        product.updated_at = now;
    }
}

/// Filter for listing products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub location: Option<String>,
    pub supplier: Option<String>,

    /// Only products with `quantity <= reorder_level`.
    #[serde(default)]
    pub low_stock_only: bool,

    /// Case-insensitive substring match on name or SKU.
    pub search: Option<String>,
}

impl ProductFilter {
    pub fn low_stock() -> Self {
        Self {
            low_stock_only: true,
            ..Default::default()
        }
    }

    /// Evaluates the filter against a product in memory.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category
            && &product.category != category
        {
            return false;
        }
        if let Some(location) = &self.location
            && product.location.as_ref() != Some(location)
        {
            return false;
        }
        if let Some(supplier) = &self.supplier
            && product.supplier.as_ref() != Some(supplier)
        {
            return false;
        }
        if self.low_stock_only && !product.is_low_stock() {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !product.name.to_lowercase().contains(&needle)
                && !product.sku.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Limit/offset window over a result set. A `None` limit returns everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl Pagination {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// No limit, no offset.
    pub fn all() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, sku: &str, quantity: i64, reorder_level: i64) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(),
            sku: sku.to_string(),
            name: name.to_string(),
            category: "hardware".to_string(),
            unit_price: Money::from_cents(250),
            quantity,
            reorder_level,
            location: Some("A1".to_string()),
            supplier: None,
            version: Version::first(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn low_stock_includes_equality() {
        assert!(product("Bolt", "B-1", 10, 10).is_low_stock());
        assert!(!product("Bolt", "B-1", 11, 10).is_low_stock());
        assert!(product("Bolt", "B-1", 0, 10).is_out_of_stock());
    }

    #[test]
    fn stock_value_uses_unit_price() {
        assert_eq!(product("Bolt", "B-1", 4, 1).stock_value().cents(), 1000);
    }

    #[test]
    fn filter_matches_search_and_category() {
        let bolt = product("Hex Bolt", "HB-100", 50, 10);

        let filter = ProductFilter {
            search: Some("hex".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&bolt));

        let filter = ProductFilter {
            search: Some("hb-1".to_string()),
            category: Some("hardware".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&bolt));

        let filter = ProductFilter {
            category: Some("garden".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&bolt));
        assert!(!ProductFilter::low_stock().matches(&bolt));
    }

    #[test]
    fn update_leaves_unset_fields() {
        let mut bolt = product("Bolt", "B-1", 5, 2);
        let update = ProductUpdate {
            name: Some("Carriage Bolt".to_string()),
            reorder_level: Some(8),
            ..Default::default()
        };
        update.apply_to(&mut bolt, Utc::now());

        assert_eq!(bolt.name, "Carriage Bolt");
        assert_eq!(bolt.reorder_level, 8);
        assert_eq!(bolt.sku, "B-1");
        assert_eq!(bolt.quantity, 5);
        assert_eq!(bolt.location.as_deref(), Some("A1"));
    }
}
