use chrono::{DateTime, Utc};
use common::{EntryId, OperationType, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// Row version of a product, used for optimistic concurrency control.
///
/// Every committed quantity change increments the version by one, so a
/// writer holding a stale read is detected at commit time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version (1) of a freshly inserted product.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// An immutable record of one accepted quantity change.
///
/// Entries are appended exactly once per committed stock mutation and are
/// never updated afterwards. The only way an entry disappears is the
/// retention purge, which removes entries older than a minimum age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub product_id: ProductId,

    /// Who performed the change.
    pub user_id: UserId,

    pub old_quantity: i64,
    pub new_quantity: i64,

    /// Free-text justification supplied by the caller. Never empty.
    pub reason: String,

    pub operation_type: OperationType,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Creates a new entry timestamped now.
    pub fn new(
        product_id: ProductId,
        user_id: UserId,
        old_quantity: i64,
        new_quantity: i64,
        reason: impl Into<String>,
        operation_type: OperationType,
    ) -> Self {
        Self {
            id: EntryId::new(),
            product_id,
            user_id,
            old_quantity,
            new_quantity,
            reason: reason.into(),
            operation_type,
            created_at: Utc::now(),
        }
    }

    /// Creates a new entry builder.
    pub fn builder() -> LedgerEntryBuilder {
        LedgerEntryBuilder::default()
    }

    /// Signed quantity change (`new - old`).
    pub fn delta(&self) -> i64 {
        self.new_quantity - self.old_quantity
    }

    /// Units added by this entry, zero for reductions.
    pub fn increase(&self) -> u64 {
        self.delta().max(0) as u64
    }

    /// Units removed by this entry, zero for additions.
    pub fn decrease(&self) -> u64 {
        self.delta().min(0).unsigned_abs()
    }
}

/// Builder for constructing ledger entries, mostly useful for seeding and tests.
#[derive(Debug, Default)]
pub struct LedgerEntryBuilder {
    id: Option<EntryId>,
    product_id: Option<ProductId>,
    user_id: Option<UserId>,
    quantities: Option<(i64, i64)>,
    reason: Option<String>,
    operation_type: Option<OperationType>,
    created_at: Option<DateTime<Utc>>,
}

impl LedgerEntryBuilder {
    /// Sets the entry ID. If not set, a new ID will be generated.
    pub fn id(mut self, id: EntryId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn product_id(mut self, id: ProductId) -> Self {
        self.product_id = Some(id);
        self
    }

    pub fn user_id(mut self, id: UserId) -> Self {
        self.user_id = Some(id);
        self
    }

    /// Sets the quantity before and after the change.
    pub fn quantities(mut self, old_quantity: i64, new_quantity: i64) -> Self {
        self.quantities = Some((old_quantity, new_quantity));
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn operation_type(mut self, operation_type: OperationType) -> Self {
        self.operation_type = Some(operation_type);
        self
    }

    /// Sets the timestamp. If not set, the current time will be used.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Builds the entry.
    ///
    /// # Panics
    ///
    /// Panics if required fields (product_id, user_id, quantities, operation_type)
    /// are not set.
    pub fn build(self) -> LedgerEntry {
        self.try_build()
            .expect("product_id, user_id, quantities and operation_type are required")
    }

    /// Tries to build the entry, returning None if required fields are missing.
    pub fn try_build(self) -> Option<LedgerEntry> {
        let (old_quantity, new_quantity) = self.quantities?;
        let operation_type = self.operation_type?;
        Some(LedgerEntry {
            id: self.id.unwrap_or_default(),
            product_id: self.product_id?,
            user_id: self.user_id?,
            old_quantity,
            new_quantity,
            reason: self
                .reason
                .unwrap_or_else(|| operation_type.as_str().to_string()),
            operation_type,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering() {
        let v1 = Version::new(1);
        let v2 = Version::new(2);
        assert!(v1 < v2);
        assert_eq!(v1.next(), v2);
        assert_eq!(Version::first().as_i64(), 1);
    }

    #[test]
    fn delta_increase_and_decrease() {
        let entry = LedgerEntry::new(
            ProductId::new(),
            UserId::new(),
            20,
            5,
            "sale",
            OperationType::Sale,
        );
        assert_eq!(entry.delta(), -15);
        assert_eq!(entry.increase(), 0);
        assert_eq!(entry.decrease(), 15);

        let restock = LedgerEntry::new(
            ProductId::new(),
            UserId::new(),
            5,
            30,
            "delivery",
            OperationType::Purchase,
        );
        assert_eq!(restock.delta(), 25);
        assert_eq!(restock.increase(), 25);
        assert_eq!(restock.decrease(), 0);
    }

    #[test]
    fn builder_fills_defaults() {
        let product_id = ProductId::new();
        let entry = LedgerEntry::builder()
            .product_id(product_id)
            .user_id(UserId::new())
            .quantities(0, 10)
            .operation_type(OperationType::Purchase)
            .build();

        assert_eq!(entry.product_id, product_id);
        assert_eq!(entry.reason, "purchase");
        assert_eq!(entry.delta(), 10);
    }

    #[test]
    fn builder_try_build_returns_none_on_missing_fields() {
        assert!(LedgerEntry::builder().try_build().is_none());
        assert!(
            LedgerEntry::builder()
                .product_id(ProductId::new())
                .quantities(1, 2)
                .try_build()
                .is_none()
        );
    }
}
