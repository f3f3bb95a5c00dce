use chrono::{DateTime, Utc};
use common::{OperationType, ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::LedgerEntry;

/// Ordering of ledger results by creation timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Reasons a ledger query is rejected before touching storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidQuery {
    #[error("date range is inverted: from {from} is after to {to}")]
    InvertedRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("limit {limit} is out of range (1..={max})")]
    LimitOutOfRange { limit: usize, max: usize },

    #[error("offset {0} is out of range")]
    OffsetOutOfRange(usize),
}

/// Builder for constructing ledger queries.
///
/// Allows filtering entries by product, user, operation type and an
/// inclusive time range, with limit/offset pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerQuery {
    pub product_id: Option<ProductId>,
    pub user_id: Option<UserId>,

    /// Filter by operation types (any of these types).
    pub operation_types: Option<Vec<OperationType>>,

    /// Entries created at or after this timestamp.
    pub from: Option<DateTime<Utc>>,

    /// Entries created at or before this timestamp.
    pub to: Option<DateTime<Utc>>,

    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub order: SortOrder,
}

impl LedgerQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a specific product.
    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Default::default()
        }
    }

    pub fn product_id(mut self, id: ProductId) -> Self {
        self.product_id = Some(id);
        self
    }

    pub fn user_id(mut self, id: UserId) -> Self {
        self.user_id = Some(id);
        self
    }

    /// Filters by a single operation type.
    pub fn operation_type(mut self, operation_type: OperationType) -> Self {
        self.operation_types = Some(vec![operation_type]);
        self
    }

    /// Filters by multiple operation types (any of these).
    pub fn operation_types(mut self, operation_types: Vec<OperationType>) -> Self {
        self.operation_types = Some(operation_types);
        self
    }

    /// Filters to entries at or after this timestamp.
    pub fn from(mut self, timestamp: DateTime<Utc>) -> Self {
        self.from = Some(timestamp);
        self
    }

    /// Filters to entries at or before this timestamp.
    pub fn to(mut self, timestamp: DateTime<Utc>) -> Self {
        self.to = Some(timestamp);
        self
    }

    /// Filters to an inclusive time range.
    pub fn between(self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from(from).to(to)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Returns the same filter with pagination removed.
    pub fn unpaged(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    /// Checks the date range and pagination bounds.
    pub fn validate(&self, max_limit: usize) -> Result<(), InvalidQuery> {
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(InvalidQuery::InvertedRange { from, to });
        }
        if let Some(limit) = self.limit
            && (limit == 0 || limit > max_limit)
        {
            return Err(InvalidQuery::LimitOutOfRange {
                limit,
                max: max_limit,
            });
        }
        if let Some(offset) = self.offset
            && i64::try_from(offset).is_err()
        {
            return Err(InvalidQuery::OffsetOutOfRange(offset));
        }
        Ok(())
    }

    /// Evaluates the filter part of the query against an entry in memory.
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(id) = self.product_id
            && entry.product_id != id
        {
            return false;
        }
        if let Some(id) = self.user_id
            && entry.user_id != id
        {
            return false;
        }
        if let Some(ref types) = self.operation_types
            && !types.contains(&entry.operation_type)
        {
            return false;
        }
        if let Some(from) = self.from
            && entry.created_at < from
        {
            return false;
        }
        if let Some(to) = self.to
            && entry.created_at > to
        {
            return false;
        }
        true
    }
}
