//! Read access to the stock ledger, plus retention cleanup.

use chrono::{DateTime, Duration, Utc};
use common::ProductId;
use futures_util::TryStreamExt;
use ledger_store::{
    EntryStream, InventoryStore, LedgerEntry, LedgerQuery, LedgerStoreExt, Pagination, SortOrder,
};
use serde::Serialize;

use crate::config::StockConfig;
use crate::error::{Result, StockError};

/// One page of ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerPage {
    pub entries: Vec<LedgerEntry>,

    /// Matching entries ignoring pagination.
    pub total: u64,

    pub limit: usize,
    pub offset: usize,
}

/// Outcome of replaying a product's ledger against its stored quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub product_id: ProductId,
    pub entries: u64,

    /// Quantity implied by the ledger.
    pub ledger_quantity: i64,

    /// Quantity stored on the product.
    pub product_quantity: i64,

    /// Entries whose old quantity does not match the previous entry's new quantity.
    pub breaks: u64,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.breaks == 0 && self.ledger_quantity == self.product_quantity
    }
}

/// Filtered, paginated ledger reads.
pub struct LedgerService<S> {
    store: S,
    config: StockConfig,
}

impl<S: InventoryStore> LedgerService<S> {
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

    /// Runs a ledger query. Results are newest first unless the query says
    /// otherwise; a missing limit falls back to the default page size.
    #[tracing::instrument(name = "query", skip(self))]
    pub async fn query(&self, query: LedgerQuery) -> Result<LedgerPage> {
        query.validate(self.config.max_page_size)?;

        let limit = query.limit.unwrap_or(self.config.default_page_size);
        let offset = query.offset.unwrap_or(0);
        let query = query.limit(limit).offset(offset);

        let (entries, total) = self.store.query_entries(&query).await?;
        tracing::debug!(returned = entries.len(), total, "ledger query");

        Ok(LedgerPage {
            entries,
            total,
            limit,
            offset,
        })
    }

    /// Streams every entry matching the query's filters, oldest first.
    ///
    /// Pagination on the query is ignored; the date range is still validated.
    pub async fn stream(&self, query: &LedgerQuery) -> Result<EntryStream> {
        query.unpaged().validate(self.config.max_page_size)?;
        Ok(self.store.stream_entries(query).await?)
    }

    /// Every entry for a product since `since`, oldest first.
    pub async fn entries_since(
        &self,
        product_id: ProductId,
        since: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>> {
        Ok(self.store.entries_since(product_id, since).await?)
    }

    /// The `n` most recent entries for a product, newest first.
    pub async fn recent_entries(&self, product_id: ProductId, n: usize) -> Result<Vec<LedgerEntry>> {
        if n == 0 || n > self.config.max_page_size {
            return Err(StockError::InvalidInput(format!(
                "entry count {n} is out of range (1..={})",
                self.config.max_page_size
            )));
        }
        Ok(self.store.recent_entries(product_id, n).await?)
    }

    /// A product's ledger, newest first. Fails when the product does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn product_history(
        &self,
        product_id: ProductId,
        page: Pagination,
    ) -> Result<LedgerPage> {
        self.require_product(product_id).await?;

        let mut query = LedgerQuery::for_product(product_id).offset(page.offset);
        if let Some(limit) = page.limit {
            query = query.limit(limit);
        }
        self.query(query).await
    }

    /// Replays a product's ledger and compares it with the stored quantity.
    #[tracing::instrument(skip(self))]
    pub async fn verify_consistency(&self, product_id: ProductId) -> Result<ConsistencyReport> {
        let product = self.require_product(product_id).await?;

        let query = LedgerQuery::for_product(product_id).order(SortOrder::OldestFirst);
        let mut stream = self.store.stream_entries(&query).await?;

        let mut entries = 0u64;
        let mut breaks = 0u64;
        let mut ledger_quantity: Option<i64> = None;

        while let Some(entry) = stream.try_next().await? {
            entries += 1;
            match ledger_quantity {
                // The oldest surviving entry anchors the replay.
                None => ledger_quantity = Some(entry.old_quantity + entry.delta()),
                Some(q) => {
                    if entry.old_quantity != q {
                        breaks += 1;
                    }
                    ledger_quantity = Some(q + entry.delta());
                }
            }
        }

        let report = ConsistencyReport {
            product_id,
            entries,
            ledger_quantity: ledger_quantity.unwrap_or(0),
            product_quantity: product.quantity,
            breaks,
        };
        if !report.is_consistent() {
            tracing::error!(
                ledger_quantity = report.ledger_quantity,
                product_quantity = report.product_quantity,
                breaks,
                "ledger diverges from product quantity"
            );
        }
        Ok(report)
    }

    /// Deletes entries older than `min_age_days`. Ages below the configured
    /// retention floor are rejected.
    #[tracing::instrument(skip(self))]
    pub async fn purge_expired(&self, min_age_days: i64) -> Result<u64> {
        let floor = self.config.retention_floor_days();
        if min_age_days < floor {
            return Err(StockError::InvalidInput(format!(
                "retention age must be at least {floor} days, got {min_age_days}"
            )));
        }

        let cutoff = Duration::try_days(min_age_days)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| {
                StockError::InvalidInput(format!("retention age {min_age_days} is out of range"))
            })?;
        let removed = self.store.purge_entries_before(cutoff).await?;
        tracing::info!(removed, %cutoff, "purged expired ledger entries");
        Ok(removed)
    }

    async fn require_product(&self, product_id: ProductId) -> Result<ledger_store::Product> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| StockError::not_found("product", product_id))
    }
}
