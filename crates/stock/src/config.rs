/// Tunables for the stock, ledger and catalog services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockConfig {
    /// How many times a mutation is re-read and retried after losing an
    /// optimistic-concurrency race.
    ///
    /// Retrying is bounded: once the retries are spent the change fails with
    /// a storage failure and nothing is written. Each lost race means another
    /// writer committed, so the bound only trips under sustained contention
    /// on a single product.
    pub max_retries: u32,

    /// Hard cap on ledger and product page sizes.
    pub max_page_size: usize,

    /// Page size used when the caller does not ask for one.
    pub default_page_size: usize,

    /// Minimum age of ledger entries removed by retention cleanup.
    /// Values below [`MIN_RETENTION_DAYS`] are raised to it.
    pub retention_min_days: i64,

    /// Reductions larger than this (outside corrections) are logged as warnings.
    pub large_reduction_threshold: i64,
}

/// Ledger entries younger than this are never purged.
pub const MIN_RETENTION_DAYS: i64 = 90;

impl StockConfig {
    /// Effective retention floor.
    pub fn retention_floor_days(&self) -> i64 {
        self.retention_min_days.max(MIN_RETENTION_DAYS)
    }
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            max_retries: 16,
            max_page_size: 1000,
            default_page_size: 100,
            retention_min_days: MIN_RETENTION_DAYS,
            large_reduction_threshold: 100,
        }
    }
}
