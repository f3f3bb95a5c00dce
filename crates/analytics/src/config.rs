use std::time::Duration;

/// Tunables for report generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Execution budget for a single report.
    pub timeout: Duration,

    /// Length of the default reporting window ending now.
    pub default_range_days: i64,

    /// Default size of "top N" sections.
    pub top_limit: usize,

    /// Largest accepted `top_limit`.
    pub max_top_limit: usize,

    /// How many recent ledger entries feed the consumption estimate.
    pub consumption_window: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            default_range_days: 30,
            top_limit: 10,
            max_top_limit: 100,
            consumption_window: 50,
        }
    }
}
