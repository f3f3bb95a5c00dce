//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use analytics::ReportConfig;
use stock::StockConfig;

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` bind address (default: `"0.0.0.0"`)
/// - `PORT` listen port (default: `3000`)
/// - `RUST_LOG` tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` `text` or `json` (default: `text`)
/// - `DATABASE_URL` PostgreSQL connection string; in-memory storage when unset
/// - `DATABASE_MAX_CONNECTIONS` pool size (default: `10`)
/// - `REPORT_TIMEOUT_SECS` report budget (default: `30`)
/// - `LEDGER_QUERY_MAX_LIMIT` ledger page cap (default: `1000`)
/// - `LEDGER_RETENTION_MIN_DAYS` retention floor, never below 90 (default: `90`)
/// - `MUTATION_MAX_RETRIES` optimistic-concurrency retries (default: `16`)
/// - `LARGE_REDUCTION_THRESHOLD` units before a reduction is logged (default: `100`)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub report_timeout: Duration,
    pub ledger_query_max_limit: usize,
    pub retention_min_days: i64,
    pub mutation_max_retries: u32,
    pub large_reduction_threshold: i64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let lookup = &lookup;

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref().map(str::trim) {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parsed(lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            report_timeout: parsed(lookup, "REPORT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.report_timeout),
            ledger_query_max_limit: parsed(lookup, "LEDGER_QUERY_MAX_LIMIT")
                .unwrap_or(defaults.ledger_query_max_limit),
            retention_min_days: parsed(lookup, "LEDGER_RETENTION_MIN_DAYS")
                .unwrap_or(defaults.retention_min_days),
            mutation_max_retries: parsed(lookup, "MUTATION_MAX_RETRIES")
                .unwrap_or(defaults.mutation_max_retries),
            large_reduction_threshold: parsed(lookup, "LARGE_REDUCTION_THRESHOLD")
                .unwrap_or(defaults.large_reduction_threshold),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn stock_config(&self) -> StockConfig {
        StockConfig {
            max_retries: self.mutation_max_retries,
            max_page_size: self.ledger_query_max_limit,
            retention_min_days: self.retention_min_days,
            large_reduction_threshold: self.large_reduction_threshold,
            ..StockConfig::default()
        }
    }

    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            timeout: self.report_timeout,
            ..ReportConfig::default()
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        let stock = StockConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            report_timeout: ReportConfig::default().timeout,
            ledger_query_max_limit: stock.max_page_size,
            retention_min_days: stock.retention_min_days,
            mutation_max_retries: stock.max_retries,
            large_reduction_threshold: stock.large_reduction_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.report_timeout, Duration::from_secs(30));
        assert_eq!(config.ledger_query_max_limit, 1000);
        assert_eq!(config.retention_min_days, 90);
        assert_eq!(config.mutation_max_retries, 16);
        assert_eq!(config.large_reduction_threshold, 100);
    }

    #[test]
    fn test_empty_environment_matches_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.addr(), Config::default().addr());
        assert_eq!(config.stock_config(), StockConfig::default());
        assert_eq!(config.report_config(), ReportConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/inventory"),
            ("REPORT_TIMEOUT_SECS", "5"),
            ("LEDGER_QUERY_MAX_LIMIT", "250"),
            ("MUTATION_MAX_RETRIES", "3"),
        ]);

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/inventory")
        );
        assert_eq!(config.report_config().timeout, Duration::from_secs(5));
        assert_eq!(config.stock_config().max_page_size, 250);
        assert_eq!(config.stock_config().max_retries, 3);
    }

    #[test]
    fn test_each_numeric_field_parses_its_own_type() {
        let config = from_pairs(&[
            ("PORT", " 9000 "),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("REPORT_TIMEOUT_SECS", "12"),
            ("LEDGER_QUERY_MAX_LIMIT", "50"),
            ("LEDGER_RETENTION_MIN_DAYS", "120"),
            ("MUTATION_MAX_RETRIES", "2"),
            ("LARGE_REDUCTION_THRESHOLD", "-1"),
        ]);

        assert_eq!(config.port, 9000u16);
        assert_eq!(config.database_max_connections, 4u32);
        assert_eq!(config.report_timeout, Duration::from_secs(12));
        assert_eq!(config.ledger_query_max_limit, 50usize);
        assert_eq!(config.retention_min_days, 120i64);
        assert_eq!(config.mutation_max_retries, 2u32);
        assert_eq!(config.large_reduction_threshold, -1i64);

        // Out of range for u16.
        let config = from_pairs(&[("PORT", "70000")]);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_pairs(&[("PORT", "not-a-port"), ("DATABASE_URL", "  ")]);
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_retention_floor_is_enforced_downstream() {
        let config = from_pairs(&[("LEDGER_RETENTION_MIN_DAYS", "7")]);
        assert_eq!(config.retention_min_days, 7);
        assert_eq!(config.stock_config().retention_floor_days(), 90);
    }
}
