//! The six report shapes and the composer that builds them.
//!
//! Every report serializes as `{ report_type, generated_at, summary, ... }`.
//! Reports only read; a timed-out report leaves nothing behind.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Instant;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::{Money, OperationType, ParseTagError, ProductId, UserId, UserRole};
use ledger_store::{
    InventoryStore, LedgerQuery, LedgerStoreExt, Pagination, Product, ProductFilter,
};
use serde::{Deserialize, Serialize};
use stock::{LedgerService, StockConfig};

use crate::aggregate::{Aggregation, Aggregator, DailySummary, OperationSummary, ProductActivity, UserActivity};
use crate::alerts::{Priority, StockAlert, assess, sort_alerts};
use crate::config::ReportConfig;
use crate::error::{AnalyticsError, Result};
use crate::trend::{Trend, TrendDirection, compute_trend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    InventoryValuation,
    SalesPerformance,
    StockMovement,
    UserActivity,
    LowStockAlerts,
    ExecutiveSummary,
}

impl ReportType {
    pub const ALL: [ReportType; 6] = [
        ReportType::InventoryValuation,
        ReportType::SalesPerformance,
        ReportType::StockMovement,
        ReportType::UserActivity,
        ReportType::LowStockAlerts,
        ReportType::ExecutiveSummary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::InventoryValuation => "inventory_valuation",
            ReportType::SalesPerformance => "sales_performance",
            ReportType::StockMovement => "stock_movement",
            ReportType::UserActivity => "user_activity",
            ReportType::LowStockAlerts => "low_stock_alerts",
            ReportType::ExecutiveSummary => "executive_summary",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportType {
    type Err = ParseTagError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ReportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseTagError {
                kind: "report type",
                value: s.to_string(),
            })
    }
}

/// Options shared by all reports. Unset fields take the configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportOptions {
    /// Start of the reporting window (inclusive). Defaults to 30 days before `to`.
    pub from: Option<DateTime<Utc>>,

    /// End of the reporting window (inclusive). Defaults to now.
    pub to: Option<DateTime<Utc>>,

    /// Size of "top N" sections.
    pub top_limit: Option<usize>,

    /// Include products with no stock in the valuation. Defaults to true.
    pub include_zero_stock: Option<bool>,

    /// Include per-day series. Defaults to true.
    pub include_daily: Option<bool>,
}

/// Inclusive reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Period {
    fn query(&self) -> LedgerQuery {
        LedgerQuery::new().between(self.from, self.to)
    }

    fn days(&self) -> (NaiveDate, NaiveDate) {
        (self.from.date_naive(), self.to.date_naive())
    }
}

// -- Inventory valuation --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub total_products: usize,
    pub total_units: i64,
    pub total_value: Money,
    pub category_count: usize,
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryValuation {
    pub category: String,
    pub product_count: usize,
    pub total_units: i64,
    pub total_value: Money,
    pub value_share_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductValuation {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub stock_value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryValuationReport {
    pub report_type: ReportType,
    pub generated_at: DateTime<Utc>,
    pub summary: InventorySummary,
    pub categories: Vec<CategoryValuation>,
    pub top_products: Vec<ProductValuation>,
}

// -- Sales performance --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
    pub transactions: u64,
    pub units_sold: u64,
    pub estimated_revenue: Money,
    pub average_units_per_transaction: f64,
    pub distinct_products_sold: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub transactions: u64,
    pub units_sold: u64,
    pub estimated_revenue: Money,
    pub last_sale: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub transactions: u64,
    pub units_sold: u64,
}

impl From<&DailySummary> for DailySales {
    fn from(day: &DailySummary) -> Self {
        Self {
            date: day.date,
            transactions: day.summary.entries,
            units_sold: day.summary.total_decrease,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesPerformanceReport {
    pub report_type: ReportType,
    pub generated_at: DateTime<Utc>,
    pub period: Period,
    pub summary: SalesSummary,
    pub top_products: Vec<ProductSales>,
    pub trend: Trend,
    pub peak_day: Option<DailySales>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily: Option<Vec<DailySales>>,
}

// -- Stock movement --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementSummary {
    pub total_movements: u64,
    pub total_increase: u64,
    pub total_decrease: u64,
    pub net_change: i64,
    pub distinct_products: usize,
    pub distinct_users: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationMovement {
    #[serde(flatten)]
    pub totals: OperationSummary,

    /// Share of all movements in the period, in percent.
    pub share_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductMovement {
    pub sku: Option<String>,
    pub name: Option<String>,
    #[serde(flatten)]
    pub activity: ProductActivity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockMovementReport {
    pub report_type: ReportType,
    pub generated_at: DateTime<Utc>,
    pub period: Period,
    pub summary: MovementSummary,
    pub by_operation: Vec<OperationMovement>,
    pub most_active_products: Vec<ProductMovement>,
    pub trend: Trend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily: Option<Vec<DailySummary>>,
}

// -- User activity --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserActivitySummary {
    pub active_users: usize,
    pub total_activities: u64,
    pub average_activities_per_user: f64,
    pub most_active_user: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserActivityRow {
    pub username: Option<String>,
    pub role: Option<UserRole>,
    #[serde(flatten)]
    pub activity: UserActivity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserActivityReport {
    pub report_type: ReportType,
    pub generated_at: DateTime<Utc>,
    pub period: Period,
    pub summary: UserActivitySummary,

    /// Most active first.
    pub users: Vec<UserActivityRow>,
}

// -- Low-stock alerts --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSummary {
    pub total_alerts: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub out_of_stock: usize,
    pub total_shortage: i64,
    pub total_recommended_cost: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowStockAlertsReport {
    pub report_type: ReportType,
    pub generated_at: DateTime<Utc>,
    pub summary: AlertSummary,
    pub alerts: Vec<StockAlert>,
}

// -- Executive summary --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    pub inventory: InventorySummary,
    pub sales: SalesSummary,
    pub sales_trend: TrendDirection,
    pub movement: MovementSummary,
    pub users: UserActivitySummary,
    pub alerts: AlertSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummaryReport {
    pub report_type: ReportType,
    pub generated_at: DateTime<Utc>,
    pub period: Period,
    pub summary: ExecutiveSummary,
    pub insights: Vec<String>,
}

/// Any of the six reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    InventoryValuation(InventoryValuationReport),
    SalesPerformance(SalesPerformanceReport),
    StockMovement(StockMovementReport),
    UserActivity(UserActivityReport),
    LowStockAlerts(LowStockAlertsReport),
    ExecutiveSummary(ExecutiveSummaryReport),
}

impl Report {
    pub fn report_type(&self) -> ReportType {
        match self {
            Report::InventoryValuation(_) => ReportType::InventoryValuation,
            Report::SalesPerformance(_) => ReportType::SalesPerformance,
            Report::StockMovement(_) => ReportType::StockMovement,
            Report::UserActivity(_) => ReportType::UserActivity,
            Report::LowStockAlerts(_) => ReportType::LowStockAlerts,
            Report::ExecutiveSummary(_) => ReportType::ExecutiveSummary,
        }
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { part / whole * 100.0 }
}

/// Builds reports from the ledger and the current catalog.
///
/// Holds no state between calls, so one composer can serve concurrent
/// requests.
pub struct ReportComposer<S> {
    store: S,
    ledger: LedgerService<S>,
    config: ReportConfig,
}

impl<S: InventoryStore + Clone> ReportComposer<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ReportConfig::default(), StockConfig::default())
    }

    pub fn with_config(store: S, config: ReportConfig, stock_config: StockConfig) -> Self {
        Self {
            ledger: LedgerService::with_config(store.clone(), stock_config),
            store,
            config,
        }
    }

    /// Builds a report by type.
    pub async fn generate(&self, report_type: ReportType, opts: &ReportOptions) -> Result<Report> {
        Ok(match report_type {
            ReportType::InventoryValuation => {
                Report::InventoryValuation(self.inventory_valuation(opts).await?)
            }
            ReportType::SalesPerformance => {
                Report::SalesPerformance(self.sales_performance(opts).await?)
            }
            ReportType::StockMovement => Report::StockMovement(self.stock_movement(opts).await?),
            ReportType::UserActivity => Report::UserActivity(self.user_activity(opts).await?),
            ReportType::LowStockAlerts => {
                Report::LowStockAlerts(self.low_stock_alerts().await?)
            }
            ReportType::ExecutiveSummary => {
                Report::ExecutiveSummary(self.executive_summary(opts).await?)
            }
        })
    }

    #[tracing::instrument(skip(self, opts))]
    pub async fn inventory_valuation(&self, opts: &ReportOptions) -> Result<InventoryValuationReport> {
        self.timed(
            ReportType::InventoryValuation,
            self.build_inventory_valuation(opts),
        )
        .await
    }

    #[tracing::instrument(skip(self, opts))]
    pub async fn sales_performance(&self, opts: &ReportOptions) -> Result<SalesPerformanceReport> {
        self.timed(ReportType::SalesPerformance, self.build_sales_performance(opts))
            .await
    }

    #[tracing::instrument(skip(self, opts))]
    pub async fn stock_movement(&self, opts: &ReportOptions) -> Result<StockMovementReport> {
        self.timed(ReportType::StockMovement, self.build_stock_movement(opts))
            .await
    }

    #[tracing::instrument(skip(self, opts))]
    pub async fn user_activity(&self, opts: &ReportOptions) -> Result<UserActivityReport> {
        self.timed(ReportType::UserActivity, self.build_user_activity(opts))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn low_stock_alerts(&self) -> Result<LowStockAlertsReport> {
        self.timed(ReportType::LowStockAlerts, self.build_low_stock_alerts())
            .await
    }

    /// The other five summaries plus templated insights, under one budget.
    #[tracing::instrument(skip(self, opts))]
    pub async fn executive_summary(&self, opts: &ReportOptions) -> Result<ExecutiveSummaryReport> {
        self.timed(ReportType::ExecutiveSummary, self.build_executive_summary(opts))
            .await
    }

    async fn timed<T>(
        &self,
        report_type: ReportType,
        build: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = tokio::time::timeout(self.config.timeout, build).await;
        metrics::histogram!("report_duration_seconds", "report_type" => report_type.as_str())
            .record(start.elapsed().as_secs_f64());

        match result {
            Ok(report) => report,
            Err(_) => {
                metrics::counter!("report_timeouts_total").increment(1);
                tracing::warn!(%report_type, budget = ?self.config.timeout, "report timed out");
                Err(AnalyticsError::Timeout {
                    report_type: report_type.as_str(),
                    budget: self.config.timeout,
                })
            }
        }
    }

    fn resolve_period(&self, opts: &ReportOptions) -> Result<Period> {
        let default_span = Duration::days(self.config.default_range_days);
        let to = opts.to.unwrap_or_else(Utc::now);
        let from = match opts.from {
            Some(from) => from,
            None => to.checked_sub_signed(default_span).ok_or_else(|| {
                AnalyticsError::InvalidInput(format!("report end {to} is out of range"))
            })?,
        };
        if from > to {
            return Err(AnalyticsError::InvalidInput(format!(
                "date range is inverted: from {from} is after to {to}"
            )));
        }
        Ok(Period { from, to })
    }

    fn top_limit(&self, opts: &ReportOptions) -> Result<usize> {
        let limit = opts.top_limit.unwrap_or(self.config.top_limit);
        if limit == 0 || limit > self.config.max_top_limit {
            return Err(AnalyticsError::InvalidInput(format!(
                "top_limit {limit} is out of range (1..={})",
                self.config.max_top_limit
            )));
        }
        Ok(limit)
    }

    async fn all_products(&self) -> Result<Vec<Product>> {
        let (products, _) = self
            .store
            .list_products(&ProductFilter::default(), Pagination::all())
            .await?;
        Ok(products)
    }

    async fn aggregate(&self, query: &LedgerQuery) -> Result<Aggregation> {
        let stream = self.ledger.stream(query).await?;
        Aggregator::fold(stream).await
    }

    async fn build_inventory_valuation(
        &self,
        opts: &ReportOptions,
    ) -> Result<InventoryValuationReport> {
        let limit = self.top_limit(opts)?;
        let include_zero = opts.include_zero_stock.unwrap_or(true);

        let products: Vec<Product> = self
            .all_products()
            .await?
            .into_iter()
            .filter(|p| include_zero || p.quantity > 0)
            .collect();

        let total_value: Money = products.iter().map(Product::stock_value).sum();
        let mut categories: BTreeMap<&str, CategoryValuation> = BTreeMap::new();
        for product in &products {
            let row = categories
                .entry(product.category.as_str())
                .or_insert_with(|| CategoryValuation {
                    category: product.category.clone(),
                    product_count: 0,
                    total_units: 0,
                    total_value: Money::zero(),
                    value_share_percent: 0.0,
                });
            row.product_count += 1;
            row.total_units += product.quantity;
            row.total_value += product.stock_value();
        }
        let categories: Vec<_> = categories
            .into_values()
            .map(|mut c| {
                c.value_share_percent =
                    percent(c.total_value.cents() as f64, total_value.cents() as f64);
                c
            })
            .collect();

        let mut top_products: Vec<ProductValuation> = products
            .iter()
            .map(|p| ProductValuation {
                product_id: p.id,
                sku: p.sku.clone(),
                name: p.name.clone(),
                category: p.category.clone(),
                quantity: p.quantity,
                unit_price: p.unit_price,
                stock_value: p.stock_value(),
            })
            .collect();
        top_products.sort_by(|a, b| b.stock_value.cmp(&a.stock_value).then(a.sku.cmp(&b.sku)));
        top_products.truncate(limit);

        let summary = InventorySummary {
            total_products: products.len(),
            total_units: products.iter().map(|p| p.quantity).sum(),
            total_value,
            category_count: categories.len(),
            low_stock_count: products
                .iter()
                .filter(|p| p.is_low_stock() && !p.is_out_of_stock())
                .count(),
            out_of_stock_count: products.iter().filter(|p| p.is_out_of_stock()).count(),
        };

        Ok(InventoryValuationReport {
            report_type: ReportType::InventoryValuation,
            generated_at: Utc::now(),
            summary,
            categories,
            top_products,
        })
    }

    async fn build_sales_performance(&self, opts: &ReportOptions) -> Result<SalesPerformanceReport> {
        let period = self.resolve_period(opts)?;
        let limit = self.top_limit(opts)?;

        let aggregation = self
            .aggregate(&period.query().operation_type(OperationType::Sale))
            .await?;
        let products: HashMap<ProductId, Product> = self
            .all_products()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let revenue_of = |activity: &ProductActivity| -> Money {
            products
                .get(&activity.product_id)
                .map(|p| p.unit_price.multiply(activity.summary.total_decrease as i64))
                .unwrap_or_default()
        };

        let estimated_revenue: Money = aggregation.by_product.iter().map(&revenue_of).sum();
        let top_products = aggregation
            .top_products_by(limit, |p| p.summary.total_decrease)
            .into_iter()
            .map(|activity| {
                let product = products.get(&activity.product_id);
                ProductSales {
                    product_id: activity.product_id,
                    sku: product.map(|p| p.sku.clone()),
                    name: product.map(|p| p.name.clone()),
                    transactions: activity.summary.entries,
                    units_sold: activity.summary.total_decrease,
                    estimated_revenue: revenue_of(&activity),
                    last_sale: activity.summary.last_activity,
                }
            })
            .collect();

        let overall = &aggregation.overall;
        let summary = SalesSummary {
            transactions: overall.entries,
            units_sold: overall.total_decrease,
            estimated_revenue,
            average_units_per_transaction: if overall.entries == 0 {
                0.0
            } else {
                overall.total_decrease as f64 / overall.entries as f64
            },
            distinct_products_sold: overall.distinct_products,
        };

        let (first_day, last_day) = period.days();
        let trend = compute_trend(&aggregation.daily_series(first_day, last_day, |s| {
            s.total_decrease as f64
        }));
        let daily = opts
            .include_daily
            .unwrap_or(true)
            .then(|| aggregation.by_day.iter().map(DailySales::from).collect());

        Ok(SalesPerformanceReport {
            report_type: ReportType::SalesPerformance,
            generated_at: Utc::now(),
            period,
            summary,
            top_products,
            trend,
            peak_day: aggregation.peak_day().map(DailySales::from),
            daily,
        })
    }

    async fn build_stock_movement(&self, opts: &ReportOptions) -> Result<StockMovementReport> {
        let period = self.resolve_period(opts)?;
        let limit = self.top_limit(opts)?;

        let aggregation = self.aggregate(&period.query()).await?;
        let overall = &aggregation.overall;

        let by_operation = aggregation
            .by_operation
            .iter()
            .map(|o| OperationMovement {
                share_percent: percent(o.summary.entries as f64, overall.entries as f64),
                totals: o.clone(),
            })
            .collect();

        let mut most_active_products = Vec::new();
        for activity in aggregation.most_active_products(limit) {
            let product = self.store.get_product(activity.product_id).await?;
            most_active_products.push(ProductMovement {
                sku: product.as_ref().map(|p| p.sku.clone()),
                name: product.map(|p| p.name),
                activity,
            });
        }

        let (first_day, last_day) = period.days();
        let trend = compute_trend(
            &aggregation.daily_series(first_day, last_day, |s| s.entries as f64),
        );

        let summary = MovementSummary {
            total_movements: overall.entries,
            total_increase: overall.total_increase,
            total_decrease: overall.total_decrease,
            net_change: overall.net_change,
            distinct_products: overall.distinct_products,
            distinct_users: overall.distinct_users,
        };
        let daily = opts
            .include_daily
            .unwrap_or(true)
            .then(|| aggregation.by_day.clone());

        Ok(StockMovementReport {
            report_type: ReportType::StockMovement,
            generated_at: Utc::now(),
            period,
            summary,
            by_operation,
            most_active_products,
            trend,
            daily,
        })
    }

    async fn build_user_activity(&self, opts: &ReportOptions) -> Result<UserActivityReport> {
        let period = self.resolve_period(opts)?;
        let limit = self.top_limit(opts)?;

        let aggregation = self.aggregate(&period.query()).await?;
        let ranked = aggregation.most_active_users(aggregation.by_user.len());

        let total_activities = aggregation.overall.entries;
        let summary = UserActivitySummary {
            active_users: ranked.len(),
            total_activities,
            average_activities_per_user: if ranked.is_empty() {
                0.0
            } else {
                total_activities as f64 / ranked.len() as f64
            },
            most_active_user: ranked.first().map(|u| u.user_id),
        };

        let mut users = Vec::with_capacity(limit.min(ranked.len()));
        for activity in ranked.into_iter().take(limit) {
            let user = self.store.get_user(activity.user_id).await?;
            users.push(UserActivityRow {
                username: user.as_ref().map(|u| u.username.clone()),
                role: user.map(|u| u.role),
                activity,
            });
        }

        Ok(UserActivityReport {
            report_type: ReportType::UserActivity,
            generated_at: Utc::now(),
            period,
            summary,
            users,
        })
    }

    async fn build_low_stock_alerts(&self) -> Result<LowStockAlertsReport> {
        let now = Utc::now();
        let (low, _) = self
            .store
            .list_products(&ProductFilter::low_stock(), Pagination::all())
            .await?;

        let mut alerts = Vec::with_capacity(low.len());
        for product in &low {
            let recent = self
                .store
                .recent_entries(product.id, self.config.consumption_window)
                .await?;
            alerts.push(assess(product, &recent, now));
        }
        sort_alerts(&mut alerts);

        let count = |priority: Priority| alerts.iter().filter(|a| a.priority == priority).count();
        let summary = AlertSummary {
            total_alerts: alerts.len(),
            critical: count(Priority::Critical),
            high: count(Priority::High),
            medium: count(Priority::Medium),
            low: count(Priority::Low),
            out_of_stock: alerts.iter().filter(|a| a.quantity == 0).count(),
            total_shortage: alerts.iter().map(|a| a.shortage).sum(),
            total_recommended_cost: alerts.iter().map(|a| a.recommended_order_cost).sum(),
        };

        Ok(LowStockAlertsReport {
            report_type: ReportType::LowStockAlerts,
            generated_at: now,
            summary,
            alerts,
        })
    }

    async fn build_executive_summary(&self, opts: &ReportOptions) -> Result<ExecutiveSummaryReport> {
        let period = self.resolve_period(opts)?;
        // Pin the window so every section covers the same period.
        let opts = ReportOptions {
            from: Some(period.from),
            to: Some(period.to),
            include_daily: Some(false),
            ..opts.clone()
        };

        let inventory = self.build_inventory_valuation(&opts).await?;
        let sales = self.build_sales_performance(&opts).await?;
        let movement = self.build_stock_movement(&opts).await?;
        let users = self.build_user_activity(&opts).await?;
        let alerts = self.build_low_stock_alerts().await?;

        let summary = ExecutiveSummary {
            inventory: inventory.summary,
            sales: sales.summary,
            sales_trend: sales.trend.direction,
            movement: movement.summary,
            users: users.summary,
            alerts: alerts.summary,
        };
        let insights = insights(&summary, &sales.trend);

        Ok(ExecutiveSummaryReport {
            report_type: ReportType::ExecutiveSummary,
            generated_at: Utc::now(),
            period,
            summary,
            insights,
        })
    }
}

/// Templated sentences keyed on threshold comparisons.
pub fn insights(summary: &ExecutiveSummary, sales_trend: &Trend) -> Vec<String> {
    let mut insights = Vec::new();

    if summary.alerts.critical > 0 {
        insights.push(format!(
            "{} critical items need immediate reordering",
            summary.alerts.critical
        ));
    }
    if summary.alerts.out_of_stock > 0 {
        insights.push(format!(
            "{} products are out of stock",
            summary.alerts.out_of_stock
        ));
    }

    match (sales_trend.direction, sales_trend.change_percent) {
        (TrendDirection::Increasing, Some(change)) => insights.push(format!(
            "Sales are trending up ({change:.1}% vs the previous window)"
        )),
        (TrendDirection::Increasing, None) => {
            insights.push("Sales picked up after a period without sales".to_string())
        }
        (TrendDirection::Decreasing, Some(change)) => insights.push(format!(
            "Sales are trending down ({change:.1}% vs the previous window)"
        )),
        (TrendDirection::Decreasing, None) | (TrendDirection::Stable, _) => {
            if summary.sales.transactions > 0 {
                insights.push("Sales are stable".to_string());
            }
        }
    }

    if summary.movement.total_movements == 0 {
        insights.push("No stock activity was recorded in the period".to_string());
    } else if summary.movement.net_change < 0 {
        insights.push(format!(
            "Stock on hand fell by {} units over the period",
            summary.movement.net_change.unsigned_abs()
        ));
    } else if summary.movement.net_change > 0 {
        insights.push(format!(
            "Stock on hand grew by {} units over the period",
            summary.movement.net_change
        ));
    }

    insights
}
