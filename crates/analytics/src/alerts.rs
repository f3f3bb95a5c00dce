//! Low-stock urgency scoring and naive stockout prediction.
//!
//! Every figure here is a heuristic. Alerts carry `confidence: low` so
//! consumers never mistake them for a forecast.

use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use ledger_store::{LedgerEntry, Product};
use serde::Serialize;

/// Urgency of an empty product.
pub const OUT_OF_STOCK_URGENCY: f64 = 100.0;

/// Ceiling for products that still have stock.
pub const MAX_IN_STOCK_URGENCY: f64 = 90.0;

/// Units below the reorder level. Never negative.
pub fn shortage(quantity: i64, reorder_level: i64) -> i64 {
    (reorder_level - quantity).max(0)
}

/// 100 when empty, otherwise the relative shortfall scaled to at most 90.
///
/// Monotonic: for a fixed reorder level, less stock never scores lower.
pub fn urgency_score(quantity: i64, reorder_level: i64) -> f64 {
    if quantity <= 0 {
        return OUT_OF_STOCK_URGENCY;
    }
    if reorder_level <= 0 {
        return 0.0;
    }
    let relative = shortage(quantity, reorder_level) as f64 / reorder_level as f64;
    (relative * MAX_IN_STOCK_URGENCY)
        .min(MAX_IN_STOCK_URGENCY)
        .clamp(0.0, OUT_OF_STOCK_URGENCY)
}

/// Units needed to get back to twice the reorder level.
pub fn recommended_order_quantity(quantity: i64, reorder_level: i64) -> i64 {
    (reorder_level.saturating_mul(2) - quantity).max(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn from_score(quantity: i64, urgency: f64) -> Self {
        if quantity <= 0 || urgency >= 75.0 {
            Priority::Critical
        } else if urgency >= 50.0 {
            Priority::High
        } else if urgency >= 25.0 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
}

/// Where a consumption estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionBasis {
    /// Derived from consuming ledger entries.
    History,
    /// No consuming history; a tenth of the reorder level was assumed.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConsumptionEstimate {
    pub units_per_day: f64,
    pub basis: ConsumptionBasis,
}

/// Estimates daily consumption from recent entries.
///
/// Only negative deltas of consuming operations (sale, damage, transfer)
/// count. The rate is the consumed total over the whole days since the oldest
/// such entry, with at least one day assumed. Without history the estimate
/// is `max(1, reorder_level * 0.1)`.
pub fn estimate_daily_consumption(
    recent: &[LedgerEntry],
    reorder_level: i64,
    now: DateTime<Utc>,
) -> ConsumptionEstimate {
    let consuming = recent
        .iter()
        .filter(|e| e.operation_type.is_consuming() && e.decrease() > 0);

    let mut total = 0u64;
    let mut oldest: Option<DateTime<Utc>> = None;
    for entry in consuming {
        total += entry.decrease();
        oldest = Some(oldest.map_or(entry.created_at, |t| t.min(entry.created_at)));
    }

    match oldest {
        Some(oldest) if total > 0 => {
            let days = (now - oldest).num_days().max(1);
            ConsumptionEstimate {
                units_per_day: total as f64 / days as f64,
                basis: ConsumptionBasis::History,
            }
        }
        _ => ConsumptionEstimate {
            units_per_day: (reorder_level as f64 * 0.1).max(1.0),
            basis: ConsumptionBasis::Default,
        },
    }
}

/// Whole days until stock runs out at the estimated rate.
pub fn estimated_stockout_days(quantity: i64, units_per_day: f64) -> i64 {
    if quantity <= 0 {
        return 0;
    }
    (quantity as f64 / units_per_day.max(f64::MIN_POSITIVE)).floor() as i64
}

/// Advisory assessment of one low-stock product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockAlert {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub reorder_level: i64,
    pub shortage: i64,
    pub urgency_score: f64,
    pub priority: Priority,
    pub daily_consumption: ConsumptionEstimate,
    pub estimated_stockout_days: i64,
    pub recommended_order_quantity: i64,
    pub recommended_order_cost: Money,
    pub confidence: Confidence,
}

/// Scores a product against its recent ledger history.
pub fn assess(product: &Product, recent: &[LedgerEntry], now: DateTime<Utc>) -> StockAlert {
    let urgency = urgency_score(product.quantity, product.reorder_level);
    let consumption = estimate_daily_consumption(recent, product.reorder_level, now);
    let order_quantity = recommended_order_quantity(product.quantity, product.reorder_level);

    StockAlert {
        product_id: product.id,
        sku: product.sku.clone(),
        name: product.name.clone(),
        category: product.category.clone(),
        quantity: product.quantity,
        reorder_level: product.reorder_level,
        shortage: shortage(product.quantity, product.reorder_level),
        urgency_score: urgency,
        priority: Priority::from_score(product.quantity, urgency),
        daily_consumption: consumption,
        estimated_stockout_days: estimated_stockout_days(
            product.quantity,
            consumption.units_per_day,
        ),
        recommended_order_quantity: order_quantity,
        recommended_order_cost: product.unit_price.multiply(order_quantity),
        confidence: Confidence::Low,
    }
}

/// Most urgent first; equal urgency puts the smaller quantity first.
pub fn sort_alerts(alerts: &mut [StockAlert]) {
    alerts.sort_by(|a, b| {
        b.urgency_score
            .total_cmp(&a.urgency_score)
            .then(a.quantity.cmp(&b.quantity))
    });
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use common::{OperationType, UserId};
    use ledger_store::Version;

    use super::*;

    fn product(quantity: i64, reorder_level: i64) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(),
            sku: "S-1".to_string(),
            name: "Sprocket".to_string(),
            category: "parts".to_string(),
            unit_price: Money::from_cents(300),
            quantity,
            reorder_level,
            location: None,
            supplier: None,
            version: Version::first(),
            created_at: now,
            updated_at: now,
        }
    }

    fn consumed(product_id: ProductId, units: i64, op: OperationType, age_days: i64) -> LedgerEntry {
        LedgerEntry::builder()
            .product_id(product_id)
            .user_id(UserId::new())
            .quantities(1000, 1000 - units)
            .operation_type(op)
            .created_at(Utc::now() - Duration::days(age_days))
            .build()
    }

    #[test]
    fn urgency_for_example_products() {
        assert_eq!(urgency_score(5, 10), 45.0);
        assert_eq!(urgency_score(0, 10), 100.0);
        assert_eq!(urgency_score(0, 0), 100.0);
        assert_eq!(urgency_score(10, 10), 0.0);
        assert_eq!(urgency_score(25, 10), 0.0);
        assert_eq!(urgency_score(3, 0), 0.0);
    }

    #[test]
    fn urgency_is_monotonic_in_quantity() {
        for reorder_level in [0, 1, 7, 10, 100] {
            let mut previous = f64::INFINITY;
            for quantity in 0..=(reorder_level * 2 + 2) {
                let score = urgency_score(quantity, reorder_level);
                assert!(score <= previous, "q={quantity} r={reorder_level}");
                assert!((0.0..=100.0).contains(&score));
                previous = score;
            }
        }
    }

    #[test]
    fn in_stock_urgency_never_exceeds_ninety() {
        assert!(urgency_score(1, 1_000_000) <= 90.0);
    }

    #[test]
    fn shortage_and_order_quantity() {
        assert_eq!(shortage(5, 10), 5);
        assert_eq!(shortage(15, 10), 0);
        assert_eq!(recommended_order_quantity(5, 10), 15);
        assert_eq!(recommended_order_quantity(25, 10), 0);
    }

    #[test]
    fn priority_thresholds() {
        assert_eq!(Priority::from_score(0, 100.0), Priority::Critical);
        assert_eq!(Priority::from_score(1, 81.0), Priority::Critical);
        assert_eq!(Priority::from_score(5, 45.0), Priority::Medium);
        assert_eq!(Priority::from_score(3, 63.0), Priority::High);
        assert_eq!(Priority::from_score(9, 9.0), Priority::Low);
    }

    #[test]
    fn consumption_from_history_ignores_non_consuming() {
        let p = ProductId::new();
        let recent = vec![
            consumed(p, 20, OperationType::Sale, 10),
            consumed(p, 10, OperationType::Damage, 2),
            consumed(p, 500, OperationType::Correction, 1),
            consumed(p, -40, OperationType::Purchase, 1),
        ];

        let estimate = estimate_daily_consumption(&recent, 10, Utc::now());
        assert_eq!(estimate.basis, ConsumptionBasis::History);
        assert!((estimate.units_per_day - 3.0).abs() < 1e-9);
    }

    #[test]
    fn consumption_today_counts_as_one_day() {
        let p = ProductId::new();
        let recent = vec![consumed(p, 6, OperationType::Sale, 0)];
        let estimate = estimate_daily_consumption(&recent, 10, Utc::now());
        assert_eq!(estimate.units_per_day, 6.0);
    }

    #[test]
    fn consumption_defaults_without_history() {
        let estimate = estimate_daily_consumption(&[], 50, Utc::now());
        assert_eq!(estimate.basis, ConsumptionBasis::Default);
        assert_eq!(estimate.units_per_day, 5.0);

        let estimate = estimate_daily_consumption(&[], 3, Utc::now());
        assert_eq!(estimate.units_per_day, 1.0);
    }

    #[test]
    fn stockout_days_floor() {
        assert_eq!(estimated_stockout_days(10, 3.0), 3);
        assert_eq!(estimated_stockout_days(0, 3.0), 0);
    }

    #[test]
    fn assess_example_product() {
        let p = product(5, 10);
        let alert = assess(&p, &[], Utc::now());

        assert_eq!(alert.shortage, 5);
        assert_eq!(alert.urgency_score, 45.0);
        assert_eq!(alert.priority, Priority::Medium);
        assert_eq!(alert.daily_consumption.units_per_day, 1.0);
        assert_eq!(alert.estimated_stockout_days, 5);
        assert_eq!(alert.recommended_order_quantity, 15);
        assert_eq!(alert.recommended_order_cost.cents(), 4500);
        assert_eq!(alert.confidence, Confidence::Low);
    }

    #[test]
    fn sort_by_urgency_then_quantity() {
        let now = Utc::now();
        let mut alerts = vec![
            assess(&product(5, 10), &[], now),
            assess(&product(0, 10), &[], now),
            assess(&product(10, 20), &[], now),
            assess(&product(8, 10), &[], now),
        ];
        sort_alerts(&mut alerts);

        let quantities: Vec<_> = alerts.iter().map(|a| a.quantity).collect();
        assert_eq!(quantities, vec![0, 5, 10, 8]);
    }
}
