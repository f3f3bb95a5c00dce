//! Grouped summaries over ledger entries.
//!
//! [`Aggregator`] is an incremental fold: entries are pushed one at a time,
//! so a report never needs the whole ledger in memory, only one accumulator
//! per group.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use common::{OperationType, ProductId, UserId};
use futures_util::TryStreamExt;
use ledger_store::{EntryStream, LedgerEntry};
use serde::Serialize;

use crate::Result;

/// Entries folded between cooperative yields.
const YIELD_EVERY: u64 = 1024;

/// Metrics shared by every grouping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupSummary {
    pub entries: u64,

    /// Sum of positive deltas.
    pub total_increase: u64,

    /// Sum of absolute negative deltas.
    pub total_decrease: u64,

    pub net_change: i64,
    pub distinct_products: usize,
    pub distinct_users: usize,
    pub first_activity: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
struct Accumulator {
    entries: u64,
    total_increase: u64,
    total_decrease: u64,
    net_change: i64,
    products: HashSet<ProductId>,
    users: HashSet<UserId>,
    first_activity: Option<DateTime<Utc>>,
    last_activity: Option<DateTime<Utc>>,
}

impl Accumulator {
    fn push(&mut self, entry: &LedgerEntry) {
        self.entries += 1;
        self.total_increase += entry.increase();
        self.total_decrease += entry.decrease();
        self.net_change += entry.delta();
        self.products.insert(entry.product_id);
        self.users.insert(entry.user_id);
        self.first_activity = Some(match self.first_activity {
            Some(t) => t.min(entry.created_at),
            None => entry.created_at,
        });
        self.last_activity = Some(match self.last_activity {
            Some(t) => t.max(entry.created_at),
            None => entry.created_at,
        });
    }

    fn summary(&self) -> GroupSummary {
        GroupSummary {
            entries: self.entries,
            total_increase: self.total_increase,
            total_decrease: self.total_decrease,
            net_change: self.net_change,
            distinct_products: self.products.len(),
            distinct_users: self.users.len(),
            first_activity: self.first_activity,
            last_activity: self.last_activity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSummary {
    pub operation_type: OperationType,
    #[serde(flatten)]
    pub summary: GroupSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductActivity {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub summary: GroupSummary,

    /// Operation types seen for this product, in declaration order.
    pub operation_types: Vec<OperationType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserActivity {
    pub user_id: UserId,
    #[serde(flatten)]
    pub summary: GroupSummary,

    /// Distinct UTC days with at least one entry.
    pub active_days: usize,

    /// Entries per active day.
    pub productivity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub summary: GroupSummary,
}

struct ProductAccumulator {
    product_id: ProductId,
    totals: Accumulator,
    operation_types: HashSet<OperationType>,
}

struct UserAccumulator {
    user_id: UserId,
    totals: Accumulator,
    days: HashSet<NaiveDate>,
}

/// Incremental fold of ledger entries into every grouping at once.
///
/// Product and user groups remember first-seen order, which is the final
/// tie-breaker when ranking.
#[derive(Default)]
pub struct Aggregator {
    overall: Accumulator,
    by_operation: BTreeMap<OperationType, Accumulator>,
    product_index: HashMap<ProductId, usize>,
    products: Vec<ProductAccumulator>,
    user_index: HashMap<UserId, usize>,
    users: Vec<UserAccumulator>,
    by_day: BTreeMap<NaiveDate, Accumulator>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one entry to every grouping.
    pub fn push(&mut self, entry: &LedgerEntry) {
        self.overall.push(entry);
        self.by_operation
            .entry(entry.operation_type)
            .or_default()
            .push(entry);

        let idx = *self
            .product_index
            .entry(entry.product_id)
            .or_insert_with(|| {
                self.products.push(ProductAccumulator {
                    product_id: entry.product_id,
                    totals: Accumulator::default(),
                    operation_types: HashSet::new(),
                });
                self.products.len() - 1
            });
        let product = &mut self.products[idx];
        product.totals.push(entry);
        product.operation_types.insert(entry.operation_type);

        let day = entry.created_at.date_naive();
        let idx = *self.user_index.entry(entry.user_id).or_insert_with(|| {
            self.users.push(UserAccumulator {
                user_id: entry.user_id,
                totals: Accumulator::default(),
                days: HashSet::new(),
            });
            self.users.len() - 1
        });
        let user = &mut self.users[idx];
        user.totals.push(entry);
        user.days.insert(day);

        self.by_day.entry(day).or_default().push(entry);
    }

    /// Drains a ledger stream into a new aggregation.
    ///
    /// Yields to the runtime periodically, so a stream that is always ready
    /// still lets a surrounding timeout fire.
    pub async fn fold(mut stream: EntryStream) -> Result<Aggregation> {
        let mut aggregator = Self::new();
        let mut seen: u64 = 0;
        while let Some(entry) = stream.try_next().await? {
            aggregator.push(&entry);
            seen += 1;
            if seen % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        }
        Ok(aggregator.finish())
    }

    pub fn finish(self) -> Aggregation {
        let by_operation = self
            .by_operation
            .into_iter()
            .map(|(operation_type, acc)| OperationSummary {
                operation_type,
                summary: acc.summary(),
            })
            .collect();

        let by_product = self
            .products
            .into_iter()
            .map(|p| {
                let mut operation_types: Vec<_> = p.operation_types.into_iter().collect();
                operation_types.sort();
                ProductActivity {
                    product_id: p.product_id,
                    summary: p.totals.summary(),
                    operation_types,
                }
            })
            .collect();

        let by_user = self
            .users
            .into_iter()
            .map(|u| {
                let active_days = u.days.len();
                UserActivity {
                    user_id: u.user_id,
                    productivity: u.totals.entries as f64 / active_days.max(1) as f64,
                    summary: u.totals.summary(),
                    active_days,
                }
            })
            .collect();

        let by_day = self
            .by_day
            .into_iter()
            .map(|(date, acc)| DailySummary {
                date,
                summary: acc.summary(),
            })
            .collect();

        Aggregation {
            overall: self.overall.summary(),
            by_operation,
            by_product,
            by_user,
            by_day,
        }
    }
}

/// Every grouping of one set of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregation {
    pub overall: GroupSummary,

    /// One row per operation type present, in declaration order.
    pub by_operation: Vec<OperationSummary>,

    /// One row per product, in first-seen order.
    pub by_product: Vec<ProductActivity>,

    /// One row per user, in first-seen order.
    pub by_user: Vec<UserActivity>,

    /// One row per UTC day with activity, ascending.
    pub by_day: Vec<DailySummary>,
}

/// Descending by `key`, then earliest `last_activity`, then existing order.
fn rank_by<T, K: Ord>(
    rows: &mut [T],
    key: impl Fn(&T) -> K,
    summary: impl Fn(&T) -> &GroupSummary,
) {
    rows.sort_by(|a, b| {
        key(b)
            .cmp(&key(a))
            .then_with(|| summary(a).last_activity.cmp(&summary(b).last_activity))
    });
}

impl Aggregation {
    /// Products ranked by entry count.
    pub fn most_active_products(&self, limit: usize) -> Vec<ProductActivity> {
        self.top_products_by(limit, |p| p.summary.entries)
    }

    /// Products ranked by an arbitrary count metric.
    pub fn top_products_by<K: Ord>(
        &self,
        limit: usize,
        key: impl Fn(&ProductActivity) -> K,
    ) -> Vec<ProductActivity> {
        let mut rows = self.by_product.clone();
        rank_by(&mut rows, key, |p| &p.summary);
        rows.truncate(limit);
        rows
    }

    /// Users ranked by entry count.
    pub fn most_active_users(&self, limit: usize) -> Vec<UserActivity> {
        let mut rows = self.by_user.clone();
        rank_by(&mut rows, |u| u.summary.entries, |u| &u.summary);
        rows.truncate(limit);
        rows
    }

    /// The day with the most entries. Ties go to the earliest day.
    pub fn peak_day(&self) -> Option<&DailySummary> {
        self.by_day.iter().fold(None, |best, day| match best {
            Some(b) if b.summary.entries >= day.summary.entries => Some(b),
            _ => Some(day),
        })
    }

    /// Row for one operation type, if present.
    pub fn operation(&self, operation_type: OperationType) -> Option<&OperationSummary> {
        self.by_operation
            .iter()
            .find(|o| o.operation_type == operation_type)
    }

    /// Daily values of `metric` for every day in `[from, to]`, zero-filled.
    pub fn daily_series(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        metric: impl Fn(&GroupSummary) -> f64,
    ) -> Vec<(NaiveDate, f64)> {
        let by_date: HashMap<NaiveDate, f64> = self
            .by_day
            .iter()
            .map(|d| (d.date, metric(&d.summary)))
            .collect();

        from.iter_days()
            .take_while(|d| *d <= to)
            .map(|d| (d, by_date.get(&d).copied().unwrap_or(0.0)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn entry(
        product: ProductId,
        user: UserId,
        old: i64,
        new: i64,
        op: OperationType,
        created_at: DateTime<Utc>,
    ) -> LedgerEntry {
        LedgerEntry::builder()
            .product_id(product)
            .user_id(user)
            .quantities(old, new)
            .operation_type(op)
            .created_at(created_at)
            .build()
    }

    #[test]
    fn groups_by_operation_with_distinct_counts() {
        let (p1, p2) = (ProductId::new(), ProductId::new());
        let (u1, u2) = (UserId::new(), UserId::new());

        let mut agg = Aggregator::new();
        agg.push(&entry(p1, u1, 20, 5, OperationType::Sale, at(1, 9)));
        agg.push(&entry(p2, u2, 10, 8, OperationType::Sale, at(1, 10)));
        agg.push(&entry(p1, u1, 5, 30, OperationType::Purchase, at(2, 9)));
        let result = agg.finish();

        let sale = result.operation(OperationType::Sale).unwrap();
        assert_eq!(sale.summary.entries, 2);
        assert_eq!(sale.summary.total_decrease, 17);
        assert_eq!(sale.summary.total_increase, 0);
        assert_eq!(sale.summary.net_change, -17);
        assert_eq!(sale.summary.distinct_products, 2);
        assert_eq!(sale.summary.distinct_users, 2);

        let purchase = result.operation(OperationType::Purchase).unwrap();
        assert_eq!(purchase.summary.total_increase, 25);
        assert!(result.operation(OperationType::Damage).is_none());
    }

    #[test]
    fn increase_minus_decrease_equals_sum_of_deltas() {
        let products: Vec<_> = (0..3).map(|_| ProductId::new()).collect();
        let user = UserId::new();
        let mut agg = Aggregator::new();
        let mut delta_sum = 0;

        let mut qty = [50i64, 50, 50];
        for i in 0..60usize {
            let idx = i % 3;
            let op = OperationType::ALL[i % OperationType::ALL.len()];
            let change = ((i as i64 * 7) % 11) - 5;
            let new = (qty[idx] + change).max(0);
            let e = entry(
                products[idx],
                user,
                qty[idx],
                new,
                op,
                at(1, 0) + Duration::hours(i as i64),
            );
            delta_sum += e.delta();
            qty[idx] = new;
            agg.push(&e);
        }
        let result = agg.finish();

        let inc: u64 = result.by_operation.iter().map(|o| o.summary.total_increase).sum();
        let dec: u64 = result.by_operation.iter().map(|o| o.summary.total_decrease).sum();
        assert_eq!(inc as i64 - dec as i64, delta_sum);
        assert_eq!(result.overall.net_change, delta_sum);
    }

    #[test]
    fn product_groups_collect_operation_types() {
        let p = ProductId::new();
        let u = UserId::new();
        let mut agg = Aggregator::new();
        agg.push(&entry(p, u, 10, 9, OperationType::Damage, at(1, 1)));
        agg.push(&entry(p, u, 9, 8, OperationType::Sale, at(1, 2)));
        agg.push(&entry(p, u, 8, 7, OperationType::Sale, at(1, 3)));

        let result = agg.finish();
        assert_eq!(result.by_product.len(), 1);
        assert_eq!(
            result.by_product[0].operation_types,
            vec![OperationType::Sale, OperationType::Damage]
        );
        assert_eq!(result.by_product[0].summary.entries, 3);
    }

    #[test]
    fn user_productivity_is_entries_per_active_day() {
        let p = ProductId::new();
        let u = UserId::new();
        let mut agg = Aggregator::new();
        for hour in [1, 2, 3] {
            agg.push(&entry(p, u, 10, 9, OperationType::Sale, at(1, hour)));
        }
        agg.push(&entry(p, u, 9, 8, OperationType::Sale, at(4, 1)));

        let result = agg.finish();
        let user = &result.by_user[0];
        assert_eq!(user.active_days, 2);
        assert_eq!(user.productivity, 2.0);
        assert_eq!(user.summary.distinct_products, 1);
    }

    #[test]
    fn ranking_breaks_ties_by_earliest_last_activity() {
        let (a, b, c) = (ProductId::new(), ProductId::new(), ProductId::new());
        let u = UserId::new();
        let mut agg = Aggregator::new();
        // b and c tie on two entries; c finished earlier.
        agg.push(&entry(b, u, 5, 4, OperationType::Sale, at(1, 1)));
        agg.push(&entry(c, u, 5, 4, OperationType::Sale, at(1, 2)));
        agg.push(&entry(c, u, 4, 3, OperationType::Sale, at(1, 3)));
        agg.push(&entry(b, u, 4, 3, OperationType::Sale, at(1, 4)));
        agg.push(&entry(a, u, 5, 4, OperationType::Sale, at(1, 5)));

        let ranked = agg.finish().most_active_products(10);
        let order: Vec<_> = ranked.iter().map(|p| p.product_id).collect();
        assert_eq!(order, vec![c, b, a]);
    }

    #[test]
    fn peak_day_prefers_earliest_on_tie() {
        let p = ProductId::new();
        let u = UserId::new();
        let mut agg = Aggregator::new();
        agg.push(&entry(p, u, 5, 4, OperationType::Sale, at(2, 1)));
        agg.push(&entry(p, u, 4, 3, OperationType::Sale, at(2, 2)));
        agg.push(&entry(p, u, 3, 2, OperationType::Sale, at(5, 1)));
        agg.push(&entry(p, u, 2, 1, OperationType::Sale, at(5, 2)));

        let result = agg.finish();
        let peak = result.peak_day().unwrap();
        assert_eq!(peak.date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert!(Aggregation::default().peak_day().is_none());
    }

    fn ready_stream(n: u64) -> EntryStream {
        let (p, u) = (ProductId::new(), UserId::new());
        let entries: Vec<ledger_store::Result<LedgerEntry>> = (0..n)
            .map(|i| {
                let created_at = at(1, 0) + Duration::seconds(i as i64);
                Ok(entry(p, u, 1, 0, OperationType::Sale, created_at))
            })
            .collect();
        Box::pin(futures_util::stream::iter(entries))
    }

    #[tokio::test]
    async fn fold_yields_on_long_ready_streams() {
        use futures_util::FutureExt;

        let short = Aggregator::fold(ready_stream(YIELD_EVERY - 1)).now_or_never();
        assert_eq!(short.unwrap().unwrap().overall.entries, YIELD_EVERY - 1);

        assert!(
            Aggregator::fold(ready_stream(YIELD_EVERY * 2))
                .now_or_never()
                .is_none()
        );

        let full = Aggregator::fold(ready_stream(YIELD_EVERY * 2)).await.unwrap();
        assert_eq!(full.overall.entries, YIELD_EVERY * 2);
    }

    #[test]
    fn daily_series_zero_fills_gaps() {
        let p = ProductId::new();
        let u = UserId::new();
        let mut agg = Aggregator::new();
        agg.push(&entry(p, u, 5, 4, OperationType::Sale, at(2, 1)));
        agg.push(&entry(p, u, 4, 1, OperationType::Sale, at(4, 1)));

        let result = agg.finish();
        let series = result.daily_series(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            |s| s.total_decrease as f64,
        );
        let values: Vec<_> = series.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0.0, 1.0, 0.0, 3.0, 0.0]);
    }
}
