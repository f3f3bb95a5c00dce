//! Windowed trend comparison over a daily series.

use chrono::NaiveDate;
use serde::Serialize;

/// Days in each comparison window.
pub const TREND_WINDOW_DAYS: usize = 7;

/// Relative change, in percent, beyond which a series counts as moving.
pub const TREND_THRESHOLD_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Comparison of the most recent window against the one before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub direction: TrendDirection,

    /// Days per window actually used. Zero when there was too little data.
    pub window_days: usize,

    pub recent_mean: Option<f64>,
    pub previous_mean: Option<f64>,

    /// Relative change in percent. `None` when there is no baseline.
    pub change_percent: Option<f64>,
}

impl Trend {
    fn insufficient() -> Self {
        Self {
            direction: TrendDirection::Stable,
            window_days: 0,
            recent_mean: None,
            previous_mean: None,
            change_percent: None,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Compares the mean of the last window of `series` with the window before it.
///
/// `series` must be ordered by day and dense (one value per day). With fewer
/// than 14 days the window shrinks to half the series; with fewer than two
/// days the trend is stable with no comparison.
pub fn compute_trend(series: &[(NaiveDate, f64)]) -> Trend {
    let window = TREND_WINDOW_DAYS.min(series.len() / 2);
    if window == 0 {
        return Trend::insufficient();
    }

    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let recent = &values[values.len() - window..];
    let previous = &values[values.len() - 2 * window..values.len() - window];
    let recent_mean = mean(recent);
    let previous_mean = mean(previous);

    let (direction, change_percent) = if previous_mean == 0.0 {
        if recent_mean > 0.0 {
            (TrendDirection::Increasing, None)
        } else {
            (TrendDirection::Stable, None)
        }
    } else {
        let change = (recent_mean - previous_mean) / previous_mean * 100.0;
        let direction = if change > TREND_THRESHOLD_PERCENT {
            TrendDirection::Increasing
        } else if change < -TREND_THRESHOLD_PERCENT {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };
        (direction, Some(change))
    };

    Trend {
        direction,
        window_days: window,
        recent_mean: Some(recent_mean),
        previous_mean: Some(previous_mean),
        change_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        start
            .iter_days()
            .zip(values.iter().copied())
            .collect()
    }

    #[test]
    fn increasing_when_recent_week_is_higher() {
        let mut values = vec![10.0; 7];
        values.extend([12.0; 7]);
        let trend = compute_trend(&series(&values));
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert_eq!(trend.window_days, 7);
        assert!((trend.change_percent.unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn decreasing_when_recent_week_is_lower() {
        let mut values = vec![10.0; 7];
        values.extend([9.0; 7]);
        assert_eq!(
            compute_trend(&series(&values)).direction,
            TrendDirection::Decreasing
        );
    }

    #[test]
    fn small_changes_are_stable() {
        let mut values = vec![100.0; 7];
        values.extend([104.0; 7]);
        let trend = compute_trend(&series(&values));
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert!(trend.change_percent.is_some());
    }

    #[test]
    fn only_the_last_two_weeks_count() {
        let mut values = vec![1000.0; 10];
        values.extend([10.0; 7]);
        values.extend([10.0; 7]);
        assert_eq!(
            compute_trend(&series(&values)).direction,
            TrendDirection::Stable
        );
    }

    #[test]
    fn sparse_data_is_stable_without_comparison() {
        for values in [vec![], vec![5.0]] {
            let trend = compute_trend(&series(&values));
            assert_eq!(trend.direction, TrendDirection::Stable);
            assert!(trend.change_percent.is_none());
            assert!(trend.recent_mean.is_none());
        }
    }

    #[test]
    fn short_series_uses_half_windows() {
        let trend = compute_trend(&series(&[2.0, 2.0, 2.0, 4.0, 4.0]));
        assert_eq!(trend.window_days, 2);
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert_eq!(trend.previous_mean, Some(2.0));
        assert_eq!(trend.recent_mean, Some(4.0));
    }

    #[test]
    fn growth_from_zero_has_no_percentage() {
        let trend = compute_trend(&series(&[0.0, 0.0, 3.0, 3.0]));
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!(trend.change_percent.is_none());
    }
}
