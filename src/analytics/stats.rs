use serde::Serialize;
use statrs::statistics::{Data, Median, OrderStatistics, Statistics};

use crate::records::FlightRecord;

/// Summary of the delays of the records that report one
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DelayStats {
    /// Records with a known delay
    pub count: usize,
    /// Records with a strictly positive delay
    pub delayed: usize,
    pub total_minutes: i64,
    pub mean_minutes: f64,
    pub median_minutes: f64,
    pub p90_minutes: f64,
    pub max_minutes: i64,
}

impl DelayStats {
    pub fn from_minutes(minutes: &[i64]) -> Self {
        if minutes.is_empty() {
            return Self::default();
        }

        let values: Vec<f64> = minutes.iter().map(|&m| m as f64).collect();
        let mut data = Data::new(values.clone());

        Self {
            count: minutes.len(),
            delayed: minutes.iter().filter(|&&m| m > 0).count(),
            total_minutes: minutes.iter().sum(),
            mean_minutes: values.iter().mean(),
            median_minutes: data.median(),
            p90_minutes: data.percentile(90),
            max_minutes: minutes.iter().fold(i64::MIN, |acc, &m| acc.max(m)),
        }
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a FlightRecord>) -> Self {
        let minutes: Vec<i64> = records
            .into_iter()
            .filter_map(FlightRecord::delay_minutes)
            .collect();
        Self::from_minutes(&minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Worsening,
    Stable,
    NotApplicable,
}

/// Mean delay of the earlier half of a record set against the later half,
/// ordered by scheduled departure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayTrend {
    pub direction: TrendDirection,
    pub earlier_mean_minutes: f64,
    pub later_mean_minutes: f64,
    pub change_minutes: f64,
}

/// Mean changes within this many minutes count as stable
pub const TREND_TOLERANCE_MINUTES: f64 = 1.0;

impl DelayTrend {
    fn not_applicable() -> Self {
        Self {
            direction: TrendDirection::NotApplicable,
            earlier_mean_minutes: 0.0,
            later_mean_minutes: 0.0,
            change_minutes: 0.0,
        }
    }

    pub fn from_records(records: &[FlightRecord]) -> Self {
        let mut timed: Vec<_> = records
            .iter()
            .filter_map(|r| Some((r.scheduled_departure()?, r.delay_minutes().unwrap_or(0))))
            .collect();
        if timed.len() < 2 {
            return Self::not_applicable();
        }
        timed.sort_by_key(|(at, _)| *at);

        let (earlier, later) = timed.split_at(timed.len() / 2);
        let mean = |half: &[(chrono::NaiveDateTime, i64)]| {
            half.iter().map(|(_, d)| *d as f64).sum::<f64>() / half.len() as f64
        };
        let earlier_mean_minutes = mean(earlier);
        let later_mean_minutes = mean(later);
        let change_minutes = later_mean_minutes - earlier_mean_minutes;

        let direction = if change_minutes > TREND_TOLERANCE_MINUTES {
            TrendDirection::Worsening
        } else if change_minutes < -TREND_TOLERANCE_MINUTES {
            TrendDirection::Improving
        } else {
            TrendDirection::Stable
        };

        Self {
            direction,
            earlier_mean_minutes,
            later_mean_minutes,
            change_minutes,
        }
    }
}
