//! Record-set analysis
//!
//! Everything here is a pure fold over normalized records. Results are
//! computed per call and never cached; empty input yields a zero-valued
//! result rather than an error.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::analytics::{
    CostEstimate, CostRates, DelayStats, DelayTrend, OrderedGroups, TemporalPattern, TimeSlot,
    WEEKDAY_NAMES,
};
use crate::config::AnalyticsConfig;
use crate::records::{classify, DelayCategory, DelayThresholds, FlightRecord, FlightStatus};

/// How cancelled flights enter the on-time denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledPolicy {
    /// Cancelled flights stay in the denominator and count as not on time
    CountAsLate,
    /// Cancelled flights are removed from the denominator
    Exclude,
}

/// Grouping dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Airline,
    Route,
    Terminal,
    Weekday,
    TimeSlot,
    DelayCategory,
    AircraftType,
    FlightNumber,
    Status,
}

impl GroupBy {
    /// Group key of `record`, or `None` when the record lacks the dimension
    pub fn key_of(&self, record: &FlightRecord, thresholds: &DelayThresholds) -> Option<String> {
        match self {
            GroupBy::Airline => record
                .airline
                .code()
                .or(record.airline.name.as_deref())
                .map(str::to_string),
            GroupBy::Route => record.route().map(|r| r.to_string()),
            GroupBy::Terminal => record.departure.terminal.clone(),
            GroupBy::Weekday => record.weekday_index().map(|i| WEEKDAY_NAMES[i].to_string()),
            GroupBy::TimeSlot => TimeSlot::of(record).map(|s| s.to_string()),
            GroupBy::DelayCategory => Some(classify(record, thresholds).to_string()),
            GroupBy::AircraftType => record.aircraft.type_code.clone(),
            GroupBy::FlightNumber => record.flight_code().map(str::to_string),
            GroupBy::Status => Some(record.status.to_string()),
        }
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "airline" => Ok(GroupBy::Airline),
            "route" => Ok(GroupBy::Route),
            "terminal" => Ok(GroupBy::Terminal),
            "weekday" | "day" => Ok(GroupBy::Weekday),
            "time_slot" | "slot" => Ok(GroupBy::TimeSlot),
            "delay_category" | "category" => Ok(GroupBy::DelayCategory),
            "aircraft_type" | "aircraft" => Ok(GroupBy::AircraftType),
            "flight_number" | "flight" => Ok(GroupBy::FlightNumber),
            "status" => Ok(GroupBy::Status),
            other => Err(format!("unknown grouping '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OnTimeSummary {
    pub threshold_minutes: i64,
    pub total: usize,
    pub cancelled: usize,
    /// Denominator after applying the cancelled policy
    pub eligible: usize,
    pub on_time: usize,
    /// 0.0 when `eligible` is zero
    pub percentage: f64,
}

/// A flight is on time when it is not cancelled and its delay (missing
/// counts as zero) is at most `threshold_minutes`.
pub fn on_time_performance<'a>(
    records: impl IntoIterator<Item = &'a FlightRecord>,
    threshold_minutes: i64,
    policy: CancelledPolicy,
) -> OnTimeSummary {
    let mut summary = OnTimeSummary {
        threshold_minutes,
        ..OnTimeSummary::default()
    };

    for record in records {
        summary.total += 1;
        if record.is_cancelled() {
            summary.cancelled += 1;
        } else if record.delay_minutes().unwrap_or(0) <= threshold_minutes {
            summary.on_time += 1;
        }
    }

    summary.eligible = match policy {
        CancelledPolicy::CountAsLate => summary.total,
        CancelledPolicy::Exclude => summary.total - summary.cancelled,
    };
    summary.percentage = if summary.eligible == 0 {
        0.0
    } else {
        summary.on_time as f64 * 100.0 / summary.eligible as f64
    };
    summary
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub count: usize,
    pub cancelled: usize,
    pub diverted: usize,
    pub on_time: OnTimeSummary,
    pub delay: DelayStats,
    pub cost: CostEstimate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub total: usize,
    pub status_counts: OrderedGroups<FlightStatus, usize>,
    pub on_time: OnTimeSummary,
    pub delay: DelayStats,
    /// Every category, in bucket order, zero counts included. Cancelled
    /// flights never departed and are not bucketed.
    pub categories: OrderedGroups<DelayCategory, usize>,
    pub group_by: Option<GroupBy>,
    /// Groups in first-seen order; small groups are kept here
    pub groups: OrderedGroups<String, GroupSummary>,
    pub cost: CostEstimate,
    pub temporal: TemporalPattern,
    pub trend: DelayTrend,
}

impl AnalysisResult {
    pub fn status_count(&self, status: FlightStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    fn eligible_groups(&self, min_size: usize) -> Vec<&GroupSummary> {
        self.groups
            .iter()
            .map(|(_, g)| g)
            .filter(|g| g.count >= min_size)
            .collect()
    }

    /// Largest groups with at least `min_size` records. Equal counts keep
    /// first-seen order.
    pub fn top_groups(&self, n: usize, min_size: usize) -> Vec<&GroupSummary> {
        let mut groups = self.eligible_groups(min_size);
        groups.sort_by(|a, b| b.count.cmp(&a.count));
        groups.truncate(n);
        groups
    }

    /// Groups with the highest mean delay among those with at least
    /// `min_size` records
    pub fn most_delayed_groups(&self, n: usize, min_size: usize) -> Vec<&GroupSummary> {
        let mut groups = self.eligible_groups(min_size);
        groups.sort_by(|a, b| b.delay.mean_minutes.total_cmp(&a.delay.mean_minutes));
        groups.truncate(n);
        groups
    }

    /// Groups with the best on-time percentage among those with at least
    /// `min_size` records
    pub fn best_on_time_groups(&self, n: usize, min_size: usize) -> Vec<&GroupSummary> {
        let mut groups = self.eligible_groups(min_size);
        groups.sort_by(|a, b| b.on_time.percentage.total_cmp(&a.on_time.percentage));
        groups.truncate(n);
        groups
    }
}

/// Computes [`AnalysisResult`]s with a fixed policy
#[derive(Debug, Clone)]
pub struct FlightAnalyzer {
    thresholds: DelayThresholds,
    cost_rates: CostRates,
    on_time_threshold_minutes: i64,
    cancelled_policy: CancelledPolicy,
    min_group_size: usize,
}

impl Default for FlightAnalyzer {
    fn default() -> Self {
        Self::new(&AnalyticsConfig::default())
    }
}

impl FlightAnalyzer {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            thresholds: config.delay_thresholds,
            cost_rates: config.cost_rates,
            on_time_threshold_minutes: config.on_time_threshold_minutes,
            cancelled_policy: config.cancelled_policy,
            min_group_size: config.min_group_size,
        }
    }

    pub fn thresholds(&self) -> &DelayThresholds {
        &self.thresholds
    }

    pub fn cost_rates(&self) -> &CostRates {
        &self.cost_rates
    }

    pub fn min_group_size(&self) -> usize {
        self.min_group_size
    }

    /// [`AnalysisResult::top_groups`] with the configured minimum group size
    pub fn top_groups<'r>(&self, result: &'r AnalysisResult, n: usize) -> Vec<&'r GroupSummary> {
        result.top_groups(n, self.min_group_size)
    }

    pub fn most_delayed_groups<'r>(&self, result: &'r AnalysisResult, n: usize) -> Vec<&'r GroupSummary> {
        result.most_delayed_groups(n, self.min_group_size)
    }

    pub fn best_on_time_groups<'r>(&self, result: &'r AnalysisResult, n: usize) -> Vec<&'r GroupSummary> {
        result.best_on_time_groups(n, self.min_group_size)
    }

    pub fn on_time(&self, records: &[FlightRecord], threshold_minutes: Option<i64>) -> OnTimeSummary {
        on_time_performance(
            records,
            threshold_minutes.unwrap_or(self.on_time_threshold_minutes),
            self.cancelled_policy,
        )
    }

    pub fn estimate_cost<'a>(&self, records: impl IntoIterator<Item = &'a FlightRecord>) -> CostEstimate {
        self.cost_rates.estimate_total(
            records
                .into_iter()
                .map(|r| r.delay_minutes().unwrap_or(0)),
        )
    }

    /// Stable grouping of `records` by `group_by`, first-seen key order
    pub fn group<'a>(
        &self,
        records: &'a [FlightRecord],
        group_by: GroupBy,
    ) -> OrderedGroups<String, Vec<&'a FlightRecord>> {
        OrderedGroups::group_by(records.iter(), |record| {
            group_by.key_of(record, &self.thresholds)
        })
    }

    fn summarize_group(&self, key: &str, members: &[&FlightRecord], threshold: i64) -> GroupSummary {
        GroupSummary {
            key: key.to_string(),
            count: members.len(),
            cancelled: members.iter().filter(|r| r.is_cancelled()).count(),
            diverted: members
                .iter()
                .filter(|r| r.status == FlightStatus::Diverted)
                .count(),
            on_time: on_time_performance(members.iter().copied(), threshold, self.cancelled_policy),
            delay: DelayStats::from_records(members.iter().copied()),
            cost: self.estimate_cost(members.iter().copied()),
        }
    }

    pub fn analyze(
        &self,
        records: &[FlightRecord],
        group_by: Option<GroupBy>,
        threshold_minutes: Option<i64>,
    ) -> AnalysisResult {
        let threshold = threshold_minutes.unwrap_or(self.on_time_threshold_minutes);

        let mut status_counts = OrderedGroups::new();
        let mut categories: OrderedGroups<DelayCategory, usize> =
            DelayCategory::ALL.iter().map(|c| (*c, 0)).collect();
        for record in records {
            *status_counts.entry_or_insert_with(record.status, || 0) += 1;
            if !record.is_cancelled() {
                *categories.entry_or_insert_with(classify(record, &self.thresholds), || 0) += 1;
            }
        }

        let groups = match group_by {
            Some(dimension) => self
                .group(records, dimension)
                .map_values(|key, members| self.summarize_group(key, &members, threshold)),
            None => OrderedGroups::new(),
        };

        AnalysisResult {
            total: records.len(),
            status_counts,
            on_time: on_time_performance(records, threshold, self.cancelled_policy),
            delay: DelayStats::from_records(records),
            categories,
            group_by,
            groups,
            cost: self.estimate_cost(records),
            temporal: TemporalPattern::from_records(records),
            trend: DelayTrend::from_records(records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordSource;

    fn flight(airline: &str, delay: Option<i64>, status: FlightStatus) -> FlightRecord {
        let mut record = FlightRecord::new(RecordSource::Historical);
        record.airline.iata = Some(airline.to_string());
        record.departure.delay_minutes = delay;
        record.status = status;
        record
    }

    #[test]
    fn test_on_time_percentage() {
        let mut records: Vec<_> = (0..7)
            .map(|i| flight("AA", Some(i * 2), FlightStatus::Landed))
            .collect();
        records.extend((0..3).map(|_| flight("AA", Some(45), FlightStatus::Landed)));

        let summary = on_time_performance(&records, 15, CancelledPolicy::CountAsLate);
        assert_eq!(summary.on_time, 7);
        assert_eq!(summary.percentage, 70.0);
    }

    #[test]
    fn test_on_time_zero_records() {
        let summary = on_time_performance(&[], 15, CancelledPolicy::Exclude);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.percentage, 0.0);
    }

    #[test]
    fn test_cancelled_policy() {
        let records = vec![
            flight("AA", Some(0), FlightStatus::Landed),
            flight("AA", None, FlightStatus::Cancelled),
        ];

        let late = on_time_performance(&records, 15, CancelledPolicy::CountAsLate);
        assert_eq!(late.percentage, 50.0);

        let excluded = on_time_performance(&records, 15, CancelledPolicy::Exclude);
        assert_eq!(excluded.eligible, 1);
        assert_eq!(excluded.percentage, 100.0);
    }

    #[test]
    fn test_group_by_parse() {
        assert_eq!("Airline".parse::<GroupBy>(), Ok(GroupBy::Airline));
        assert_eq!("time-slot".parse::<GroupBy>(), Ok(GroupBy::TimeSlot));
        assert!("country".parse::<GroupBy>().is_err());
    }

    #[test]
    fn test_top_groups_respect_min_size_but_totals_do_not() {
        let records = vec![
            flight("UA", Some(5), FlightStatus::Landed),
            flight("AA", Some(50), FlightStatus::Landed),
            flight("AA", Some(70), FlightStatus::Landed),
            flight("DL", Some(0), FlightStatus::Landed),
            flight("AA", Some(0), FlightStatus::Cancelled),
            flight("DL", Some(10), FlightStatus::Landed),
        ];
        let analyzer = FlightAnalyzer::default();
        let result = analyzer.analyze(&records, Some(GroupBy::Airline), None);

        let keys: Vec<_> = result.groups.keys().cloned().collect();
        assert_eq!(keys, vec!["UA", "AA", "DL"]);
        assert_eq!(result.total, 6);

        let top: Vec<_> = result.top_groups(5, 2).iter().map(|g| g.key.clone()).collect();
        assert_eq!(top, vec!["AA", "DL"]);

        let worst = result.most_delayed_groups(1, 1);
        assert_eq!(worst[0].key, "AA");
        assert_eq!(result.groups.get(&"AA".to_string()).unwrap().cancelled, 1);
    }

    #[test]
    fn test_categories_cover_every_bucket() {
        let records = vec![
            flight("AA", Some(0), FlightStatus::Landed),
            flight("AA", Some(200), FlightStatus::Landed),
        ];
        let result = FlightAnalyzer::default().analyze(&records, None, None);

        let categories = result.categories.into_vec();
        assert_eq!(categories.len(), 5);
        assert_eq!(categories[0], (DelayCategory::None, 1));
        assert_eq!(categories[4], (DelayCategory::Severe, 1));
        assert!(result.groups.is_empty());
    }

    #[test]
    fn test_configured_min_group_size_filters_rankings() {
        let records = vec![
            flight("UA", Some(300), FlightStatus::Landed),
            flight("AA", Some(20), FlightStatus::Landed),
            flight("AA", Some(40), FlightStatus::Landed),
            flight("DL", Some(0), FlightStatus::Landed),
            flight("DL", Some(5), FlightStatus::Landed),
            flight("DL", Some(90), FlightStatus::Landed),
        ];
        let analyzer = FlightAnalyzer::new(&AnalyticsConfig {
            min_group_size: 2,
            ..AnalyticsConfig::default()
        });
        let result = analyzer.analyze(&records, Some(GroupBy::Airline), None);

        // the lone UA flight stays in the result but never ranks
        assert_eq!(result.groups.len(), 3);
        let keys = |groups: Vec<&GroupSummary>| groups.iter().map(|g| g.key.clone()).collect::<Vec<_>>();
        assert_eq!(keys(analyzer.top_groups(&result, 5)), vec!["DL", "AA"]);
        assert_eq!(keys(analyzer.most_delayed_groups(&result, 1)), vec!["DL"]);
        assert_eq!(keys(analyzer.best_on_time_groups(&result, 1)), vec!["DL"]);

        let lenient = FlightAnalyzer::default();
        assert_eq!(keys(lenient.most_delayed_groups(&result, 1)), vec!["UA"]);
    }

    #[test]
    fn test_cancelled_flights_are_not_bucketed() {
        let records = vec![
            flight("AA", Some(0), FlightStatus::Landed),
            flight("AA", None, FlightStatus::Cancelled),
            flight("AA", Some(0), FlightStatus::Cancelled),
        ];
        let result = FlightAnalyzer::default().analyze(&records, None, None);

        let bucketed: usize = result.categories.iter().map(|(_, n)| *n).sum();
        assert_eq!(bucketed, 1);
        assert_eq!(result.categories.get(&DelayCategory::None), Some(&1));
        assert_eq!(result.status_count(FlightStatus::Cancelled), 2);
        assert_eq!(result.total, 3);
    }

    #[test]
    fn test_empty_analysis_is_zero_valued() {
        let result = FlightAnalyzer::default().analyze(&[], Some(GroupBy::Route), None);
        assert_eq!(result.total, 0);
        assert_eq!(result.on_time.percentage, 0.0);
        assert_eq!(result.cost.total_cost, 0.0);
        assert!(result.groups.is_empty());
        assert_eq!(result.status_count(FlightStatus::Cancelled), 0);
    }
}
