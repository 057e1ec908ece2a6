//! Diffs between two labeled record sets

use serde::Serialize;
use std::collections::BTreeSet;

use crate::analytics::{FlightAnalyzer, OrderedGroups};
use crate::records::{FlightRecord, FlightStatus, Route};

/// Record set with a caller-chosen label, such as a date or a time window
#[derive(Debug, Clone, Copy)]
pub struct LabeledDataset<'a> {
    pub label: &'a str,
    pub records: &'a [FlightRecord],
}

impl<'a> LabeledDataset<'a> {
    pub fn new(label: &'a str, records: &'a [FlightRecord]) -> Self {
        Self { label, records }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetMetrics {
    pub total: usize,
    pub cancelled: usize,
    pub diverted: usize,
    /// Not cancelled and later than the on-time threshold
    pub delayed: usize,
    pub on_time_percentage: f64,
    pub mean_delay_minutes: f64,
}

impl DatasetMetrics {
    fn measure(analyzer: &FlightAnalyzer, records: &[FlightRecord]) -> Self {
        let on_time = analyzer.on_time(records, None);
        let delay = crate::analytics::DelayStats::from_records(records);
        Self {
            total: records.len(),
            cancelled: on_time.cancelled,
            diverted: records
                .iter()
                .filter(|r| r.status == FlightStatus::Diverted)
                .count(),
            delayed: on_time.total - on_time.cancelled - on_time.on_time,
            on_time_percentage: on_time.percentage,
            mean_delay_minutes: delay.mean_minutes,
        }
    }
}

/// `b - a` for every metric
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricDeltas {
    pub total: i64,
    pub cancelled: i64,
    pub diverted: i64,
    pub delayed: i64,
    pub on_time_percentage: f64,
    pub mean_delay_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetComparison {
    pub label_a: String,
    pub label_b: String,
    pub metrics_a: DatasetMetrics,
    pub metrics_b: DatasetMetrics,
    pub deltas: MetricDeltas,
    pub routes_only_in_a: Vec<Route>,
    pub routes_only_in_b: Vec<Route>,
    pub common_routes: Vec<Route>,
}

fn route_set(records: &[FlightRecord]) -> BTreeSet<Route> {
    records.iter().filter_map(FlightRecord::route).collect()
}

/// Compare two datasets by aggregate metrics and by route set. Routes join
/// on origin/destination equality; route lists come back sorted.
pub fn compare_datasets(
    analyzer: &FlightAnalyzer,
    a: LabeledDataset<'_>,
    b: LabeledDataset<'_>,
) -> DatasetComparison {
    let metrics_a = DatasetMetrics::measure(analyzer, a.records);
    let metrics_b = DatasetMetrics::measure(analyzer, b.records);

    let deltas = MetricDeltas {
        total: metrics_b.total as i64 - metrics_a.total as i64,
        cancelled: metrics_b.cancelled as i64 - metrics_a.cancelled as i64,
        diverted: metrics_b.diverted as i64 - metrics_a.diverted as i64,
        delayed: metrics_b.delayed as i64 - metrics_a.delayed as i64,
        on_time_percentage: metrics_b.on_time_percentage - metrics_a.on_time_percentage,
        mean_delay_minutes: metrics_b.mean_delay_minutes - metrics_a.mean_delay_minutes,
    };

    let routes_a = route_set(a.records);
    let routes_b = route_set(b.records);

    DatasetComparison {
        label_a: a.label.to_string(),
        label_b: b.label.to_string(),
        metrics_a,
        metrics_b,
        deltas,
        routes_only_in_a: routes_a.difference(&routes_b).cloned().collect(),
        routes_only_in_b: routes_b.difference(&routes_a).cloned().collect(),
        common_routes: routes_a.intersection(&routes_b).cloned().collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Both,
    OnlyA,
    OnlyB,
}

/// What one side knows about a flight number
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSnapshot {
    pub status: FlightStatus,
    pub delay_minutes: Option<i64>,
    pub route: Option<Route>,
}

impl From<&FlightRecord> for FlightSnapshot {
    fn from(record: &FlightRecord) -> Self {
        Self {
            status: record.status,
            delay_minutes: record.delay_minutes(),
            route: record.route(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightNumberDiff {
    pub flight: String,
    pub presence: Presence,
    pub a: Option<FlightSnapshot>,
    pub b: Option<FlightSnapshot>,
    pub status_changed: bool,
    /// `b - a` when both sides report a delay
    pub delay_change: Option<i64>,
}

/// Per flight number diff of two datasets.
///
/// Flight numbers are listed in first-seen order across `a` then `b`. When a
/// side has several records for one flight number the first one is used.
pub fn compare_flight_numbers(
    a: &[FlightRecord],
    b: &[FlightRecord],
) -> Vec<FlightNumberDiff> {
    let mut sides: OrderedGroups<String, (Option<&FlightRecord>, Option<&FlightRecord>)> =
        OrderedGroups::new();

    for record in a {
        if let Some(code) = record.flight_code() {
            let side = sides.entry_or_insert_with(code.to_string(), || (None, None));
            side.0.get_or_insert(record);
        }
    }
    for record in b {
        if let Some(code) = record.flight_code() {
            let side = sides.entry_or_insert_with(code.to_string(), || (None, None));
            side.1.get_or_insert(record);
        }
    }

    sides
        .into_vec()
        .into_iter()
        .map(|(flight, (in_a, in_b))| {
            let a = in_a.map(FlightSnapshot::from);
            let b = in_b.map(FlightSnapshot::from);
            let presence = match (&a, &b) {
                (Some(_), Some(_)) => Presence::Both,
                (Some(_), None) => Presence::OnlyA,
                _ => Presence::OnlyB,
            };
            let (status_changed, delay_change) = match (&a, &b) {
                (Some(a), Some(b)) => (
                    a.status != b.status,
                    a.delay_minutes.zip(b.delay_minutes).map(|(x, y)| y - x),
                ),
                _ => (false, None),
            };
            FlightNumberDiff {
                flight,
                presence,
                a,
                b,
                status_changed,
                delay_change,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordSource;

    fn flight(code: &str, from: &str, to: &str, delay: i64, status: FlightStatus) -> FlightRecord {
        let mut record = FlightRecord::new(RecordSource::Historical);
        record.flight_iata = Some(code.to_string());
        record.departure.airport.iata = Some(from.to_string());
        record.arrival.airport.iata = Some(to.to_string());
        record.departure.delay_minutes = Some(delay);
        record.status = status;
        record
    }

    #[test]
    fn test_compare_datasets_routes_and_deltas() {
        let monday = vec![
            flight("AA1", "JFK", "LAX", 0, FlightStatus::Landed),
            flight("AA2", "JFK", "SFO", 40, FlightStatus::Landed),
            flight("AA3", "JFK", "MIA", 0, FlightStatus::Cancelled),
        ];
        let tuesday = vec![
            flight("AA1", "JFK", "LAX", 5, FlightStatus::Landed),
            flight("AA4", "JFK", "ORD", 0, FlightStatus::Landed),
        ];

        let analyzer = FlightAnalyzer::default();
        let diff = compare_datasets(
            &analyzer,
            LabeledDataset::new("2024-03-04", &monday),
            LabeledDataset::new("2024-03-05", &tuesday),
        );

        assert_eq!(diff.deltas.total, -1);
        assert_eq!(diff.deltas.cancelled, -1);
        assert_eq!(diff.metrics_a.delayed, 1);
        assert_eq!(diff.deltas.delayed, -1);
        assert_eq!(diff.metrics_b.on_time_percentage, 100.0);

        let names = |routes: &[Route]| routes.iter().map(|r| r.to_string()).collect::<Vec<_>>();
        assert_eq!(names(&diff.common_routes), vec!["JFK-LAX"]);
        assert_eq!(names(&diff.routes_only_in_a), vec!["JFK-MIA", "JFK-SFO"]);
        assert_eq!(names(&diff.routes_only_in_b), vec!["JFK-ORD"]);
    }

    #[test]
    fn test_compare_empty_datasets() {
        let diff = compare_datasets(
            &FlightAnalyzer::default(),
            LabeledDataset::new("a", &[]),
            LabeledDataset::new("b", &[]),
        );
        assert_eq!(diff.deltas, MetricDeltas::default());
        assert!(diff.common_routes.is_empty());
    }

    #[test]
    fn test_compare_flight_numbers() {
        let a = vec![
            flight("AA1", "JFK", "LAX", 10, FlightStatus::Landed),
            flight("AA2", "JFK", "SFO", 0, FlightStatus::Scheduled),
        ];
        let b = vec![
            flight("AA2", "JFK", "SFO", 0, FlightStatus::Cancelled),
            flight("AA9", "JFK", "BOS", 0, FlightStatus::Landed),
            flight("AA1", "JFK", "LAX", 25, FlightStatus::Landed),
        ];

        let diffs = compare_flight_numbers(&a, &b);
        let order: Vec<_> = diffs.iter().map(|d| d.flight.as_str()).collect();
        assert_eq!(order, vec!["AA1", "AA2", "AA9"]);

        assert_eq!(diffs[0].presence, Presence::Both);
        assert_eq!(diffs[0].delay_change, Some(15));
        assert!(!diffs[0].status_changed);
        assert!(diffs[1].status_changed);
        assert_eq!(diffs[2].presence, Presence::OnlyB);
        assert!(diffs[2].a.is_none());
    }
}
