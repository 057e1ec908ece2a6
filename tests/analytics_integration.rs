//! Integration tests for analytics over normalized upstream rows
//!
//! Rows go through the same decode/normalize path the client uses, so these
//! cover the adapters and the aggregator together.

use flightlens::analytics::{CostRates, FlightAnalyzer, GroupBy, TimeSlot, TrendDirection};
use flightlens::records::{
    classify, normalize_batch, DelayCategory, DelayThresholds, FlightStatus, RecordSource,
};
use serde_json::{json, Value};
use chrono::NaiveDate;

fn flights_row(code: &str, airline: &str, from: &str, to: &str, delay: i64, status: &str) -> Value {
    json!({
        "flight_date": "2024-03-04",
        "flight_status": status,
        "airline": { "name": airline, "iata": airline },
        "flight": { "number": &code[2..], "iata": code },
        "departure": {
            "iata": from,
            "terminal": "4",
            "delay": delay,
            "scheduled": "2024-03-04T08:00:00+00:00"
        },
        "arrival": { "iata": to },
        "aircraft": { "iata": "A321" }
    })
}

fn timetable_row(code: &str, from: &str, to: &str, scheduled: &str, actual: Option<&str>, delay: &str) -> Value {
    json!({
        "type": "departure",
        "status": "active",
        "airline": { "name": "American Airlines", "iataCode": "AA" },
        "flight": { "number": &code[2..], "iataNumber": code },
        "departure": {
            "iataCode": from,
            "delay": delay,
            "scheduledTime": scheduled,
            "actualTime": actual
        },
        "arrival": { "iataCode": to }
    })
}

#[test]
fn test_on_time_percentage_over_decoded_rows() {
    let mut rows: Vec<Value> = (0..7)
        .map(|i| flights_row(&format!("AA{i}"), "AA", "JFK", "LAX", i * 2, "landed"))
        .collect();
    rows.extend((7..10).map(|i| flights_row(&format!("AA{i}"), "AA", "JFK", "LAX", 45, "landed")));

    let records = normalize_batch(RecordSource::Historical, rows, None);
    let result = FlightAnalyzer::default().analyze(&records, None, None);

    assert_eq!(result.total, 10);
    assert_eq!(result.on_time.on_time, 7);
    assert_eq!(result.on_time.percentage, 70.0);
    assert_eq!(result.status_count(FlightStatus::Landed), 10);
}

#[test]
fn test_grouping_is_stable_and_idempotent() {
    let rows = vec![
        flights_row("UA1", "UA", "EWR", "SFO", 0, "landed"),
        flights_row("AA1", "AA", "JFK", "LAX", 20, "landed"),
        flights_row("DL1", "DL", "ATL", "JFK", 5, "en-route"),
        flights_row("AA2", "AA", "JFK", "MIA", 90, "landed"),
        flights_row("UA2", "UA", "EWR", "ORD", 0, "canceled"),
    ];
    let records = normalize_batch(RecordSource::Historical, rows, None);
    let analyzer = FlightAnalyzer::default();

    let first = analyzer.analyze(&records, Some(GroupBy::Airline), None);
    let second = analyzer.analyze(&records, Some(GroupBy::Airline), None);
    assert_eq!(first, second);

    let keys: Vec<_> = first.groups.keys().cloned().collect();
    assert_eq!(keys, vec!["UA", "AA", "DL"]);

    let counted: usize = first.groups.iter().map(|(_, g)| g.count).sum();
    assert_eq!(counted, first.total);

    assert_eq!(first.status_count(FlightStatus::Active), 1);
    assert_eq!(first.status_count(FlightStatus::Cancelled), 1);
}

#[test]
fn test_mixed_shapes_share_route_keys() {
    let mut records = normalize_batch(
        RecordSource::Historical,
        vec![flights_row("AA1", "AA", "JFK", "LAX", 10, "landed")],
        None,
    );
    records.extend(normalize_batch(
        RecordSource::Scheduled,
        vec![timetable_row("AA1", "jfk", "lax", "2024-03-05t08:00:00.000", None, "12")],
        None,
    ));
    records.extend(normalize_batch(
        RecordSource::Future,
        vec![json!({
            "weekday": "3",
            "departure": { "iataCode": "jfk", "scheduledTime": "19:30" },
            "arrival": { "iataCode": "lax", "scheduledTime": "22:45" },
            "aircraft": { "modelCode": "a321" },
            "flight": { "number": "1", "iataNumber": "aa1" }
        })],
        NaiveDate::from_ymd_opt(2024, 3, 6),
    ));

    let result = FlightAnalyzer::default().analyze(&records, Some(GroupBy::Route), None);

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups.keys().next().unwrap(), "JFK-LAX");

    let by_flight = FlightAnalyzer::default().analyze(&records, Some(GroupBy::FlightNumber), None);
    assert_eq!(by_flight.groups.len(), 1);

    let slots = FlightAnalyzer::default().analyze(&records, Some(GroupBy::TimeSlot), None);
    let keys: Vec<_> = slots.groups.keys().cloned().collect();
    assert_eq!(keys, vec![TimeSlot::Morning.to_string(), TimeSlot::Evening.to_string()]);
}

#[test]
fn test_measured_delay_wins_over_reported() {
    let records = normalize_batch(
        RecordSource::Delayed,
        vec![timetable_row(
            "AA7",
            "JFK",
            "BOS",
            "2024-03-04t10:00:00.000",
            Some("2024-03-04t10:40:00.000"),
            "12",
        )],
        None,
    );

    assert_eq!(records[0].delay_minutes(), Some(40));
    assert_eq!(
        classify(&records[0], &DelayThresholds::default()),
        DelayCategory::Moderate
    );
}

#[test]
fn test_cost_grows_with_delay() {
    let rates = CostRates::default();
    let analyzer = FlightAnalyzer::default();
    let mut last = -1.0;

    for delay in [0, 10, 30, 60, 120] {
        let records = normalize_batch(
            RecordSource::Historical,
            vec![flights_row("AA1", "AA", "JFK", "LAX", delay, "landed")],
            None,
        );
        let cost = analyzer.estimate_cost(&records);
        assert_eq!(cost.total_cost, rates.estimate(delay).total_cost);
        assert!(cost.total_cost >= last);
        last = cost.total_cost;
    }
}

#[test]
fn test_trend_and_small_inputs() {
    let records = normalize_batch(
        RecordSource::Historical,
        vec![flights_row("AA1", "AA", "JFK", "LAX", 10, "landed")],
        None,
    );
    let result = FlightAnalyzer::default().analyze(&records, None, None);
    assert_eq!(result.trend.direction, TrendDirection::NotApplicable);

    let empty = FlightAnalyzer::default().analyze(&[], Some(GroupBy::Airline), Some(5));
    assert_eq!(empty.total, 0);
    assert_eq!(empty.on_time.threshold_minutes, 5);
    assert!(empty.groups.is_empty());
}
