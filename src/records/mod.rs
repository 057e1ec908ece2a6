//! Flight record model, upstream adapters and classification

pub mod classifier;
pub mod model;
pub mod raw;

pub use classifier::{classify, classify_minutes, normalize_status, DelayCategory, DelayThresholds};
pub use model::{
    AircraftRef, AirlineRef, AirportRef, Codeshare, FlightRecord, FlightStatus, Leg, RecordSource,
    Route,
};
pub use raw::RawFlight;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

/// Decode and normalize a batch of upstream rows.
///
/// Only rows that are not JSON objects are skipped, with a warning. Fields of
/// the wrong type decode as missing, and rows lacking required fields are
/// kept and logged, so one bad record never aborts the batch.
pub fn normalize_batch(
    source: RecordSource,
    rows: Vec<Value>,
    date: Option<NaiveDate>,
) -> Vec<FlightRecord> {
    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let record = match RawFlight::decode(source, row, date) {
            Ok(raw) => raw.normalize(),
            Err(e) => {
                warn!(index, ?source, "skipping undecodable flight row: {}", e);
                continue;
            }
        };
        if let Err(e) = record.validate() {
            warn!(index, ?source, "{}", e);
        }
        records.push(record);
    }
    records
}
