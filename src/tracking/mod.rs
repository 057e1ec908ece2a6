//! Dataset comparison and multi-date flight tracking

pub mod compare;
pub mod range;

pub use compare::{
    compare_datasets, compare_flight_numbers, DatasetComparison, DatasetMetrics, FlightNumberDiff,
    FlightSnapshot, LabeledDataset, MetricDeltas, Presence,
};
pub use range::{DailyBreakdown, FlightSource, RangeReport, RangeStatistics, RangeTracker};
