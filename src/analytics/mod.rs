//! Flight analytics
//!
//! Delay statistics, on-time performance, cost estimates and temporal
//! patterns computed over normalized [`FlightRecord`](crate::records::FlightRecord)s.
//! Grouped results keep first-seen key order through [`OrderedGroups`].

pub mod aggregator;
pub mod cost;
pub mod groups;
pub mod stats;
pub mod temporal;

pub use aggregator::{
    on_time_performance, AnalysisResult, CancelledPolicy, FlightAnalyzer, GroupBy, GroupSummary,
    OnTimeSummary,
};
pub use cost::{CostEstimate, CostRates};
pub use groups::OrderedGroups;
pub use stats::{DelayStats, DelayTrend, TrendDirection};
pub use temporal::{extreme_buckets, TemporalPattern, TimeSlot, WEEKDAY_NAMES};
