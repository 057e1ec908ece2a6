use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analytics::{
    DelayStats, FlightAnalyzer, OnTimeSummary, OrderedGroups, TemporalPattern, WEEKDAY_NAMES,
};
use crate::error::{DateFailure, FlightError, FlightResult};
use crate::records::{FlightRecord, FlightStatus, Route};

/// Anything that can produce the records of one flight number on one date
#[async_trait]
pub trait FlightSource: Send + Sync {
    async fn flights_on(&self, flight_number: &str, date: NaiveDate)
        -> FlightResult<Vec<FlightRecord>>;
}

/// Records and statistics of one successfully fetched date
#[derive(Debug, Clone, Serialize)]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    pub weekday: &'static str,
    pub records: Vec<FlightRecord>,
    pub cancelled: usize,
    pub on_time: OnTimeSummary,
    pub delay: DelayStats,
}

impl DailyBreakdown {
    pub fn flights(&self) -> usize {
        self.records.len()
    }
}

/// Range-wide figures folded from the successful dates only
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RangeStatistics {
    pub days_requested: usize,
    pub days_fetched: usize,
    pub days_with_flights: usize,
    pub total_flights: usize,
    pub status_counts: OrderedGroups<FlightStatus, usize>,
    /// Flights per weekday, Monday first
    pub weekday_distribution: [usize; 7],
    /// Aircraft type usage in first-seen order
    pub aircraft_usage: OrderedGroups<String, usize>,
    /// Routes in first-seen order
    pub routes: Vec<Route>,
    pub on_time: OnTimeSummary,
    pub delay: DelayStats,
    pub temporal: TemporalPattern,
}

impl RangeStatistics {
    pub fn most_used_aircraft(&self) -> Option<&str> {
        self.aircraft_usage
            .iter()
            .fold(None, |best: Option<(&String, usize)>, (name, &count)| match best {
                Some((_, top)) if top >= count => best,
                _ => Some((name, count)),
            })
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeReport {
    pub flight_number: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Successful dates in calendar order
    pub days: Vec<DailyBreakdown>,
    /// Failed dates in calendar order
    pub errors: Vec<DateFailure>,
    pub statistics: RangeStatistics,
}

impl RangeReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// `RangeFetchPartialFailure` listing the failed dates, if there were any
    pub fn partial_failure(&self) -> Option<FlightError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(FlightError::RangeFetchPartialFailure {
                failed: self.errors.clone(),
            })
        }
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DailyBreakdown> {
        self.days.iter().find(|d| d.date == date)
    }
}

/// Tracks one flight number across a range of dates
#[derive(Clone)]
pub struct RangeTracker {
    source: Arc<dyn FlightSource>,
    analyzer: FlightAnalyzer,
    max_concurrency: usize,
}

impl RangeTracker {
    pub fn new(source: Arc<dyn FlightSource>, analyzer: FlightAnalyzer, max_concurrency: usize) -> Self {
        Self {
            source,
            analyzer,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Fetch every date of `[start, end]` and fold the results.
    ///
    /// A failing date never aborts the range; it lands in
    /// [`RangeReport::errors`] while the statistics cover the remaining
    /// dates. Fetches run concurrently but results keep calendar order.
    pub async fn track_range(
        &self,
        flight_number: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> FlightResult<RangeReport> {
        if start > end {
            return Err(FlightError::InvalidRange { start, end });
        }

        let dates: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();
        let days_requested = dates.len();
        debug!(flight_number, %start, %end, days_requested, "tracking flight over range");

        let outcomes: Vec<(NaiveDate, FlightResult<Vec<FlightRecord>>)> = stream::iter(dates)
            .map(|date| async move { (date, self.source.flights_on(flight_number, date).await) })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut days = Vec::new();
        let mut errors = Vec::new();
        for (date, outcome) in outcomes {
            match outcome {
                Ok(records) => days.push(self.breakdown(date, records)),
                Err(e) => {
                    warn!(flight_number, %date, "failed to fetch date: {}", e);
                    errors.push(DateFailure {
                        date,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let statistics = self.fold_statistics(days_requested, &days);
        info!(
            flight_number,
            %start,
            %end,
            days_fetched = statistics.days_fetched,
            days_failed = errors.len(),
            total_flights = statistics.total_flights,
            on_time_pct = statistics.on_time.percentage,
            "range tracking finished"
        );

        Ok(RangeReport {
            flight_number: flight_number.to_string(),
            start,
            end,
            days,
            errors,
            statistics,
        })
    }

    fn breakdown(&self, date: NaiveDate, records: Vec<FlightRecord>) -> DailyBreakdown {
        DailyBreakdown {
            date,
            weekday: WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize],
            cancelled: records.iter().filter(|r| r.is_cancelled()).count(),
            on_time: self.analyzer.on_time(&records, None),
            delay: DelayStats::from_records(&records),
            records,
        }
    }

    fn fold_statistics(&self, days_requested: usize, days: &[DailyBreakdown]) -> RangeStatistics {
        let mut stats = RangeStatistics {
            days_requested,
            days_fetched: days.len(),
            ..RangeStatistics::default()
        };

        for day in days {
            if !day.records.is_empty() {
                stats.days_with_flights += 1;
            }
            let fallback_weekday = day.date.weekday().num_days_from_monday() as usize;

            for record in &day.records {
                stats.total_flights += 1;
                *stats.status_counts.entry_or_insert_with(record.status, || 0) += 1;

                let weekday = record.weekday_index().unwrap_or(fallback_weekday);
                stats.weekday_distribution[weekday] += 1;

                if let Some(aircraft) = record.aircraft.type_code.as_ref() {
                    *stats
                        .aircraft_usage
                        .entry_or_insert_with(aircraft.clone(), || 0) += 1;
                }
                if let Some(route) = record.route() {
                    if !stats.routes.contains(&route) {
                        stats.routes.push(route);
                    }
                }
            }
        }

        let all: Vec<FlightRecord> = days.iter().flat_map(|d| d.records.iter().cloned()).collect();
        stats.on_time = self.analyzer.on_time(&all, None);
        stats.delay = DelayStats::from_records(&all);
        stats.temporal = TemporalPattern::from_records(&all);
        stats
    }
}
