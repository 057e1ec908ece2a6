use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::records::FlightRecord;

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Coarse time of day of a scheduled local departure.
///
/// morning `[00:00, 12:00)`, afternoon `[12:00, 18:00)`, evening `[18:00, 24:00)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 3] = [TimeSlot::Morning, TimeSlot::Afternoon, TimeSlot::Evening];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => TimeSlot::Morning,
            12..=17 => TimeSlot::Afternoon,
            _ => TimeSlot::Evening,
        }
    }

    pub fn of(record: &FlightRecord) -> Option<Self> {
        record
            .scheduled_departure()
            .map(|at| Self::from_hour(at.hour()))
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
        })
    }
}

/// Index of the largest and smallest non-zero counts. Ties go to the lowest
/// index; `None` when every count is zero.
pub fn extreme_buckets(counts: &[usize]) -> (Option<usize>, Option<usize>) {
    let mut busiest: Option<usize> = None;
    let mut quietest: Option<usize> = None;
    for (i, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        if busiest.map_or(true, |b| count > counts[b]) {
            busiest = Some(i);
        }
        if quietest.map_or(true, |q| count < counts[q]) {
            quietest = Some(i);
        }
    }
    (busiest, quietest)
}

/// Weekday (Monday = 0) and time-slot distribution of a record set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemporalPattern {
    pub weekday_counts: [usize; 7],
    pub slot_counts: [usize; 3],
    pub busiest_weekday: Option<usize>,
    pub quietest_weekday: Option<usize>,
    pub busiest_slot: Option<TimeSlot>,
    pub quietest_slot: Option<TimeSlot>,
}

impl TemporalPattern {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a FlightRecord>) -> Self {
        let mut weekday_counts = [0usize; 7];
        let mut slot_counts = [0usize; 3];

        for record in records {
            if let Some(day) = record.weekday_index() {
                weekday_counts[day] += 1;
            }
            if let Some(slot) = TimeSlot::of(record) {
                slot_counts[slot.index()] += 1;
            }
        }

        Self::from_counts(weekday_counts, slot_counts)
    }

    pub fn from_counts(weekday_counts: [usize; 7], slot_counts: [usize; 3]) -> Self {
        let (busiest_weekday, quietest_weekday) = extreme_buckets(&weekday_counts);
        let (busiest_slot, quietest_slot) = extreme_buckets(&slot_counts);

        Self {
            weekday_counts,
            slot_counts,
            busiest_weekday,
            quietest_weekday,
            busiest_slot: busiest_slot.map(|i| TimeSlot::ALL[i]),
            quietest_slot: quietest_slot.map(|i| TimeSlot::ALL[i]),
        }
    }

    pub fn busiest_weekday_name(&self) -> Option<&'static str> {
        self.busiest_weekday.map(|i| WEEKDAY_NAMES[i])
    }

    pub fn quietest_weekday_name(&self) -> Option<&'static str> {
        self.quietest_weekday.map(|i| WEEKDAY_NAMES[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordSource;
    use chrono::NaiveDateTime;

    fn at(ts: &str) -> FlightRecord {
        let mut record = FlightRecord::new(RecordSource::Scheduled);
        record.departure.scheduled =
            Some(NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M").unwrap());
        record
    }

    #[test]
    fn test_slot_boundaries() {
        assert_eq!(TimeSlot::from_hour(0), TimeSlot::Morning);
        assert_eq!(TimeSlot::from_hour(11), TimeSlot::Morning);
        assert_eq!(TimeSlot::from_hour(12), TimeSlot::Afternoon);
        assert_eq!(TimeSlot::from_hour(17), TimeSlot::Afternoon);
        assert_eq!(TimeSlot::from_hour(18), TimeSlot::Evening);
        assert_eq!(TimeSlot::from_hour(23), TimeSlot::Evening);
    }

    #[test]
    fn test_extremes_ignore_zero_and_break_ties_low() {
        assert_eq!(extreme_buckets(&[0, 3, 1, 3, 0, 1, 0]), (Some(1), Some(2)));
        assert_eq!(extreme_buckets(&[0, 0, 0]), (None, None));
        assert_eq!(extreme_buckets(&[2, 2, 2]), (Some(0), Some(0)));
    }

    #[test]
    fn test_pattern_from_records() {
        // 2024-03-04 Monday, 2024-03-06 Wednesday
        let records = vec![
            at("2024-03-04 07:30"),
            at("2024-03-04 13:10"),
            at("2024-03-04 19:45"),
            at("2024-03-06 08:00"),
            at("2024-03-06 09:15"),
        ];

        let pattern = TemporalPattern::from_records(&records);

        assert_eq!(pattern.weekday_counts, [3, 0, 2, 0, 0, 0, 0]);
        assert_eq!(pattern.slot_counts, [3, 1, 1]);
        assert_eq!(pattern.busiest_weekday_name(), Some("Monday"));
        assert_eq!(pattern.quietest_weekday_name(), Some("Wednesday"));
        assert_eq!(pattern.busiest_slot, Some(TimeSlot::Morning));
        assert_eq!(pattern.quietest_slot, Some(TimeSlot::Afternoon));
    }

    #[test]
    fn test_empty_pattern() {
        let pattern = TemporalPattern::from_records(&[]);
        assert_eq!(pattern, TemporalPattern::default());
    }
}
