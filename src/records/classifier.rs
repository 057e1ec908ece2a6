//! Status normalization and delay bucketing

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::records::{FlightRecord, FlightStatus};

/// Upper bounds (inclusive, in minutes) of the delay buckets.
///
/// | bucket   | minutes                         |
/// |----------|---------------------------------|
/// | none     | `<= 0`                          |
/// | minor    | `1 ..= minor_max`               |
/// | moderate | `minor_max+1 ..= moderate_max`  |
/// | major    | `moderate_max+1 ..= major_max`  |
/// | severe   | `> major_max`                   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayThresholds {
    pub minor_max: i64,
    pub moderate_max: i64,
    pub major_max: i64,
}

impl Default for DelayThresholds {
    fn default() -> Self {
        Self {
            minor_max: 15,
            moderate_max: 60,
            major_max: 180,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayCategory {
    None,
    Minor,
    Moderate,
    Major,
    Severe,
}

impl DelayCategory {
    pub const ALL: [DelayCategory; 5] = [
        DelayCategory::None,
        DelayCategory::Minor,
        DelayCategory::Moderate,
        DelayCategory::Major,
        DelayCategory::Severe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DelayCategory::None => "none",
            DelayCategory::Minor => "minor",
            DelayCategory::Moderate => "moderate",
            DelayCategory::Major => "major",
            DelayCategory::Severe => "severe",
        }
    }
}

impl fmt::Display for DelayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify_minutes(minutes: i64, thresholds: &DelayThresholds) -> DelayCategory {
    if minutes <= 0 {
        DelayCategory::None
    } else if minutes <= thresholds.minor_max {
        DelayCategory::Minor
    } else if minutes <= thresholds.moderate_max {
        DelayCategory::Moderate
    } else if minutes <= thresholds.major_max {
        DelayCategory::Major
    } else {
        DelayCategory::Severe
    }
}

/// Bucket a record by its effective delay. A record with no delay
/// information counts as undelayed, the same way on-time scoring treats it.
pub fn classify(record: &FlightRecord, thresholds: &DelayThresholds) -> DelayCategory {
    classify_minutes(record.delay_minutes().unwrap_or(0), thresholds)
}

/// Map an upstream status string to [`FlightStatus`]. Never fails.
pub fn normalize_status(raw: &str) -> FlightStatus {
    match raw.trim().to_lowercase().as_str() {
        "scheduled" => FlightStatus::Scheduled,
        "active" | "en-route" | "en_route" | "enroute" | "started" | "airborne" => {
            FlightStatus::Active
        }
        "landed" | "arrived" => FlightStatus::Landed,
        "cancelled" | "canceled" => FlightStatus::Cancelled,
        "diverted" | "redirected" => FlightStatus::Diverted,
        _ => FlightStatus::Unknown,
    }
}
