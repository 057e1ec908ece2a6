//! Normalized flight record shared by every upstream record shape

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FlightError, FlightResult};

/// Normalized flight status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    Scheduled,
    Active,
    Landed,
    Cancelled,
    Diverted,
    Unknown,
}

impl FlightStatus {
    pub const ALL: [FlightStatus; 6] = [
        FlightStatus::Scheduled,
        FlightStatus::Active,
        FlightStatus::Landed,
        FlightStatus::Cancelled,
        FlightStatus::Diverted,
        FlightStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "scheduled",
            FlightStatus::Active => "active",
            FlightStatus::Landed => "landed",
            FlightStatus::Cancelled => "cancelled",
            FlightStatus::Diverted => "diverted",
            FlightStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which upstream query produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    RealTime,
    Historical,
    ByNumber,
    Scheduled,
    Delayed,
    Future,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirportRef {
    pub iata: Option<String>,
    pub icao: Option<String>,
    pub name: Option<String>,
}

impl AirportRef {
    /// IATA code when known, otherwise ICAO
    pub fn code(&self) -> Option<&str> {
        self.iata.as_deref().or(self.icao.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirlineRef {
    pub name: Option<String>,
    pub iata: Option<String>,
    pub icao: Option<String>,
}

impl AirlineRef {
    pub fn code(&self) -> Option<&str> {
        self.iata.as_deref().or(self.icao.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AircraftRef {
    pub registration: Option<String>,
    /// IATA/ICAO type designator or model code, e.g. `A321`, `B77W`
    pub type_code: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Codeshare {
    pub airline_iata: Option<String>,
    pub airline_icao: Option<String>,
    pub flight_number: Option<String>,
    pub flight_iata: Option<String>,
    pub flight_icao: Option<String>,
}

/// One end of a flight. Times are local wall-clock times at the airport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub airport: AirportRef,
    pub terminal: Option<String>,
    pub gate: Option<String>,
    pub scheduled: Option<NaiveDateTime>,
    pub estimated: Option<NaiveDateTime>,
    pub actual: Option<NaiveDateTime>,
    /// Delay as reported by the source
    pub delay_minutes: Option<i64>,
}

impl Leg {
    /// `actual - scheduled` when both are known, else the reported delay
    pub fn effective_delay(&self) -> Option<i64> {
        match (self.scheduled, self.actual) {
            (Some(scheduled), Some(actual)) => Some((actual - scheduled).num_minutes()),
            _ => self.delay_minutes,
        }
    }
}

/// Origin/destination pair, the join key for route comparisons
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.destination)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub source: RecordSource,
    pub flight_date: Option<NaiveDate>,
    pub flight_number: Option<String>,
    pub flight_iata: Option<String>,
    pub flight_icao: Option<String>,
    pub status: FlightStatus,
    pub airline: AirlineRef,
    pub aircraft: AircraftRef,
    pub departure: Leg,
    pub arrival: Leg,
    pub codeshare: Option<Codeshare>,
}

impl FlightRecord {
    pub fn new(source: RecordSource) -> Self {
        Self {
            source,
            flight_date: None,
            flight_number: None,
            flight_iata: None,
            flight_icao: None,
            status: FlightStatus::Unknown,
            airline: AirlineRef::default(),
            aircraft: AircraftRef::default(),
            departure: Leg::default(),
            arrival: Leg::default(),
            codeshare: None,
        }
    }

    /// Best available flight designator: IATA, then ICAO, then the bare number
    pub fn flight_code(&self) -> Option<&str> {
        self.flight_iata
            .as_deref()
            .or(self.flight_icao.as_deref())
            .or(self.flight_number.as_deref())
    }

    /// Departure delay when known, otherwise arrival delay
    pub fn delay_minutes(&self) -> Option<i64> {
        self.departure
            .effective_delay()
            .or_else(|| self.arrival.effective_delay())
    }

    pub fn route(&self) -> Option<Route> {
        Some(Route {
            origin: self.departure.airport.code()?.to_string(),
            destination: self.arrival.airport.code()?.to_string(),
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == FlightStatus::Cancelled
    }

    pub fn scheduled_departure(&self) -> Option<NaiveDateTime> {
        self.departure.scheduled
    }

    /// Operating date: the flight date, or the scheduled departure date
    pub fn operating_date(&self) -> Option<NaiveDate> {
        self.flight_date
            .or_else(|| self.departure.scheduled.map(|ts| ts.date()))
    }

    /// Monday = 0 .. Sunday = 6
    pub fn weekday_index(&self) -> Option<usize> {
        self.operating_date()
            .map(|date| date.weekday().num_days_from_monday() as usize)
    }

    /// Checks the fields downstream grouping relies on.
    ///
    /// Records failing this are still kept by the adapters; callers decide
    /// whether to drop them.
    pub fn validate(&self) -> FlightResult<()> {
        if self.flight_code().is_none() {
            return Err(FlightError::MalformedRecord {
                reason: "no flight number or IATA/ICAO flight code".to_string(),
            });
        }
        if self.route().is_none() {
            return Err(FlightError::MalformedRecord {
                reason: format!(
                    "flight {} is missing an origin or destination airport",
                    self.flight_code().unwrap_or("?")
                ),
            });
        }
        Ok(())
    }
}
