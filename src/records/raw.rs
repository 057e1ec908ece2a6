//! Upstream record shapes and their adapters into [`FlightRecord`]
//!
//! Three wire shapes exist: the `flights` endpoint (real-time, historical and
//! by-number queries), the `timetable` endpoint (scheduled and delayed
//! queries, camelCase fields, string delays) and the `flightsFuture` endpoint
//! (weekly schedules with bare `HH:MM` times). Every field is optional on the
//! wire; adapters never fail on missing data.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{FlightError, FlightResult};
use crate::records::{
    normalize_status, AircraftRef, AirlineRef, AirportRef, Codeshare, FlightRecord, FlightStatus,
    Leg, RecordSource,
};

/// Accepts a JSON number or numeric string; anything else becomes `None`
fn lenient_minutes<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    })
}

/// Accepts a JSON string or number; anything else becomes `None`
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Nested object that falls back to `None` instead of failing the row
fn lenient_nested<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Parses RFC 3339 (`2024-03-01T10:00:00+00:00`) and the timetable form
/// (`2024-03-01t10:00:00.000`). The wall-clock part is kept as given.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }
    let normalized = raw.replacen('t', "T", 1);
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let v = v.trim();
        (!v.is_empty()).then(|| v.to_string())
    })
}

fn code(value: Option<String>) -> Option<String> {
    non_empty(value).map(|v| v.to_uppercase())
}

fn timestamp(value: &Option<String>) -> Option<NaiveDateTime> {
    value.as_deref().and_then(parse_timestamp)
}

// ---- flights endpoint ----

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FlightsLeg {
    #[serde(deserialize_with = "lenient_text")]
    pub airport: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub iata: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub icao: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub terminal: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub gate: Option<String>,
    #[serde(deserialize_with = "lenient_minutes")]
    pub delay: Option<i64>,
    #[serde(deserialize_with = "lenient_text")]
    pub scheduled: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub estimated: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FlightsAirline {
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub iata: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub icao: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FlightsCodeshare {
    #[serde(deserialize_with = "lenient_text")]
    pub airline_iata: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub airline_icao: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub flight_number: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub flight_iata: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub flight_icao: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FlightsFlight {
    #[serde(deserialize_with = "lenient_text")]
    pub number: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub iata: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub icao: Option<String>,
    #[serde(deserialize_with = "lenient_nested")]
    pub codeshared: Option<FlightsCodeshare>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FlightsAircraft {
    #[serde(deserialize_with = "lenient_text")]
    pub registration: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub iata: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub icao: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FlightsEntry {
    #[serde(deserialize_with = "lenient_text")]
    pub flight_date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub flight_status: Option<String>,
    #[serde(deserialize_with = "lenient_nested")]
    pub departure: Option<FlightsLeg>,
    #[serde(deserialize_with = "lenient_nested")]
    pub arrival: Option<FlightsLeg>,
    #[serde(deserialize_with = "lenient_nested")]
    pub airline: Option<FlightsAirline>,
    #[serde(deserialize_with = "lenient_nested")]
    pub flight: Option<FlightsFlight>,
    #[serde(deserialize_with = "lenient_nested")]
    pub aircraft: Option<FlightsAircraft>,
}

impl FlightsLeg {
    fn into_leg(self) -> Leg {
        Leg {
            scheduled: timestamp(&self.scheduled),
            estimated: timestamp(&self.estimated),
            actual: timestamp(&self.actual),
            airport: AirportRef {
                iata: code(self.iata),
                icao: code(self.icao),
                name: non_empty(self.airport),
            },
            terminal: non_empty(self.terminal),
            gate: non_empty(self.gate),
            delay_minutes: self.delay,
        }
    }
}

impl FlightsEntry {
    fn into_record(self, source: RecordSource) -> FlightRecord {
        let mut record = FlightRecord::new(source);
        record.flight_date = self
            .flight_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());
        record.status = self
            .flight_status
            .as_deref()
            .map(normalize_status)
            .unwrap_or(FlightStatus::Unknown);
        record.departure = self.departure.map(FlightsLeg::into_leg).unwrap_or_default();
        record.arrival = self.arrival.map(FlightsLeg::into_leg).unwrap_or_default();

        if let Some(airline) = self.airline {
            record.airline = AirlineRef {
                name: non_empty(airline.name),
                iata: code(airline.iata),
                icao: code(airline.icao),
            };
        }
        if let Some(aircraft) = self.aircraft {
            record.aircraft = AircraftRef {
                registration: code(aircraft.registration),
                type_code: code(aircraft.iata).or(code(aircraft.icao)),
                model: None,
            };
        }
        if let Some(flight) = self.flight {
            record.flight_number = non_empty(flight.number);
            record.flight_iata = code(flight.iata);
            record.flight_icao = code(flight.icao);
            record.codeshare = flight.codeshared.map(|c| Codeshare {
                airline_iata: code(c.airline_iata),
                airline_icao: code(c.airline_icao),
                flight_number: non_empty(c.flight_number),
                flight_iata: code(c.flight_iata),
                flight_icao: code(c.flight_icao),
            });
        }
        record
    }
}

// ---- timetable endpoint ----

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimetableLeg {
    #[serde(deserialize_with = "lenient_text")]
    pub iata_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub icao_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub terminal: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub gate: Option<String>,
    #[serde(deserialize_with = "lenient_minutes")]
    pub delay: Option<i64>,
    #[serde(deserialize_with = "lenient_text")]
    pub scheduled_time: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub estimated_time: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub actual_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimetableAirline {
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub iata_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub icao_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimetableFlight {
    #[serde(deserialize_with = "lenient_text")]
    pub number: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub iata_number: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub icao_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimetableCodeshare {
    #[serde(deserialize_with = "lenient_nested")]
    pub airline: Option<TimetableAirline>,
    #[serde(deserialize_with = "lenient_nested")]
    pub flight: Option<TimetableFlight>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimetableEntry {
    #[serde(deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient_text")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient_nested")]
    pub departure: Option<TimetableLeg>,
    #[serde(deserialize_with = "lenient_nested")]
    pub arrival: Option<TimetableLeg>,
    #[serde(deserialize_with = "lenient_nested")]
    pub airline: Option<TimetableAirline>,
    #[serde(deserialize_with = "lenient_nested")]
    pub flight: Option<TimetableFlight>,
    #[serde(deserialize_with = "lenient_nested")]
    pub codeshared: Option<TimetableCodeshare>,
}

impl TimetableLeg {
    fn into_leg(self) -> Leg {
        Leg {
            scheduled: timestamp(&self.scheduled_time),
            estimated: timestamp(&self.estimated_time),
            actual: timestamp(&self.actual_time),
            airport: AirportRef {
                iata: code(self.iata_code),
                icao: code(self.icao_code),
                name: None,
            },
            terminal: non_empty(self.terminal),
            gate: non_empty(self.gate),
            delay_minutes: self.delay,
        }
    }
}

impl TimetableAirline {
    fn into_airline(self) -> AirlineRef {
        AirlineRef {
            name: non_empty(self.name),
            iata: code(self.iata_code),
            icao: code(self.icao_code),
        }
    }
}

impl TimetableCodeshare {
    fn into_codeshare(self) -> Codeshare {
        let airline = self.airline.map(TimetableAirline::into_airline).unwrap_or_default();
        let flight = self.flight.unwrap_or_default();
        Codeshare {
            airline_iata: airline.iata,
            airline_icao: airline.icao,
            flight_number: non_empty(flight.number),
            flight_iata: code(flight.iata_number),
            flight_icao: code(flight.icao_number),
        }
    }
}

impl TimetableEntry {
    fn into_record(self, source: RecordSource) -> FlightRecord {
        let mut record = FlightRecord::new(source);
        record.status = self
            .status
            .as_deref()
            .map(normalize_status)
            .unwrap_or(FlightStatus::Unknown);
        record.departure = self.departure.map(TimetableLeg::into_leg).unwrap_or_default();
        record.arrival = self.arrival.map(TimetableLeg::into_leg).unwrap_or_default();
        record.airline = self
            .airline
            .map(TimetableAirline::into_airline)
            .unwrap_or_default();
        if let Some(flight) = self.flight {
            record.flight_number = non_empty(flight.number);
            record.flight_iata = code(flight.iata_number);
            record.flight_icao = code(flight.icao_number);
        }
        record.codeshare = self.codeshared.map(TimetableCodeshare::into_codeshare);
        record.flight_date = record.departure.scheduled.map(|ts| ts.date());
        record
    }
}

// ---- flightsFuture endpoint ----

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FutureLeg {
    #[serde(deserialize_with = "lenient_text")]
    pub iata_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub icao_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub terminal: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub gate: Option<String>,
    /// `HH:MM` local time
    #[serde(deserialize_with = "lenient_text")]
    pub scheduled_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FutureAircraft {
    #[serde(deserialize_with = "lenient_text")]
    pub model_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub model_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FutureScheduleEntry {
    #[serde(deserialize_with = "lenient_text")]
    pub weekday: Option<String>,
    #[serde(deserialize_with = "lenient_nested")]
    pub departure: Option<FutureLeg>,
    #[serde(deserialize_with = "lenient_nested")]
    pub arrival: Option<FutureLeg>,
    #[serde(deserialize_with = "lenient_nested")]
    pub aircraft: Option<FutureAircraft>,
    #[serde(deserialize_with = "lenient_nested")]
    pub airline: Option<TimetableAirline>,
    #[serde(deserialize_with = "lenient_nested")]
    pub flight: Option<TimetableFlight>,
    #[serde(deserialize_with = "lenient_nested")]
    pub codeshared: Option<TimetableCodeshare>,
}

fn parse_clock(raw: &Option<String>) -> Option<NaiveTime> {
    let raw = raw.as_deref()?.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

impl FutureLeg {
    fn into_leg(self, scheduled: Option<NaiveDateTime>) -> Leg {
        Leg {
            airport: AirportRef {
                iata: code(self.iata_code),
                icao: code(self.icao_code),
                name: None,
            },
            terminal: non_empty(self.terminal),
            gate: non_empty(self.gate),
            scheduled,
            ..Leg::default()
        }
    }
}

impl FutureScheduleEntry {
    fn into_record(self, date: NaiveDate) -> FlightRecord {
        let mut record = FlightRecord::new(RecordSource::Future);
        record.flight_date = Some(date);
        record.status = FlightStatus::Scheduled;

        let departure_at = self
            .departure
            .as_ref()
            .and_then(|leg| parse_clock(&leg.scheduled_time))
            .map(|time| date.and_time(time));
        // Arrival clock earlier than departure means the flight lands the next day
        let arrival_at = self
            .arrival
            .as_ref()
            .and_then(|leg| parse_clock(&leg.scheduled_time))
            .map(|time| {
                let at = date.and_time(time);
                match departure_at {
                    Some(dep) if at < dep => at + Duration::days(1),
                    _ => at,
                }
            });

        record.departure = self
            .departure
            .map(|leg| leg.into_leg(departure_at))
            .unwrap_or_default();
        record.arrival = self
            .arrival
            .map(|leg| leg.into_leg(arrival_at))
            .unwrap_or_default();
        record.airline = self
            .airline
            .map(TimetableAirline::into_airline)
            .unwrap_or_default();
        if let Some(aircraft) = self.aircraft {
            record.aircraft = AircraftRef {
                registration: None,
                type_code: code(aircraft.model_code),
                model: non_empty(aircraft.model_text),
            };
        }
        if let Some(flight) = self.flight {
            record.flight_number = non_empty(flight.number);
            record.flight_iata = code(flight.iata_number);
            record.flight_icao = code(flight.icao_number);
        }
        record.codeshare = self.codeshared.map(TimetableCodeshare::into_codeshare);
        record
    }
}

/// Closed set of upstream record variants
#[derive(Debug, Clone)]
pub enum RawFlight {
    RealTime(FlightsEntry),
    Historical(FlightsEntry),
    ByNumber(FlightsEntry),
    Scheduled(TimetableEntry),
    Delayed(TimetableEntry),
    /// Future schedules carry no date of their own; it comes from the query
    Future { date: NaiveDate, entry: FutureScheduleEntry },
}

impl RawFlight {
    /// Decode one upstream JSON row as the shape `source` returns
    pub fn decode(source: RecordSource, value: Value, date: Option<NaiveDate>) -> FlightResult<Self> {
        if !value.is_object() {
            return Err(FlightError::MalformedRecord {
                reason: "row is not a JSON object".to_string(),
            });
        }
        Ok(match source {
            RecordSource::RealTime => RawFlight::RealTime(serde_json::from_value(value)?),
            RecordSource::Historical => RawFlight::Historical(serde_json::from_value(value)?),
            RecordSource::ByNumber => RawFlight::ByNumber(serde_json::from_value(value)?),
            RecordSource::Scheduled => RawFlight::Scheduled(serde_json::from_value(value)?),
            RecordSource::Delayed => RawFlight::Delayed(serde_json::from_value(value)?),
            RecordSource::Future => {
                let entry: FutureScheduleEntry = serde_json::from_value(value)?;
                let date = date.ok_or_else(|| FlightError::MalformedRecord {
                    reason: "future schedule row without a query date".to_string(),
                })?;
                RawFlight::Future { date, entry }
            }
        })
    }

    pub fn source(&self) -> RecordSource {
        match self {
            RawFlight::RealTime(_) => RecordSource::RealTime,
            RawFlight::Historical(_) => RecordSource::Historical,
            RawFlight::ByNumber(_) => RecordSource::ByNumber,
            RawFlight::Scheduled(_) => RecordSource::Scheduled,
            RawFlight::Delayed(_) => RecordSource::Delayed,
            RawFlight::Future { .. } => RecordSource::Future,
        }
    }

    pub fn normalize(self) -> FlightRecord {
        let source = self.source();
        match self {
            RawFlight::RealTime(entry)
            | RawFlight::Historical(entry)
            | RawFlight::ByNumber(entry) => entry.into_record(source),
            RawFlight::Scheduled(entry) | RawFlight::Delayed(entry) => entry.into_record(source),
            RawFlight::Future { date, entry } => entry.into_record(date),
        }
    }
}

impl From<RawFlight> for FlightRecord {
    fn from(raw: RawFlight) -> Self {
        raw.normalize()
    }
}
