//! Upstream API seam

pub mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{FlightError, FlightResult};

/// Upstream endpoints the client knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// Real-time and historical flights
    Flights,
    /// Airport departure/arrival timetable
    Timetable,
    /// Future schedules for a given date
    FlightsFuture,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Flights => "flights",
            Endpoint::Timetable => "timetable",
            Endpoint::FlightsFuture => "flightsFuture",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type QueryParams = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub total: Option<usize>,
}

/// One decoded upstream response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub pagination: Option<PaginationInfo>,
    #[serde(default)]
    pub data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    fn describe(&self) -> String {
        let message = self.message.as_deref().unwrap_or("unspecified error");
        match &self.code {
            Some(Value::String(code)) => format!("{code}: {message}"),
            Some(Value::Number(code)) => format!("{code}: {message}"),
            _ => message.to_string(),
        }
    }
}

/// Error message carried by an upstream error envelope, if the body is one
pub(crate) fn api_error_message(body: &Value) -> Option<String> {
    serde_json::from_value::<ApiErrorBody>(body.clone())
        .ok()
        .map(|b| b.error.describe())
}

impl RawResponse {
    /// Decode a response body. Error envelopes delivered with a success
    /// status still surface as [`FlightError::Upstream`].
    pub fn from_body(body: Value) -> FlightResult<Self> {
        if let Some(message) = api_error_message(&body) {
            return Err(FlightError::upstream(None, message));
        }
        match body {
            Value::Array(data) => Ok(Self {
                pagination: None,
                data,
            }),
            Value::Object(_) => Ok(serde_json::from_value(body)?),
            other => Err(FlightError::Decode(format!(
                "expected a JSON object or array, got {other}"
            ))),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform exactly one upstream request
    async fn fetch(&self, endpoint: Endpoint, params: &QueryParams) -> FlightResult<RawResponse>;
}
