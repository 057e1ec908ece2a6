//! Query facade over cache, pagination, transport and record adapters

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::analytics::{AnalysisResult, FlightAnalyzer, GroupBy};
use crate::cache::{CacheKey, QueryCache};
use crate::config::{Config, PaginationConfig, TrackingConfig};
use crate::error::FlightResult;
use crate::pagination::paginate;
use crate::records::{normalize_batch, FlightRecord, RecordSource};
use crate::tracking::{
    compare_datasets, DatasetComparison, FlightSource, LabeledDataset, RangeReport, RangeTracker,
};
use crate::transport::{Endpoint, HttpTransport, QueryParams, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Departure,
    Arrival,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Departure => "departure",
            Direction::Arrival => "arrival",
        }
    }
}

/// Optional filters of the `flights` endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightFilters {
    pub airline_iata: Option<String>,
    pub dep_iata: Option<String>,
    pub arr_iata: Option<String>,
    pub flight_status: Option<String>,
}

impl FlightFilters {
    fn apply(&self, params: &mut QueryParams) {
        let fields = [
            ("airline_iata", &self.airline_iata),
            ("dep_iata", &self.dep_iata),
            ("arr_iata", &self.arr_iata),
            ("flight_status", &self.flight_status),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                put(params, name, value);
            }
        }
    }
}

/// Insert a trimmed value, skipping blanks, so the request matches its cache key
fn put(params: &mut QueryParams, name: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        params.insert(name.to_string(), value.to_string());
    }
}

/// A logical flight query. Each maps to one endpoint, one parameter set and
/// one record shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlightQuery {
    RealTime {
        filters: FlightFilters,
    },
    Historical {
        date: NaiveDate,
        filters: FlightFilters,
    },
    ByNumber {
        flight_iata: String,
        date: Option<NaiveDate>,
    },
    Scheduled {
        airport_iata: String,
        direction: Direction,
        airline_iata: Option<String>,
    },
    Delayed {
        airport_iata: String,
        direction: Direction,
        min_delay_minutes: i64,
    },
    Future {
        airport_iata: String,
        direction: Direction,
        date: NaiveDate,
    },
}

impl FlightQuery {
    pub fn source(&self) -> RecordSource {
        match self {
            FlightQuery::RealTime { .. } => RecordSource::RealTime,
            FlightQuery::Historical { .. } => RecordSource::Historical,
            FlightQuery::ByNumber { .. } => RecordSource::ByNumber,
            FlightQuery::Scheduled { .. } => RecordSource::Scheduled,
            FlightQuery::Delayed { .. } => RecordSource::Delayed,
            FlightQuery::Future { .. } => RecordSource::Future,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            FlightQuery::RealTime { .. }
            | FlightQuery::Historical { .. }
            | FlightQuery::ByNumber { .. } => Endpoint::Flights,
            FlightQuery::Scheduled { .. } | FlightQuery::Delayed { .. } => Endpoint::Timetable,
            FlightQuery::Future { .. } => Endpoint::FlightsFuture,
        }
    }

    /// Date the query is pinned to, if any
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            FlightQuery::Historical { date, .. } | FlightQuery::Future { date, .. } => Some(*date),
            FlightQuery::ByNumber { date, .. } => *date,
            _ => None,
        }
    }

    /// Upstream parameters, excluding paging and credentials
    pub fn params(&self) -> QueryParams {
        let mut params = QueryParams::new();

        match self {
            FlightQuery::RealTime { filters } => filters.apply(&mut params),
            FlightQuery::Historical { date, filters } => {
                params.insert("flight_date".to_string(), date.to_string());
                filters.apply(&mut params);
            }
            FlightQuery::ByNumber { flight_iata, date } => {
                put(&mut params, "flight_iata", flight_iata);
                if let Some(date) = date {
                    params.insert("flight_date".to_string(), date.to_string());
                }
            }
            FlightQuery::Scheduled {
                airport_iata,
                direction,
                airline_iata,
            } => {
                put(&mut params, "iataCode", airport_iata);
                params.insert("type".to_string(), direction.as_str().to_string());
                if let Some(airline) = airline_iata {
                    put(&mut params, "airline_iata", airline);
                }
            }
            FlightQuery::Delayed {
                airport_iata,
                direction,
                min_delay_minutes,
            } => {
                put(&mut params, "iataCode", airport_iata);
                params.insert("type".to_string(), direction.as_str().to_string());
                let name = match direction {
                    Direction::Departure => "min_delay_dep",
                    Direction::Arrival => "min_delay_arr",
                };
                params.insert(name.to_string(), (*min_delay_minutes).max(1).to_string());
            }
            FlightQuery::Future {
                airport_iata,
                direction,
                date,
            } => {
                put(&mut params, "iataCode", airport_iata);
                params.insert("type".to_string(), direction.as_str().to_string());
                params.insert("date".to_string(), date.to_string());
            }
        }
        params
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.endpoint().as_str(), self.params())
    }
}

/// Cached, paginated access to normalized flight records
#[derive(Clone)]
pub struct FlightClient {
    transport: Arc<dyn Transport>,
    cache: QueryCache<Arc<Vec<FlightRecord>>>,
    pagination: PaginationConfig,
    tracking: TrackingConfig,
    analyzer: FlightAnalyzer,
}

impl FlightClient {
    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self {
            transport,
            cache: QueryCache::new(config.cache.max_entries, config.cache.ttl()),
            pagination: config.pagination.clone(),
            tracking: config.tracking.clone(),
            analyzer: FlightAnalyzer::new(&config.analytics),
        }
    }

    /// Client talking to the configured upstream over HTTP
    pub fn from_config(config: &Config) -> FlightResult<Self> {
        let transport = HttpTransport::new(&config.api)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn analyzer(&self) -> &FlightAnalyzer {
        &self.analyzer
    }

    pub fn cache(&self) -> &QueryCache<Arc<Vec<FlightRecord>>> {
        &self.cache
    }

    /// Every record of `query`, served from cache while the entry is live.
    /// Concurrent identical queries share one upstream page sequence.
    pub async fn flights(&self, query: &FlightQuery) -> FlightResult<Arc<Vec<FlightRecord>>> {
        self.flights_with_ttl(query, None).await
    }

    /// Like [`FlightClient::flights`], storing a fresh result for `ttl`
    /// instead of the configured default
    pub async fn flights_with_ttl(
        &self,
        query: &FlightQuery,
        ttl: Option<Duration>,
    ) -> FlightResult<Arc<Vec<FlightRecord>>> {
        let key = query.cache_key();
        self.cache
            .get_or_fetch(&key, || self.fetch_all(query), ttl)
            .await
    }

    /// Walk every page of `query` upstream, bypassing the cache
    async fn fetch_all(&self, query: &FlightQuery) -> FlightResult<Arc<Vec<FlightRecord>>> {
        let endpoint = query.endpoint();
        let base_params = query.params();
        let transport = Arc::clone(&self.transport);

        let fetch_page = move |offset: usize, limit: usize| {
            let transport = Arc::clone(&transport);
            let mut params = base_params.clone();
            params.insert("offset".to_string(), offset.to_string());
            params.insert("limit".to_string(), limit.to_string());
            async move {
                let response = transport.fetch(endpoint, &params).await?;
                if let Some(info) = &response.pagination {
                    debug!(%endpoint, offset, count = info.count, total = ?info.total, "page received");
                }
                Ok(response.data)
            }
        };

        let rows = paginate(fetch_page, self.pagination.page_size)
            .with_max_pages(self.pagination.max_pages)
            .collect_records()
            .await?;

        let records = normalize_batch(query.source(), rows, query.date());
        debug!(%endpoint, records = records.len(), "query assembled");
        Ok(Arc::new(records))
    }

    pub async fn analyze(
        &self,
        query: &FlightQuery,
        group_by: Option<GroupBy>,
        threshold_minutes: Option<i64>,
    ) -> FlightResult<AnalysisResult> {
        let records = self.flights(query).await?;
        Ok(self.analyzer.analyze(&records, group_by, threshold_minutes))
    }

    /// Compare the results of two queries, labeled by the caller
    pub async fn compare(
        &self,
        (label_a, query_a): (&str, &FlightQuery),
        (label_b, query_b): (&str, &FlightQuery),
    ) -> FlightResult<DatasetComparison> {
        let (a, b) = futures::try_join!(self.flights(query_a), self.flights(query_b))?;
        Ok(compare_datasets(
            &self.analyzer,
            LabeledDataset::new(label_a, &a),
            LabeledDataset::new(label_b, &b),
        ))
    }

    /// Track `flight_iata` on every date of `[start, end]`
    pub async fn track_range(
        &self,
        flight_iata: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> FlightResult<RangeReport> {
        let tracker = RangeTracker::new(
            Arc::new(self.clone()),
            self.analyzer.clone(),
            self.tracking.max_concurrency,
        );
        tracker.track_range(flight_iata, start, end).await
    }
}

#[async_trait]
impl FlightSource for FlightClient {
    async fn flights_on(
        &self,
        flight_number: &str,
        date: NaiveDate,
    ) -> FlightResult<Vec<FlightRecord>> {
        let query = FlightQuery::ByNumber {
            flight_iata: flight_number.to_string(),
            date: Some(date),
        };
        let records = self.flights(&query).await?;
        Ok(records.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlightError;
    use crate::transport::RawResponse;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves `total` flights rows in pages and records every request
    struct PagedTransport {
        total: usize,
        calls: AtomicUsize,
        requests: Mutex<Vec<QueryParams>>,
    }

    impl PagedTransport {
        fn new(total: usize) -> Arc<Self> {
            Arc::new(Self {
                total,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for PagedTransport {
        async fn fetch(&self, _endpoint: Endpoint, params: &QueryParams) -> FlightResult<RawResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(params.clone());
            let offset: usize = params["offset"].parse().unwrap();
            let limit: usize = params["limit"].parse().unwrap();
            let data: Vec<Value> = (offset..self.total.min(offset + limit))
                .map(|i| {
                    json!({
                        "flight_date": "2024-03-04",
                        "flight_status": "landed",
                        "flight": { "iata": format!("AA{i}") },
                        "departure": { "iata": "JFK", "delay": i % 30 },
                        "arrival": { "iata": "LAX" }
                    })
                })
                .collect();
            Ok(RawResponse {
                pagination: None,
                data,
            })
        }
    }

    fn config(page_size: usize) -> Config {
        let mut config = Config::default();
        config.pagination.page_size = page_size;
        config
    }

    fn historical() -> FlightQuery {
        FlightQuery::Historical {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            filters: FlightFilters {
                dep_iata: Some("JFK".to_string()),
                ..FlightFilters::default()
            },
        }
    }

    #[tokio::test]
    async fn test_flights_walks_pages_and_caches() {
        let transport = PagedTransport::new(25);
        let client = FlightClient::new(transport.clone(), &config(10));

        let records = client.flights(&historical()).await.unwrap();
        assert_eq!(records.len(), 25);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);

        let again = client.flights(&historical()).await.unwrap();
        assert!(Arc::ptr_eq(&records, &again));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[2]["offset"], "20");
        assert_eq!(requests[0]["flight_date"], "2024-03-04");
        assert_eq!(requests[0]["dep_iata"], "JFK");
    }

    #[tokio::test]
    async fn test_max_pages_truncates() {
        let transport = PagedTransport::new(100);
        let mut config = config(10);
        config.pagination.max_pages = Some(2);
        let client = FlightClient::new(transport.clone(), &config);

        let records = client.flights(&historical()).await.unwrap();
        assert_eq!(records.len(), 20);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_equivalent_queries_share_a_key() {
        let a = FlightQuery::Scheduled {
            airport_iata: "JFK".to_string(),
            direction: Direction::Departure,
            airline_iata: None,
        };
        let b = FlightQuery::Scheduled {
            airport_iata: " JFK ".to_string(),
            direction: Direction::Departure,
            airline_iata: None,
        };
        assert_eq!(a.cache_key().endpoint(), "timetable");
        assert_eq!(a.params()["type"], "departure");
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.params(), b.params());
        assert_eq!(b.params()["iataCode"], "JFK");

        let padded = FlightQuery::ByNumber {
            flight_iata: "AA100 ".to_string(),
            date: None,
        };
        let exact = FlightQuery::ByNumber {
            flight_iata: "AA100".to_string(),
            date: None,
        };
        assert_eq!(padded.params(), exact.params());
        assert_eq!(padded.cache_key(), exact.cache_key());
    }

    #[tokio::test]
    async fn test_request_sends_trimmed_filters() {
        let transport = PagedTransport::new(1);
        let client = FlightClient::new(transport.clone(), &config(10));
        let query = FlightQuery::RealTime {
            filters: FlightFilters {
                dep_iata: Some(" JFK ".to_string()),
                arr_iata: Some("  ".to_string()),
                ..FlightFilters::default()
            },
        };

        client.flights(&query).await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0]["dep_iata"], "JFK");
        assert!(!requests[0].contains_key("arr_iata"));
    }

    #[test]
    fn test_delayed_query_params() {
        let query = FlightQuery::Delayed {
            airport_iata: "LHR".to_string(),
            direction: Direction::Arrival,
            min_delay_minutes: 30,
        };
        let params = query.params();
        assert_eq!(params["min_delay_arr"], "30");
        assert_eq!(query.source(), RecordSource::Delayed);
        assert!(query.date().is_none());
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn fetch(&self, _endpoint: Endpoint, _params: &QueryParams) -> FlightResult<RawResponse> {
            Err(FlightError::upstream(Some(500), "boom"))
        }
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let client = FlightClient::new(Arc::new(FailingTransport), &Config::default());
        assert!(client.flights(&historical()).await.is_err());
        assert!(client.cache().get(&historical().cache_key()).await.is_none());
    }

    #[tokio::test]
    async fn test_client_as_flight_source() {
        let transport = PagedTransport::new(3);
        let client = FlightClient::new(transport.clone(), &config(10));
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        let report = client.track_range("AA1", date, date).await.unwrap();
        assert_eq!(report.days.len(), 1);
        assert_eq!(report.statistics.total_flights, 3);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0]["flight_iata"], "AA1");
        assert_eq!(requests[0]["flight_date"], "2024-03-04");
    }
}
