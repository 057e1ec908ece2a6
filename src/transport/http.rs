use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{FlightError, FlightResult};
use crate::transport::{api_error_message, Endpoint, QueryParams, RawResponse, Transport};

/// `Transport` over HTTPS GET requests. One request per call, no retries.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    access_key: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> FlightResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("flightlens/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| FlightError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_key: config.access_key.clone(),
        })
    }

    fn url(&self, endpoint: Endpoint, params: &QueryParams) -> FlightResult<Url> {
        let mut query: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if let Some(key) = self.access_key.as_deref() {
            query.push(("access_key", key));
        }

        Url::parse_with_params(&format!("{}/{}", self.base_url, endpoint), query)
            .map_err(|e| FlightError::Config(format!("invalid API base URL {}: {e}", self.base_url)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, endpoint: Endpoint, params: &QueryParams) -> FlightResult<RawResponse> {
        let url = self.url(endpoint, params)?;
        let started = Instant::now();

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        debug!(
            %endpoint,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = text.len(),
            "upstream request finished"
        );

        let body: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = body
                .as_ref()
                .and_then(api_error_message)
                .unwrap_or_else(|| text.chars().take(200).collect());
            return Err(FlightError::upstream(Some(status.as_u16()), message));
        }

        match body {
            Some(body) => RawResponse::from_body(body),
            None => Err(FlightError::Decode(format!(
                "{endpoint} returned a non-JSON body"
            ))),
        }
    }
}
