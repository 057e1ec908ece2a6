use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::analytics::{CancelledPolicy, CostRates};
use crate::records::DelayThresholds;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub pagination: PaginationConfig,
    pub analytics: AnalyticsConfig,
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Passed through to the upstream API as the `access_key` query parameter
    #[serde(default)]
    pub access_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub page_size: usize,
    /// Upper bound on pages fetched per logical query, `None` means unbounded
    #[serde(default)]
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub on_time_threshold_minutes: i64,
    pub cancelled_policy: CancelledPolicy,
    pub min_group_size: usize,
    #[serde(default)]
    pub delay_thresholds: DelayThresholds,
    #[serde(default)]
    pub cost_rates: CostRates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub max_concurrency: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.aviationstack.com/v1".to_string(),
            access_key: None,
            timeout_secs: 30,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl_secs: 300,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: None,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            on_time_threshold_minutes: 15,
            cancelled_policy: CancelledPolicy::CountAsLate,
            min_group_size: 1,
            delay_thresholds: DelayThresholds::default(),
            cost_rates: CostRates::default(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_defaults = ApiConfig::default();
        let base_url =
            std::env::var("FLIGHTLENS_API_BASE_URL").unwrap_or(api_defaults.base_url);
        let access_key = std::env::var("FLIGHTLENS_API_ACCESS_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let timeout_secs = env_or("FLIGHTLENS_API_TIMEOUT_SECS", api_defaults.timeout_secs)?;

        let cache_defaults = CacheConfig::default();
        let max_entries = env_or("FLIGHTLENS_CACHE_MAX_ENTRIES", cache_defaults.max_entries)?;
        let ttl_secs = env_or("FLIGHTLENS_CACHE_TTL_SECS", cache_defaults.ttl_secs)?;

        let page_size = env_or("FLIGHTLENS_PAGE_SIZE", PaginationConfig::default().page_size)?;
        if page_size == 0 {
            anyhow::bail!("FLIGHTLENS_PAGE_SIZE must be greater than zero");
        }
        let max_pages = match std::env::var("FLIGHTLENS_MAX_PAGES") {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<usize>()
                    .with_context(|| format!("FLIGHTLENS_MAX_PAGES has an invalid value: {raw}"))?,
            ),
            Err(_) => None,
        };

        let analytics_defaults = AnalyticsConfig::default();
        let on_time_threshold_minutes = env_or(
            "FLIGHTLENS_ON_TIME_THRESHOLD_MINUTES",
            analytics_defaults.on_time_threshold_minutes,
        )?;
        let exclude_cancelled = std::env::var("FLIGHTLENS_EXCLUDE_CANCELLED")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);
        let min_group_size = env_or(
            "FLIGHTLENS_MIN_GROUP_SIZE",
            analytics_defaults.min_group_size,
        )?;

        let max_concurrency = env_or(
            "FLIGHTLENS_TRACKING_CONCURRENCY",
            TrackingConfig::default().max_concurrency,
        )?;

        Ok(Config {
            api: ApiConfig {
                base_url,
                access_key,
                timeout_secs,
            },
            cache: CacheConfig {
                max_entries,
                ttl_secs,
            },
            pagination: PaginationConfig {
                page_size,
                max_pages,
            },
            analytics: AnalyticsConfig {
                on_time_threshold_minutes,
                cancelled_policy: if exclude_cancelled {
                    CancelledPolicy::Exclude
                } else {
                    CancelledPolicy::CountAsLate
                },
                min_group_size,
                ..analytics_defaults
            },
            tracking: TrackingConfig {
                max_concurrency: max_concurrency.max(1),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_parses_and_defaults() {
        std::env::set_var("FLIGHTLENS_TEST_ENV_OR_VALUE", " 42 ");
        assert_eq!(env_or("FLIGHTLENS_TEST_ENV_OR_VALUE", 7u64).unwrap(), 42);
        assert_eq!(env_or("FLIGHTLENS_TEST_ENV_OR_UNSET", 7u64).unwrap(), 7);

        std::env::set_var("FLIGHTLENS_TEST_ENV_OR_BAD", "soon");
        let err = env_or("FLIGHTLENS_TEST_ENV_OR_BAD", 7u64).unwrap_err();
        assert!(err.to_string().contains("FLIGHTLENS_TEST_ENV_OR_BAD"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.pagination.page_size, 100);
        assert_eq!(config.analytics.on_time_threshold_minutes, 15);
        assert_eq!(config.analytics.cancelled_policy, CancelledPolicy::CountAsLate);
        assert_eq!(config.tracking.max_concurrency, 4);
        assert!(config.api.access_key.is_none());
    }
}
