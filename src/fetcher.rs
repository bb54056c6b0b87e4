//! HTTP metric fetcher
//!
//! Issues one GET per attempt, decodes the JSON body and hands it to the
//! spec's extractor. Failures are retried with a fixed delay; once attempts
//! run out the reading degrades to unavailable.

use crate::{
    constants::{
        ACCEPT, ACCEPT_LANGUAGE, MAX_RETRY_ATTEMPTS, REQUEST_TIMEOUT_SECS, RETRY_DELAY_MS,
        USER_AGENT,
    },
    error::FetchError,
    metric::MetricSpec,
    metrics::{FetchMetrics, MetricsCollector},
    provider::MetricProvider,
    types::{is_publishable, MetricResult},
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Retry and timeout settings for the fetcher
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchSettings {
    /// Total attempts per metric (at least one)
    pub retries: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            retries: MAX_RETRY_ATTEMPTS,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Reads metrics over HTTP
pub struct MetricFetcher {
    client: Client,
    settings: FetchSettings,
    metrics: Arc<MetricsCollector>,
}

impl MetricFetcher {
    /// Creates a new fetcher
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));

        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(FetchError::NetworkError)?;

        Ok(Self {
            client,
            settings: FetchSettings {
                retries: settings.retries.max(1),
                ..settings
            },
            metrics: Arc::new(MetricsCollector::new("http")),
        })
    }

    /// Effective settings
    pub fn settings(&self) -> FetchSettings {
        self.settings
    }

    /// Gets fetch latency and success metrics
    pub async fn get_fetch_metrics(&self) -> FetchMetrics {
        self.metrics.get_metrics().await
    }

    /// Performs a single attempt
    pub async fn fetch_once(&self, spec: &MetricSpec) -> Result<f64, FetchError> {
        let mut request = self.client.get(&spec.url).query(&spec.query);
        if spec.cache_bust {
            request = request.query(&[("t", Utc::now().timestamp().to_string())]);
        }

        let response = request.send().await.map_err(FetchError::from_reqwest)?;

        // Check for rate limiting
        if response.status().as_u16() == 429 {
            return Err(FetchError::RateLimitExceeded);
        }

        // Check for other errors
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(FetchError::HttpStatus {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        let response_text = response.text().await.map_err(FetchError::from_reqwest)?;

        let body: serde_json::Value = serde_json::from_str(&response_text).map_err(|e| {
            FetchError::InvalidResponse(format!(
                "Failed to parse {} response: {}. Response: {}",
                spec.name, e, response_text
            ))
        })?;

        let value = spec.extractor.extract(&body)?;
        if !is_publishable(value) {
            return Err(FetchError::InvalidResponse(format!(
                "{} is not a finite non-negative number: {}",
                spec.name, value
            )));
        }

        Ok(value)
    }
}

#[async_trait]
impl MetricProvider for MetricFetcher {
    async fn fetch(&self, spec: &MetricSpec) -> MetricResult {
        let retries = self.settings.retries;

        for attempt in 1..=retries {
            let start = Instant::now();
            match self.fetch_once(spec).await {
                Ok(value) => {
                    self.metrics.record_attempt(start.elapsed(), true).await;
                    tracing::debug!(
                        metric = %spec.name,
                        endpoint = %spec.url,
                        attempt,
                        value,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Fetched metric"
                    );
                    return MetricResult::new(value, spec.unit);
                }
                Err(e) => {
                    self.metrics.record_attempt(start.elapsed(), false).await;
                    tracing::warn!(
                        metric = %spec.name,
                        endpoint = %spec.url,
                        attempt,
                        max_attempts = retries,
                        transient = e.is_transient(),
                        error = %e,
                        "Failed to fetch metric"
                    );

                    if attempt < retries {
                        sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }

        tracing::error!(
            metric = %spec.name,
            endpoint = %spec.url,
            attempts = retries,
            "Metric unavailable after all attempts"
        );
        MetricResult::unavailable(spec.unit)
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Extractor;
    use crate::types::Unit;
    use httpmock::prelude::*;
    use serde_json::json;

    fn fast_settings(retries: u32) -> FetchSettings {
        FetchSettings {
            retries,
            retry_delay: Duration::ZERO,
            timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_fetch_floor_price() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/krc721/NACHO")
                    .header_exists("user-agent")
                    .header("accept", ACCEPT);
                then.status(200).json_body(json!({ "price": 1234.5678 }));
            })
            .await;

        let fetcher = MetricFetcher::new(fast_settings(3)).unwrap();
        let result = fetcher
            .fetch(&MetricSpec::floor_price(server.url("/krc721/NACHO"), "/price"))
            .await;

        assert_eq!(result.value, Some(1234.5678));
        assert_eq!(result.unit, Unit::KAS);
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_fetch_spot_price_sends_query() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/market/trades")
                    .query_param("symbol", "NACHO_USDT")
                    .query_param("limit", "10");
                then.status(200).json_body(json!({
                    "result": true,
                    "data": { "trades": [
                        { "price": "1.0000001", "timestamp": 1 },
                        { "price": "2.0000002", "timestamp": 2 }
                    ]}
                }));
            })
            .await;

        let fetcher = MetricFetcher::new(fast_settings(3)).unwrap();
        let spec = MetricSpec::spot_price(server.url("/api/v1/market/trades"), "NACHO_USDT", 10);
        let result = fetcher.fetch(&spec).await;

        assert_eq!(result.value.map(|v| format!("{:.7}", v)).as_deref(), Some("2.0000002"));
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_cache_bust_parameter() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/marketplace.json").query_param_exists("t");
                then.status(200).json_body(json!({ "KASPER": { "floor_price": 42 } }));
            })
            .await;

        let fetcher = MetricFetcher::new(fast_settings(1)).unwrap();
        let spec = MetricSpec::new(
            "kasper_floor",
            server.url("/marketplace.json"),
            Extractor::Field("/KASPER/floor_price".into()),
            Unit::KAS,
        )
        .with_cache_bust();

        assert_eq!(fetcher.fetch(&spec).await.value, Some(42.0));
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_exhausted_retries_make_exactly_retries_calls() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/krc721/NACHO");
                then.status(503).body("unavailable");
            })
            .await;

        let fetcher = MetricFetcher::new(fast_settings(3)).unwrap();
        let result = fetcher
            .fetch(&MetricSpec::floor_price(server.url("/krc721/NACHO"), "/price"))
            .await;

        assert_eq!(result.value, None);
        mock.assert_hits_async(3).await;

        let metrics = fetcher.get_fetch_metrics().await;
        assert_eq!(metrics.total_attempts, 3);
        assert_eq!(metrics.failed_attempts, 3);
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_retried_then_unavailable() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/krc721/NACHO");
                then.status(200).json_body(json!({ "floor": 1.0 }));
            })
            .await;

        let fetcher = MetricFetcher::new(fast_settings(2)).unwrap();
        let result = fetcher
            .fetch(&MetricSpec::floor_price(server.url("/krc721/NACHO"), "/price"))
            .await;

        assert!(!result.is_available());
        mock.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn test_negative_value_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/krc721/NACHO");
                then.status(200).json_body(json!({ "price": -5.0 }));
            })
            .await;

        let fetcher = MetricFetcher::new(fast_settings(1)).unwrap();
        let spec = MetricSpec::floor_price(server.url("/krc721/NACHO"), "/price");
        let err = fetcher.fetch_once(&spec).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/krc721/NACHO");
                then.status(429);
            })
            .await;

        let fetcher = MetricFetcher::new(fast_settings(1)).unwrap();
        let spec = MetricSpec::floor_price(server.url("/krc721/NACHO"), "/price");
        let err = fetcher.fetch_once(&spec).await.unwrap_err();
        assert!(matches!(err, FetchError::RateLimitExceeded));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_slow_upstream_maps_to_timeout() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/krc721/NACHO");
                then.status(200)
                    .json_body(json!({ "price": 1.0 }))
                    .delay(Duration::from_millis(500));
            })
            .await;

        let fetcher = MetricFetcher::new(FetchSettings {
            retries: 1,
            retry_delay: Duration::ZERO,
            timeout: Duration::from_millis(100),
        })
        .unwrap();
        let spec = MetricSpec::floor_price(server.url("/krc721/NACHO"), "/price");
        let err = fetcher.fetch_once(&spec).await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_fixed_delay_between_attempts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/krc721/NACHO");
                then.status(503);
            })
            .await;

        let retry_delay = Duration::from_millis(60);
        let fetcher = MetricFetcher::new(FetchSettings {
            retries: 3,
            retry_delay,
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let start = Instant::now();
        let result = fetcher
            .fetch(&MetricSpec::floor_price(server.url("/krc721/NACHO"), "/price"))
            .await;

        // Two pauses between three attempts, none after the last
        assert!(start.elapsed() >= retry_delay * 2);
        assert!(!result.is_available());
        mock.assert_hits_async(3).await;
    }

    #[test]
    fn test_default_settings() {
        let settings = FetchSettings::default();
        assert_eq!(settings.retries, 3);
        assert_eq!(settings.retry_delay, Duration::from_secs(2));
        assert_eq!(settings.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_zero_retries_clamped_to_one_attempt() {
        let fetcher = MetricFetcher::new(fast_settings(0)).unwrap();
        assert_eq!(fetcher.settings().retries, 1);
    }
}
