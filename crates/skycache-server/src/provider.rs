//! Upstream weather provider client.
//!
//! Every call is a single attempt bounded by the configured timeout. Failures
//! are classified once here and never retried.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use skycache_core::CityName;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ProviderConfig;

/// Upper bound on a provider response body. A one-day timeline is a few KiB.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider does not know the city.
    #[error("{0} not found")]
    NotFound(String),

    /// Any other 4xx/5xx response.
    #[error("Weather api error with status code: {0}")]
    Status(u16),

    #[error("Weather api timed out")]
    Timeout,

    /// DNS, connect, reset and other transport failures.
    #[error("Network error: {0}")]
    Network(String),

    /// Response body is not a usable payload.
    #[error("Weather api returned an invalid body: {0}")]
    InvalidBody(String),

    /// The request could not be built (bad base URL).
    #[error("Invalid provider request: {0}")]
    Request(String),
}

impl ProviderError {
    /// Metric label for this failure.
    pub fn outcome(&self) -> &'static str {
        match self {
            ProviderError::NotFound(_) => "not_found",
            ProviderError::Status(_) => "status",
            ProviderError::Timeout => "timeout",
            ProviderError::Network(_) => "network",
            ProviderError::InvalidBody(_) => "invalid_body",
            ProviderError::Request(_) => "request",
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        // The request URL carries the API key; keep it out of messages
        let err = err.without_url();
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::InvalidBody(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Source of raw weather payloads for a city.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Today's forecast for `city` as the provider's untyped JSON payload.
    async fn fetch_today(&self, city: &CityName) -> Result<Value, ProviderError>;
}

/// Visual Crossing timeline API client.
pub struct VisualCrossingProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    timeout: Duration,
}

impl VisualCrossingProvider {
    pub fn new(cfg: &ProviderConfig) -> Result<Self, ProviderError> {
        let base_url =
            Url::parse(&cfg.base_url).map_err(|e| ProviderError::Request(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::Request(format!(
                "base URL '{}' cannot have path segments",
                cfg.base_url
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout(),
        })
    }

    /// `{base_url}{city}/today?unitGroup=metric&contentType=json&key=...`
    fn today_url(&self, city: &CityName) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::Request("base URL cannot have path segments".into()))?
            .pop_if_empty()
            .push(city.as_str())
            .push("today");
        url.query_pairs_mut()
            .append_pair("unitGroup", "metric")
            .append_pair("contentType", "json")
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn call(&self, city: &CityName) -> Result<Value, ProviderError> {
        let url = self.today_url(city)?;

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(city.to_string()));
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = read_capped(response, MAX_BODY_BYTES).await?;
        serde_json::from_slice(&body).map_err(|e| ProviderError::InvalidBody(e.to_string()))
    }
}

/// Read the body chunk by chunk, rejecting it once it exceeds `limit`.
async fn read_capped(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ProviderError> {
    let too_large = || ProviderError::InvalidBody(format!("body exceeds {limit} bytes"));

    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(ProviderError::from_reqwest)? {
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[async_trait]
impl WeatherProvider for VisualCrossingProvider {
    #[instrument(skip(self), fields(city = %city))]
    async fn fetch_today(&self, city: &CityName) -> Result<Value, ProviderError> {
        let started = Instant::now();
        let result = self.call(city).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => {
                debug!(elapsed_ms = %elapsed.as_millis(), "provider call succeeded");
                crate::metrics::record_provider_request("ok", elapsed);
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms = %elapsed.as_millis(), "provider call failed");
                crate::metrics::record_provider_request(e.outcome(), elapsed);
            }
        }
        result
    }
}
