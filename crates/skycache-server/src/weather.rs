//! Cache-augmented weather fetch.

use std::sync::Arc;
use std::time::Duration;

use skycache_api::ApiError;
use skycache_core::{CityName, WeatherResult, normalize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::cache::CacheStore;
use crate::provider::{ProviderError, WeatherProvider};

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Provider(ProviderError),
}

impl From<ProviderError> for WeatherError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(city) => WeatherError::NotFound(city),
            other => WeatherError::Provider(other),
        }
    }
}

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::NotFound(_) => ApiError::not_found(err.to_string()),
            WeatherError::Provider(e) => ApiError::service_unavailable(e.to_string()),
        }
    }
}

/// Read-through cache in front of a [`WeatherProvider`].
///
/// Cache failures never fail a request: a read error is treated as a miss
/// and a write error is logged and dropped.
pub struct WeatherService {
    cache: Arc<dyn CacheStore>,
    provider: Arc<dyn WeatherProvider>,
    ttl: Duration,
}

impl WeatherService {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        provider: Arc<dyn WeatherProvider>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            provider,
            ttl,
        }
    }

    #[instrument(skip(self), fields(city = %city))]
    pub async fn fetch_weather(&self, city: &CityName) -> Result<WeatherResult, WeatherError> {
        let key = city.cache_key();
        let backend = self.cache.backend_name();

        match self.cache.get(&key).await {
            Ok(Some(hit)) => {
                debug!(key = %key, backend, "cache hit");
                crate::metrics::record_cache_hit(backend);
                return Ok(hit);
            }
            Ok(None) => {
                debug!(key = %key, backend, "cache miss");
                crate::metrics::record_cache_miss(backend);
            }
            Err(e) => {
                warn!(key = %key, backend, error = %e, "cache read failed, bypassing cache");
                crate::metrics::record_cache_error(backend, "get");
            }
        }

        let raw = self.provider.fetch_today(city).await?;
        let result = normalize(&raw).map_err(|e| ProviderError::InvalidBody(e.to_string()))?;

        if let Err(e) = self.cache.set(&key, &result, self.ttl).await {
            warn!(key = %key, backend, error = %e, "cache write failed, result not cached");
            crate::metrics::record_cache_error(backend, "set");
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, LocalCacheStore};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use skycache_core::CacheKey;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Payload(Value),
        NotFound,
        Status(u16),
        Timeout,
    }

    struct StubProvider {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn fetch_today(&self, city: &CityName) -> Result<Value, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Payload(v) => Ok(v.clone()),
                Reply::NotFound => Err(ProviderError::NotFound(city.to_string())),
                Reply::Status(code) => Err(ProviderError::Status(*code)),
                Reply::Timeout => Err(ProviderError::Timeout),
            }
        }
    }

    /// Cache whose every operation fails.
    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        fn backend_name(&self) -> &'static str {
            "broken"
        }
        fn healthy_detail(&self) -> &'static str {
            "never healthy"
        }
        async fn get(&self, _key: &CacheKey) -> Result<Option<WeatherResult>, CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        async fn set(
            &self,
            _key: &CacheKey,
            _value: &WeatherResult,
            _ttl: Duration,
        ) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        async fn ping(&self) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
    }

    fn london_payload() -> Value {
        json!({
            "resolvedAddress": "London",
            "timezone": "Europe/London",
            "days": [{
                "datetime": "2026-01-17",
                "temp": 7.9,
                "tempmax": 10.0,
                "tempmin": 3.8,
                "feelslike": 5.4,
                "conditions": "Partially cloudy"
            }]
        })
    }

    fn service(cache: Arc<dyn CacheStore>, provider: Arc<StubProvider>) -> WeatherService {
        WeatherService::new(cache, provider, Duration::from_secs(60))
    }

    fn city(name: &str) -> CityName {
        CityName::parse(name).unwrap()
    }

    #[tokio::test]
    async fn london_scenario_is_normalized() {
        let provider = StubProvider::new(Reply::Payload(london_payload()));
        let svc = service(Arc::new(LocalCacheStore::new()), provider.clone());

        let result = svc.fetch_weather(&city("London")).await.unwrap();
        assert_eq!(result.city, "London");
        assert_eq!(result.date.as_deref(), Some("2026-01-17"));
        assert_eq!(result.timezone.as_deref(), Some("Europe/London"));
        assert_eq!(result.temperature.average, Some(7.9));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn second_call_within_ttl_is_served_from_cache() {
        let provider = StubProvider::new(Reply::Payload(london_payload()));
        let svc = service(Arc::new(LocalCacheStore::new()), provider.clone());

        let first = svc.fetch_weather(&city("London")).await.unwrap();
        let second = svc.fetch_weather(&city("London")).await.unwrap();

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn equivalent_city_spellings_share_an_entry() {
        let provider = StubProvider::new(Reply::Payload(london_payload()));
        let svc = service(Arc::new(LocalCacheStore::new()), provider.clone());

        svc.fetch_weather(&city("London")).await.unwrap();
        svc.fetch_weather(&city("  london  ")).await.unwrap();
        svc.fetch_weather(&city("LONDON")).await.unwrap();
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn not_found_is_classified_with_city_name() {
        let provider = StubProvider::new(Reply::NotFound);
        let svc = service(Arc::new(LocalCacheStore::new()), provider);

        let err = svc.fetch_weather(&city("Nonexistentville")).await.unwrap_err();
        assert!(matches!(&err, WeatherError::NotFound(c) if c == "Nonexistentville"));

        let api: ApiError = err.into();
        assert_eq!(api.status_code(), StatusCode::NOT_FOUND);
        assert!(api.to_string().contains("Nonexistentville"));
    }

    #[tokio::test]
    async fn upstream_failures_map_to_service_unavailable() {
        for reply in [Reply::Status(500), Reply::Status(401), Reply::Timeout] {
            let provider = StubProvider::new(reply);
            let svc = service(Arc::new(LocalCacheStore::new()), provider.clone());
            let err = svc.fetch_weather(&city("London")).await.unwrap_err();
            assert!(matches!(err, WeatherError::Provider(_)));
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(provider.calls(), 1, "no retries");
        }
    }

    #[tokio::test]
    async fn timeout_leaves_cache_untouched() {
        let cache = Arc::new(LocalCacheStore::new());
        let provider = StubProvider::new(Reply::Timeout);
        let svc = service(cache.clone(), provider);

        let err = svc.fetch_weather(&city("London")).await.unwrap_err();
        assert!(matches!(err, WeatherError::Provider(ProviderError::Timeout)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn cache_outage_bypasses_to_provider() {
        let provider = StubProvider::new(Reply::Payload(london_payload()));
        let svc = service(Arc::new(BrokenCache), provider.clone());

        let result = svc.fetch_weather(&city("London")).await.unwrap();
        assert_eq!(result.city, "London");
        svc.fetch_weather(&city("London")).await.unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn malformed_payload_is_a_provider_error() {
        let provider = StubProvider::new(Reply::Payload(json!(null)));
        let cache = Arc::new(LocalCacheStore::new());
        let svc = service(cache.clone(), provider);

        let err = svc.fetch_weather(&city("London")).await.unwrap_err();
        assert!(matches!(
            err,
            WeatherError::Provider(ProviderError::InvalidBody(_))
        ));
        assert!(cache.is_empty());
    }
}
