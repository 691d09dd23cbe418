//! In-process cache backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use skycache_core::{CacheKey, WeatherResult};

use super::{CacheError, CacheStore};

/// A cached result with its expiry deadline. Entries are replaced
/// wholesale on write, never updated in place.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub value: WeatherResult,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(value: WeatherResult, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// DashMap-backed store used when Redis is disabled or misconfigured.
#[derive(Clone, Default)]
pub struct LocalCacheStore {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl LocalCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until next read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    fn healthy_detail(&self) -> &'static str {
        "local in-memory cache"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<WeatherResult>, CacheError> {
        if let Some(entry) = self.entries.get(key.as_str()) {
            if !entry.is_expired() {
                return Ok(Some(entry.value.clone()));
            }
            // Remove expired entry
            drop(entry);
            self.entries
                .remove_if(key.as_str(), |_, entry| entry.is_expired());
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &WeatherResult,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.entries
            .insert(key.as_str().to_string(), CacheEntry::new(value.clone(), ttl));
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skycache_core::{Precipitation, Sun, Temperature, Wind};

    fn result(city: &str) -> WeatherResult {
        WeatherResult {
            city: city.to_string(),
            date: Some("2026-01-17".into()),
            timezone: Some("Europe/London".into()),
            summary: None,
            conditions: None,
            temperature: Temperature {
                average: Some(7.9),
                ..Default::default()
            },
            precipitation: Precipitation::default(),
            wind: Wind::default(),
            sun: Sun::default(),
            current: None,
        }
    }

    #[tokio::test]
    async fn get_set_roundtrip() {
        let cache = LocalCacheStore::new();
        let key = CacheKey::for_city("London");

        assert_eq!(cache.get(&key).await.unwrap(), None);
        cache
            .set(&key, &result("London"), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(result("London")));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_absent_and_evicted() {
        let cache = LocalCacheStore::new();
        let key = CacheKey::for_city("Oslo");
        cache
            .set(&key, &result("Oslo"), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(cache.get(&key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get(&key).await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn set_replaces_existing_entry() {
        let cache = LocalCacheStore::new();
        let key = CacheKey::for_city("Rome");
        cache
            .set(&key, &result("Rome"), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set(&key, &result("Roma"), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await.unwrap().unwrap().city, "Roma");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn ping_always_succeeds() {
        assert!(LocalCacheStore::new().ping().await.is_ok());
    }
}
