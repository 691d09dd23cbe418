//! Redis cache backend.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use skycache_core::{CacheKey, WeatherResult};

use super::{CacheError, CacheStore};

/// Stores results as JSON strings with a server-side TTL, so expiry is
/// enforced by Redis itself.
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool,
    timeout: Duration,
}

impl RedisCacheStore {
    /// `timeout` bounds every round trip, connection checkout included.
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    fn healthy_detail(&self) -> &'static str {
        "connected and responsive"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<WeatherResult>, CacheError> {
        let raw: Option<String> = self
            .bounded(async {
                let mut conn = self.connection().await?;
                conn.get(key.as_str())
                    .await
                    .map_err(|e| CacheError::Unavailable(e.to_string()))
            })
            .await?;

        match raw {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| CacheError::Corrupt(format!("{key}: {e}"))),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &WeatherResult,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let text = serde_json::to_string(value).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        // SET EX rejects 0; sub-second TTLs round up
        let ttl_secs = ttl.as_secs().max(1);

        self.bounded(async {
            let mut conn = self.connection().await?;
            conn.set_ex::<_, _, ()>(key.as_str(), text, ttl_secs)
                .await
                .map_err(|e| CacheError::Unavailable(e.to_string()))
        })
        .await?;

        tracing::debug!(key = %key, ttl_secs, "cache set (redis)");
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let _pong: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::Unavailable(e.to_string()))?;
            Ok(())
        })
        .await
    }
}
