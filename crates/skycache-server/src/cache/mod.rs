//! Weather result cache.
//!
//! ## Backends
//!
//! - **Redis**: shared across instances, entries expire via `SET EX`
//! - **Local (DashMap)**: per-instance fallback when Redis is disabled
//!
//! ## Failure semantics
//!
//! A backend that cannot be reached reports [`CacheError::Unavailable`] or
//! [`CacheError::Timeout`]; it never disguises the failure as a miss. The
//! fetch path decides what to do with it.

pub mod local;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use skycache_core::{CacheKey, WeatherResult};
use thiserror::Error;

pub use self::local::{CacheEntry, LocalCacheStore};
pub use self::redis::RedisCacheStore;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache backend timed out after {0:?}")]
    Timeout(Duration),

    /// A stored value could not be decoded or a value could not be encoded.
    #[error("corrupt cache value: {0}")]
    Corrupt(String),
}

/// Key-value store with expiry for normalized weather results.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short label used in logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Health detail reported when [`CacheStore::ping`] succeeds.
    fn healthy_detail(&self) -> &'static str;

    /// Returns `Ok(None)` for missing or expired entries.
    async fn get(&self, key: &CacheKey) -> Result<Option<WeatherResult>, CacheError>;

    /// Store `value` under `key`, replacing any existing entry.
    async fn set(
        &self,
        key: &CacheKey,
        value: &WeatherResult,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Lightweight liveness probe.
    async fn ping(&self) -> Result<(), CacheError>;
}
