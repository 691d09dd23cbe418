pub mod admission;
pub mod cache;
pub mod config;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod provider;
pub mod server;
pub mod weather;

pub use admission::{Admission, LimiterStatus, RateLimiter, RedisWindowStore, WindowStore};
pub use cache::{CacheError, CacheStore, LocalCacheStore, RedisCacheStore};
pub use config::{
    AppConfig, CacheConfig, ProviderConfig, RateLimitConfig, RedisConfig, ServerConfig,
};
pub use health::{HealthReporter, HealthSnapshot};
pub use observability::init_tracing;
pub use provider::{ProviderError, VisualCrossingProvider, WeatherProvider};
pub use server::{AppState, ServerBuilder, SkycacheServer, build_router, build_state};
pub use weather::{WeatherError, WeatherService};

/// Create the shared Redis pool used by the cache and the rate limiter.
///
/// ## Degradation
///
/// - **Redis disabled** or **unusable URL**: returns `None`; the caller
///   uses the local cache and disables rate limiting.
/// - **Redis unreachable at startup**: the pool is still returned. Cache
///   reads bypass to the provider and the limiter fails open until a
///   connection succeeds.
pub async fn create_redis_pool(config: &RedisConfig) -> Option<deadpool_redis::Pool> {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return None;
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let timeout = config.timeout();
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return None;
        }
    };

    // Startup probe only; an outage here is not fatal
    match pool.get().await {
        Ok(_) => tracing::info!("Connected to Redis"),
        Err(e) => tracing::warn!(
            error = %e,
            "Redis not reachable at startup; cache bypassed and rate limiting open until it is"
        ),
    }

    Some(pool)
}
