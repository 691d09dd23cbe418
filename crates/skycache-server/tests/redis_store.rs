//! Integration tests for the Redis-backed cache and rate-limit windows.
//!
//! Tests use testcontainers to spin up a real Redis instance.

use std::sync::Arc;
use std::time::Duration;

use skycache_core::{CityName, Temperature, WeatherResult};
use skycache_server::admission::{Admission, LimiterStatus, WindowOutcome};
use skycache_server::health::OverallStatus;
use skycache_server::{
    CacheError, CacheStore, HealthReporter, RateLimiter, RedisCacheStore, RedisConfig,
    RedisWindowStore, WindowStore, create_redis_pool,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

fn redis_config(url: String) -> RedisConfig {
    RedisConfig {
        enabled: true,
        url,
        pool_size: 4,
        timeout_ms: 1000,
    }
}

async fn live_pool() -> (deadpool_redis::Pool, RedisConfig) {
    let cfg = redis_config(get_redis_url().await);
    let pool = create_redis_pool(&cfg).await.expect("pool");
    (pool, cfg)
}

fn sample(city: &str) -> WeatherResult {
    WeatherResult {
        city: city.to_string(),
        date: Some("2026-01-17".into()),
        timezone: Some("Europe/London".into()),
        temperature: Temperature {
            average: Some(7.9),
            high: Some(10.0),
            low: Some(3.8),
            feels_like: Some(5.4),
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_redis_cache_set_get() {
    let (pool, cfg) = live_pool().await;
    let cache = RedisCacheStore::new(pool, cfg.timeout());
    let key = CityName::parse("Reykjavik").unwrap().cache_key();

    assert_eq!(cache.get(&key).await.unwrap(), None);
    cache
        .set(&key, &sample("Reykjavik"), Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(cache.get(&key).await.unwrap(), Some(sample("Reykjavik")));
    cache.ping().await.unwrap();
}

#[tokio::test]
async fn test_redis_cache_expiration() {
    let (pool, cfg) = live_pool().await;
    let cache = RedisCacheStore::new(pool, cfg.timeout());
    let key = CityName::parse("Tromso").unwrap().cache_key();

    cache
        .set(&key, &sample("Tromso"), Duration::from_secs(1))
        .await
        .unwrap();
    assert!(cache.get(&key).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(cache.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_corrupt_entry_is_reported() {
    let (pool, cfg) = live_pool().await;
    let cache = RedisCacheStore::new(pool.clone(), cfg.timeout());
    let key = CityName::parse("Corruptton").unwrap().cache_key();

    let mut conn = pool.get().await.unwrap();
    let _: () = redis::cmd("SET")
        .arg(key.as_str())
        .arg("not json")
        .query_async(&mut conn)
        .await
        .unwrap();

    assert!(matches!(cache.get(&key).await, Err(CacheError::Corrupt(_))));
}

#[tokio::test]
async fn test_window_store_counts_and_denies() {
    let (pool, cfg) = live_pool().await;
    let store = RedisWindowStore::new(pool, cfg.timeout());
    assert!(store.is_connected());

    let client = format!("client-{}", uuid::Uuid::new_v4());
    let period = Duration::from_secs(3600);
    for i in 1..=5u32 {
        assert_eq!(
            store.hit(&client, 5, period).await.unwrap(),
            WindowOutcome::Admitted {
                count: i,
                remaining: 5 - i
            }
        );
    }
    match store.hit(&client, 5, period).await.unwrap() {
        WindowOutcome::Exceeded { retry_after } => {
            assert!(retry_after >= Duration::from_secs(1));
            assert!(retry_after <= period);
        }
        other => panic!("expected Exceeded, got {other:?}"),
    }

    // Windows are per client
    let other = format!("client-{}", uuid::Uuid::new_v4());
    assert!(matches!(
        store.hit(&other, 5, period).await.unwrap(),
        WindowOutcome::Admitted { count: 1, .. }
    ));
}

#[tokio::test]
async fn test_limiter_over_redis_denies_sixth_request() {
    let (pool, cfg) = live_pool().await;
    let limiter = RateLimiter::new(
        Arc::new(RedisWindowStore::new(pool, cfg.timeout())),
        5,
        Duration::from_secs(3600),
    );
    assert_eq!(limiter.status(), LimiterStatus::Enabled);

    let client = format!("client-{}", uuid::Uuid::new_v4());
    for _ in 0..5 {
        assert!(limiter.check(&client).await.is_allowed());
    }
    assert!(matches!(
        limiter.check(&client).await,
        Admission::Denied { .. }
    ));
}

#[tokio::test]
async fn test_health_with_live_redis() {
    let (pool, cfg) = live_pool().await;
    let cache: Arc<dyn CacheStore> = Arc::new(RedisCacheStore::new(pool.clone(), cfg.timeout()));
    let limiter = RateLimiter::new(
        Arc::new(RedisWindowStore::new(pool, cfg.timeout())),
        5,
        Duration::from_secs(60),
    );
    let snapshot = HealthReporter::new(cache, Arc::new(limiter))
        .check_health()
        .await;

    assert_eq!(snapshot.status, OverallStatus::Ok);
    assert_eq!(snapshot.dependencies.redis.status, "healthy");
    assert_eq!(
        snapshot.dependencies.redis.detail.as_deref(),
        Some("connected and responsive")
    );
    assert_eq!(snapshot.dependencies.rate_limiting.status, "enabled");
}

#[tokio::test]
async fn test_unreachable_redis_is_an_error_not_a_hang() {
    let cfg = RedisConfig {
        enabled: true,
        url: "redis://127.0.0.1:1".into(),
        pool_size: 2,
        timeout_ms: 300,
    };
    let pool = create_redis_pool(&cfg).await.expect("pool is created lazily");
    let cache = RedisCacheStore::new(pool.clone(), cfg.timeout());
    let key = CityName::parse("London").unwrap().cache_key();

    let err = cache.get(&key).await.unwrap_err();
    assert!(matches!(
        err,
        CacheError::Unavailable(_) | CacheError::Timeout(_)
    ));
    assert!(cache.ping().await.is_err());

    let store = RedisWindowStore::new(pool, cfg.timeout());
    assert!(!store.is_connected());
    assert!(store.hit("10.0.0.1", 5, Duration::from_secs(60)).await.is_err());
}

#[tokio::test]
async fn test_disabled_redis_yields_no_pool() {
    let mut cfg = redis_config("redis://127.0.0.1:6379".into());
    cfg.enabled = false;
    assert!(create_redis_pool(&cfg).await.is_none());

    let cfg = redis_config("not a url".into());
    assert!(create_redis_pool(&cfg).await.is_none());
}
