use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use deadpool_redis::Pool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::admission::{RateLimiter, RedisWindowStore};
use crate::cache::{CacheStore, LocalCacheStore, RedisCacheStore};
use crate::config::AppConfig;
use crate::health::HealthReporter;
use crate::provider::{VisualCrossingProvider, WeatherProvider};
use crate::weather::WeatherService;
use crate::{handlers, middleware as app_middleware};

/// Shared per-process state. Everything behind it is injected, so tests can
/// swap any backend.
#[derive(Clone)]
pub struct AppState {
    pub weather: Arc<WeatherService>,
    pub health: Arc<HealthReporter>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        provider: Arc<dyn WeatherProvider>,
        limiter: Arc<RateLimiter>,
        ttl: Duration,
    ) -> Self {
        Self {
            weather: Arc::new(WeatherService::new(cache.clone(), provider, ttl)),
            health: Arc::new(HealthReporter::new(cache, limiter.clone())),
            limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let weather = Router::new()
        .route("/weather", get(handlers::get_weather))
        .route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            app_middleware::rate_limit,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .merge(weather)
        .with_state(state)
        .layer(middleware::from_fn(app_middleware::track_metrics))
        // Outermost first: request id -> trace -> cors
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            let req_id = req
                                .extensions()
                                .get::<axum::http::HeaderValue>()
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("")
                                .to_string();
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                                http.status_code = tracing::field::Empty,
                                request_id = %req_id
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CorsLayer::permissive()),
        )
}

/// Wire the production backends from configuration.
///
/// The Redis pool is returned so the caller can close it on shutdown.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<(AppState, Option<Pool>)> {
    let provider =
        VisualCrossingProvider::new(&cfg.provider).context("invalid provider configuration")?;
    let pool = crate::create_redis_pool(&cfg.redis).await;

    let cache: Arc<dyn CacheStore> = match &pool {
        Some(pool) => Arc::new(RedisCacheStore::new(pool.clone(), cfg.redis.timeout())),
        None => Arc::new(LocalCacheStore::new()),
    };

    let limiter = match &pool {
        Some(pool) if cfg.rate_limit.enabled => RateLimiter::new(
            Arc::new(RedisWindowStore::new(pool.clone(), cfg.redis.timeout())),
            cfg.rate_limit.capacity,
            cfg.rate_limit.period(),
        ),
        _ => {
            tracing::info!("rate limiting disabled, all requests will be admitted");
            RateLimiter::disabled()
        }
    };

    let state = AppState::new(cache, Arc::new(provider), Arc::new(limiter), cfg.cache_ttl());
    Ok((state, pool))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<SkycacheServer> {
        let (state, pool) = build_state(&self.config).await?;
        Ok(SkycacheServer {
            addr: self.addr,
            app: build_router(state),
            pool,
        })
    }
}

pub struct SkycacheServer {
    addr: SocketAddr,
    app: Router,
    pool: Option<Pool>,
}

impl SkycacheServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let app = self.app.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(pool) = self.pool {
            pool.close();
            tracing::info!("redis pool closed");
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
