use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream weather provider
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Redis backing store for the cache and the rate-limit windows
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.provider.api_key.trim().is_empty() {
            return Err("provider.api_key must be set (WEATHER_API_KEY)".into());
        }
        if self.provider.base_url.trim().is_empty() {
            return Err("provider.base_url must be set (WEATHER_BASE_URL)".into());
        }
        url::Url::parse(&self.provider.base_url)
            .map_err(|e| format!("provider.base_url is not a valid URL: {e}"))?;
        if self.provider.timeout_secs == 0 {
            return Err("provider.timeout_secs must be > 0".into());
        }
        if self.cache.ttl_secs == 0 {
            return Err("cache.ttl_secs must be > 0".into());
        }
        if self.rate_limit.capacity == 0 || self.rate_limit.period_secs == 0 {
            return Err("rate_limit.capacity and rate_limit.period_secs must be > 0".into());
        }
        if self.redis.enabled && self.redis.pool_size == 0 {
            return Err("redis.pool_size must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Visual Crossing API key. Required.
    #[serde(default)]
    pub api_key: String,
    /// Timeline endpoint prefix; the city and `/today` are appended to it.
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    /// Upper bound for a single provider call.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_base_url() -> String {
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline/".into()
}

fn default_provider_timeout_secs() -> u64 {
    10
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_provider_base_url(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

/// Redis configuration. The service keeps running without Redis: the cache
/// falls back to a local map and rate limiting fails open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connect/command timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    true
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    1000
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached weather result in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    /// Requests admitted per window per client
    #[serde(default = "default_rate_limit_capacity")]
    pub capacity: u32,
    #[serde(default = "default_rate_limit_period_secs")]
    pub period_secs: u64,
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_rate_limit_capacity() -> u32 {
    5
}

fn default_rate_limit_period_secs() -> u64 {
    60
}

impl RateLimitConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            capacity: default_rate_limit_capacity(),
            period_secs: default_rate_limit_period_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// `ENV=production` keeps logs at warn; everything else logs at debug.
fn default_log_level() -> String {
    match std::env::var("ENV").as_deref() {
        Ok("production") => "warn".into(),
        _ => "debug".into(),
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::builder::DefaultState;
    use config::{Config, ConfigBuilder, Environment, File};
    use std::path::PathBuf;

    /// Plain environment variables that take precedence over file and
    /// prefixed settings.
    const PLAIN_ENV: [(&str, &str); 3] = [
        ("WEATHER_API_KEY", "provider.api_key"),
        ("WEATHER_BASE_URL", "provider.base_url"),
        ("REDIS_URL", "redis.url"),
    ];

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("skycache.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., SKYCACHE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("SKYCACHE")
                .try_parsing(true)
                .separator("__"),
        );
        builder = apply_plain_env(builder)?;
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }

    fn apply_plain_env(
        mut builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, String> {
        for (var, key) in PLAIN_ENV {
            let value = std::env::var(var).ok().filter(|v| !v.is_empty());
            builder = builder
                .set_override_option(key, value)
                .map_err(|e| format!("config override error for {var}: {e}"))?;
        }
        let ttl = match std::env::var("WEATHER_DATA_TTL") {
            Ok(raw) if !raw.is_empty() => Some(
                raw.trim()
                    .parse::<i64>()
                    .map_err(|e| format!("WEATHER_DATA_TTL must be an integer: {e}"))?,
            ),
            _ => None,
        };
        builder
            .set_override_option("cache.ttl_secs", ttl)
            .map_err(|e| format!("config override error for WEATHER_DATA_TTL: {e}"))
    }
}
