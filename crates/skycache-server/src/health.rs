//! Dependency health reporting.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::admission::{LimiterStatus, RateLimiter};
use crate::cache::CacheStore;

pub const SERVICE_NAME: &str = "skycache";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DependencyStatus {
    fn new(status: &str, detail: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            detail: Some(detail.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    pub redis: DependencyStatus,
    pub rate_limiting: DependencyStatus,
}

/// Point-in-time view of service health. Built per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: OverallStatus,
    pub timestamp: String,
    pub service: String,
    pub version: String,
    pub dependencies: Dependencies,
}

pub struct HealthReporter {
    cache: Arc<dyn CacheStore>,
    limiter: Arc<RateLimiter>,
}

impl HealthReporter {
    pub fn new(cache: Arc<dyn CacheStore>, limiter: Arc<RateLimiter>) -> Self {
        Self { cache, limiter }
    }

    /// Probe the cache (forcing a round trip) and inspect the limiter
    /// (without connecting). Only the cache can degrade the overall status.
    pub async fn check_health(&self) -> HealthSnapshot {
        let redis = match self.cache.ping().await {
            Ok(()) => DependencyStatus::new("healthy", self.cache.healthy_detail()),
            Err(e) => {
                tracing::warn!(error = %e, "cache health probe failed");
                DependencyStatus::new("unhealthy", e.to_string())
            }
        };

        let rate_limiting = match self.limiter.status() {
            LimiterStatus::Enabled => DependencyStatus {
                status: "enabled".into(),
                detail: Some(format!(
                    "{} requests per {}s",
                    self.limiter.capacity(),
                    self.limiter.period().as_secs()
                )),
            },
            LimiterStatus::NotConnected => {
                DependencyStatus::new("disabled", "backing store not connected")
            }
            LimiterStatus::NotConfigured => {
                DependencyStatus::new("disabled", "rate limiting not configured")
            }
        };

        let status = if redis.status == "healthy" {
            OverallStatus::Ok
        } else {
            OverallStatus::Degraded
        };

        HealthSnapshot {
            status,
            timestamp: now_rfc3339(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            dependencies: Dependencies {
                redis,
                rate_limiting,
            },
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}
