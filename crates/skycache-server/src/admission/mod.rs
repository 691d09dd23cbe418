//! Fail-open admission control.
//!
//! Each client gets a fixed window of `capacity` requests per `period`,
//! counted in a shared backing store. The limiter holds no per-client
//! state itself. When the store is absent, not yet connected, or failing,
//! requests are admitted: weather availability wins over strict limits.

pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use self::redis::RedisWindowStore;

/// Result of counting one request against a client's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    Admitted { count: u32, remaining: u32 },
    Exceeded { retry_after: Duration },
}

/// Failures of the backing store. Never a limit decision.
#[derive(Debug, Error)]
pub enum WindowStoreError {
    #[error("rate-limit store unavailable: {0}")]
    Unavailable(String),

    #[error("rate-limit store timed out after {0:?}")]
    Timeout(Duration),
}

/// Backing store for rate-limit windows.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Count one request for `client` and report whether it fits the window.
    async fn hit(
        &self,
        client: &str,
        capacity: u32,
        period: Duration,
    ) -> Result<WindowOutcome, WindowStoreError>;

    /// Whether a live connection exists right now. Must not do I/O.
    fn is_connected(&self) -> bool;
}

/// Decision for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// `remaining` is `None` when the request was admitted without consulting
    /// the store.
    Allowed { remaining: Option<u32> },
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// Limiter state as reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterStatus {
    Enabled,
    NotConnected,
    NotConfigured,
}

pub struct RateLimiter {
    store: Option<Arc<dyn WindowStore>>,
    capacity: u32,
    period: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn WindowStore>, capacity: u32, period: Duration) -> Self {
        Self {
            store: Some(store),
            capacity,
            period,
        }
    }

    /// A limiter with no backing store; admits everything.
    pub fn disabled() -> Self {
        Self {
            store: None,
            capacity: 0,
            period: Duration::ZERO,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Current status without touching the network.
    pub fn status(&self) -> LimiterStatus {
        match &self.store {
            None => LimiterStatus::NotConfigured,
            Some(store) if store.is_connected() => LimiterStatus::Enabled,
            Some(_) => LimiterStatus::NotConnected,
        }
    }

    pub async fn check(&self, client: &str) -> Admission {
        let store = match &self.store {
            Some(store) if store.is_connected() => store,
            _ => {
                crate::metrics::record_admission("fail_open");
                return Admission::Allowed { remaining: None };
            }
        };

        match store.hit(client, self.capacity, self.period).await {
            Ok(WindowOutcome::Admitted { remaining, .. }) => {
                crate::metrics::record_admission("allowed");
                Admission::Allowed {
                    remaining: Some(remaining),
                }
            }
            Ok(WindowOutcome::Exceeded { retry_after }) => {
                tracing::info!(
                    client = %client,
                    retry_after_secs = retry_after.as_secs(),
                    "rate limit exceeded"
                );
                crate::metrics::record_admission("denied");
                Admission::Denied { retry_after }
            }
            Err(e) => {
                tracing::warn!(
                    client = %client,
                    error = %e,
                    "rate-limit check failed, allowing request"
                );
                crate::metrics::record_admission("fail_open");
                Admission::Allowed { remaining: None }
            }
        }
    }
}
