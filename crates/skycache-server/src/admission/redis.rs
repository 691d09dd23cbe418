//! Redis-backed fixed windows.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use deadpool_redis::Pool;

use super::{WindowOutcome, WindowStore, WindowStoreError};

/// Fixed windows aligned to the Unix epoch. Each window gets its own key
/// (`ratelimit:<client>:<window index>`) that expires with the window, so
/// a single atomic `INCR` + `EXPIRE` is all that is needed per request.
#[derive(Clone)]
pub struct RedisWindowStore {
    pool: Pool,
    timeout: Duration,
}

impl RedisWindowStore {
    pub const KEY_PREFIX: &'static str = "ratelimit:";

    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn incr(&self, key: &str, period_secs: u64) -> Result<u64, WindowStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| WindowStoreError::Unavailable(e.to_string()))?;

        let (count,): (u64,) = redis::pipe()
            .atomic()
            .incr(key, 1u64)
            .expire(key, period_secs as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| WindowStoreError::Unavailable(e.to_string()))?;
        Ok(count)
    }
}

/// Index of the window containing `now` and the time left until it closes.
fn window_position(now: Duration, period_secs: u64) -> (u64, Duration) {
    let now_secs = now.as_secs();
    let window = now_secs / period_secs;
    let closes_at = (window + 1) * period_secs;
    (window, Duration::from_secs((closes_at - now_secs).max(1)))
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn hit(
        &self,
        client: &str,
        capacity: u32,
        period: Duration,
    ) -> Result<WindowOutcome, WindowStoreError> {
        let period_secs = period.as_secs().max(1);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let (window, retry_after) = window_position(now, period_secs);
        let key = format!("{}{client}:{window}", Self::KEY_PREFIX);

        let count = tokio::time::timeout(self.timeout, self.incr(&key, period_secs))
            .await
            .map_err(|_| WindowStoreError::Timeout(self.timeout))??;

        if count > u64::from(capacity) {
            return Ok(WindowOutcome::Exceeded { retry_after });
        }
        let count = count as u32;
        Ok(WindowOutcome::Admitted {
            count,
            remaining: capacity - count,
        })
    }

    fn is_connected(&self) -> bool {
        self.pool.status().size > 0
    }
}
