use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::{
    config::{ApiQuotaConfig, DF},
    error::{MarketDataError, Result},
    utils::{Clock, SystemClock},
};

/// Per-key fixed-window admission gate. Cloning shares the underlying buckets.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<String, LimiterState>>>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LimiterState {
    capacity: u32,
    window_ms: i64,
    consumed: u32,
    // Set on registration and on every window reset
    window_start_ms: i64,
}

/// Read-only view of one key's bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterSnapshot {
    pub key: String,
    pub capacity: u32,
    pub window_ms: i64,
    pub consumed: u32,
    pub window_start_ms: i64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Registers `key`. Re-registering an existing key resets its window.
    pub async fn create_limiter(&self, key: &str, capacity: u32, window_ms: i64) -> Result<()> {
        if capacity == 0 || window_ms <= 0 {
            return Err(MarketDataError::Configuration(format!(
                "Limiter [{}] needs capacity > 0 and window > 0 (got {} per {}ms)",
                key, capacity, window_ms
            )));
        }

        let mut guard = self.inner.lock().await;
        let state = LimiterState {
            capacity,
            window_ms,
            consumed: 0,
            window_start_ms: self.clock.now_ms(),
        };

        if guard.insert(key.to_string(), state).is_some() {
            log::info!("Limiter [{}] re-registered, state reset", key);
        }
        Ok(())
    }

    /// Registers every external API quota from the config table.
    pub async fn register_defaults(&self, quotas: &ApiQuotaConfig) -> Result<()> {
        for endpoint in quotas.endpoints() {
            let q = &endpoint.quota;
            self.create_limiter(q.limiter_key, q.capacity, q.window_ms)
                .await?;
        }
        Ok(())
    }

    /// Fail-fast acquisition of one permit.
    ///
    /// Returns `RateLimitExceeded` with the time left in the current window
    /// when the bucket is exhausted. The caller owns the retry policy.
    pub async fn try_consume(&self, key: &str) -> Result<()> {
        let mut guard = self.inner.lock().await;
        // Clock is read under the guard
        let now = self.clock.now_ms();
        let state = guard.get_mut(key).ok_or_else(|| unregistered(key))?;

        // 1. Check for expired window
        if now - state.window_start_ms >= state.window_ms {
            state.consumed = 0;
            state.window_start_ms = now;
        }

        // 2. Check Capacity
        if state.consumed < state.capacity {
            state.consumed += 1;

            #[cfg(debug_assertions)]
            if DF.log_rate_limiter {
                log::info!(
                    "Permit granted for [{}]. Used: {}/{}",
                    key,
                    state.consumed,
                    state.capacity
                );
            }
            return Ok(());
        }

        Err(MarketDataError::RateLimitExceeded {
            key: key.to_string(),
            retry_after_ms: state.window_start_ms + state.window_ms - now,
        })
    }

    /// Blocking acquisition: waits for the window to reset instead of failing.
    /// Unregistered keys still fail immediately.
    pub async fn acquire(&self, key: &str) -> Result<()> {
        loop {
            let wait_ms = match self.try_consume(key).await {
                Ok(()) => return Ok(()),
                Err(MarketDataError::RateLimitExceeded { retry_after_ms, .. }) => retry_after_ms,
                Err(e) => return Err(e),
            };

            // Add a tiny buffer (100ms) to ensure we land IN the next window
            let wait = Duration::from_millis(wait_ms.max(0) as u64) + Duration::from_millis(100);

            log::warn!(
                "🛑 Rate Limit Saturated for [{}]. Waiting {:.1}s...",
                key,
                wait.as_secs_f64()
            );

            tokio::time::sleep(wait).await;
        }
    }

    pub async fn snapshot(&self, key: &str) -> Option<LimiterSnapshot> {
        let guard = self.inner.lock().await;
        guard.get(key).map(|s| LimiterSnapshot {
            key: key.to_string(),
            capacity: s.capacity,
            window_ms: s.window_ms,
            consumed: s.consumed,
            window_start_ms: s.window_start_ms,
        })
    }
}

fn unregistered(key: &str) -> MarketDataError {
    MarketDataError::Configuration(format!("No rate limiter registered for [{}]", key))
}
