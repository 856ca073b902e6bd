//! In-process login attempt limiter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Counts failed logins per key inside a fixed window.
///
/// Each key holds `(failures, window_start)`. Once the window has elapsed
/// the entry is discarded and counting starts over.
#[derive(Clone)]
pub struct LoginRateLimiter {
    inner: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_attempts: u32,
    window: Duration,
}

impl LoginRateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_attempts: max_attempts.max(1),
            window,
        }
    }

    /// `Err(retry_after)` while the key is locked out.
    pub async fn check(&self, key: &str) -> Result<(), Duration> {
        let mut guard = self.inner.lock().await;
        Self::prune(&mut guard, self.window);

        match guard.get(key) {
            Some((failures, started)) if *failures >= self.max_attempts => {
                Err(self.window.saturating_sub(started.elapsed()))
            }
            _ => Ok(()),
        }
    }

    pub async fn record_failure(&self, key: &str) {
        let mut guard = self.inner.lock().await;
        Self::prune(&mut guard, self.window);

        let entry = guard
            .entry(key.to_string())
            .or_insert_with(|| (0, Instant::now()));
        entry.0 = entry.0.saturating_add(1);
    }

    pub async fn reset(&self, key: &str) {
        self.inner.lock().await.remove(key);
    }

    fn prune(map: &mut HashMap<String, (u32, Instant)>, window: Duration) {
        map.retain(|_, (_, started)| started.elapsed() < window);
    }
}
