//! Download attempt limiter
//!
//! Counts failed authorizations per (requester, object key) inside a fixed window. Once the
//! limit is reached further attempts are refused before the engine sees them, which caps
//! guessing of the six-digit code.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Clone)]
pub struct AccessAttemptLimiter {
    inner: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_failures: u32,
    window: Duration,
}

fn attempt_key(requester: &str, object_key: &str) -> String {
    format!("{}\n{}", requester, object_key)
}

impl AccessAttemptLimiter {
    pub fn new(max_failures: u32, window_seconds: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_failures,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Reserve one attempt. Returns false when the limit is already reached.
    ///
    /// The attempt is counted before the engine runs, so concurrent guesses cannot all slip
    /// past the check. Callers hand the slot back with [`release`](Self::release) when the
    /// outcome should not count as a failure.
    pub async fn try_acquire(&self, requester: &str, object_key: &str) -> bool {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();

        if guard.len() >= PRUNE_THRESHOLD {
            guard.retain(|_, (_, reset_at)| now < *reset_at);
        }

        let (count, reset_at) = guard
            .entry(attempt_key(requester, object_key))
            .or_insert((0, now + self.window));
        if now >= *reset_at {
            *count = 0;
            *reset_at = now + self.window;
        }
        if *count >= self.max_failures {
            return false;
        }
        *count += 1;
        true
    }

    /// Return a reserved attempt whose outcome was not a failed authorization.
    pub async fn release(&self, requester: &str, object_key: &str) {
        let key = attempt_key(requester, object_key);
        let mut guard = self.inner.lock().await;
        if let Some((count, _)) = guard.get_mut(&key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                guard.remove(&key);
            }
        }
    }

    /// Forget past failures after a successful authorization.
    pub async fn clear(&self, requester: &str, object_key: &str) {
        self.inner
            .lock()
            .await
            .remove(&attempt_key(requester, object_key));
    }
}
