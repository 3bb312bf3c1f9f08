//! Per-user sliding-window rate limiter.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

pub const WINDOW: Duration = Duration::from_secs(60);

/// Admits at most `limit` requests per user in any trailing `window`.
///
/// Old timestamps are pruned lazily on each check for that user.
pub struct RateLimiter<K = u64> {
    limit: usize,
    window: Duration,
    requests: Mutex<HashMap<K, VecDeque<Instant>>>,
}

impl<K> RateLimiter<K>
where
    K: Eq + Hash + Clone + std::fmt::Display,
{
    pub fn new(limit: usize) -> Self {
        Self::with_window(limit, WINDOW)
    }

    pub fn with_window(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true if the user must be rejected. Records the request otherwise.
    pub fn is_rate_limited(&self, user: &K) -> bool {
        self.check(user, Instant::now)
    }

    pub fn is_rate_limited_at(&self, user: &K, now: Instant) -> bool {
        self.check(user, || now)
    }

    fn check(&self, user: &K, clock: impl FnOnce() -> Instant) -> bool {
        // Prune and append under one lock so concurrent checks for a user cannot both pass
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        // Clock is read under the lock so each history stays sorted
        let now = clock();
        let history = requests.entry(user.clone()).or_default();

        while let Some(&oldest) = history.front() {
            if now.saturating_duration_since(oldest) < self.window {
                break;
            }
            history.pop_front();
        }

        if history.len() >= self.limit {
            warn!("User {} is rate limited ({} requests in window)", user, history.len());
            return true;
        }

        history.push_back(now);
        false
    }
}
