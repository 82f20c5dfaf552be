//! Bad-request rate limiting for the login flow.
//!
//! Only failed credential checks tick the counter; the limit gate runs before
//! any directory lookup.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

pub trait RateLimiter: Send + Sync {
    fn is_rate_limit_exceeded(&self, client: Option<&str>) -> bool;
    fn tick_bad_request(&self, client: Option<&str>);
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn is_rate_limit_exceeded(&self, _client: Option<&str>) -> bool {
        false
    }

    fn tick_bad_request(&self, _client: Option<&str>) {}
}

/// Rolling-window counter of bad requests per client.
#[derive(Debug)]
pub struct WindowRateLimiter {
    limit: u32,
    window: Duration,
    ticks: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl WindowRateLimiter {
    #[must_use]
    pub fn new(limit: u32, window_seconds: i64) -> Self {
        Self {
            limit,
            window: Duration::seconds(window_seconds),
            ticks: Mutex::new(HashMap::new()),
        }
    }

    fn key(client: Option<&str>) -> String {
        // Clients without a resolvable address share one bucket.
        client.unwrap_or("unknown").to_string()
    }
}

impl RateLimiter for WindowRateLimiter {
    fn is_rate_limit_exceeded(&self, client: Option<&str>) -> bool {
        let Ok(mut ticks) = self.ticks.lock() else {
            return false;
        };
        let cutoff = Utc::now() - self.window;
        let key = Self::key(client);
        // Checks never allocate a bucket; keys are client-controlled input.
        let Some(entry) = ticks.get_mut(&key) else {
            return false;
        };
        entry.retain(|at| *at > cutoff);
        let remaining = entry.len();
        if remaining == 0 {
            ticks.remove(&key);
            return false;
        }
        remaining >= self.limit as usize
    }

    fn tick_bad_request(&self, client: Option<&str>) {
        if let Ok(mut ticks) = self.ticks.lock() {
            ticks.entry(Self::key(client)).or_default().push(Utc::now());
        }
    }
}
