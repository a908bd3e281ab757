//! Sliding-window rate limiting per user

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Simple rate limiter for user turns
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: HashMap<u64, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            requests: HashMap::new(),
        }
    }

    /// Check and record a request for this user; false when rate limited.
    pub fn is_allowed(&mut self, user_id: u64) -> bool {
        self.is_allowed_at(user_id, Instant::now())
    }

    fn is_allowed_at(&mut self, user_id: u64, now: Instant) -> bool {
        let timestamps = self.requests.entry(user_id).or_default();
        timestamps.retain(|ts| now.duration_since(*ts) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}
