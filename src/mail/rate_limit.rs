//! Rate limiting for the contact relay
//!
//! Prevents abuse by limiting contact-form submissions per client address.
//! In-memory only; counters reset on process restart.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::AppError;

const DEFAULT_MAX_TRACKED_CLIENTS: usize = 10_000;

/// Rate limiter entry
#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Number of requests in current window
    count: u32,
    /// Window start time
    window_start: Instant,
}

impl RateLimitEntry {
    /// Check if this entry is in a new window
    fn is_new_window(&self, window_duration: Duration) -> bool {
        self.window_start.elapsed() >= window_duration
    }

    /// Increment count or reset if new window
    fn increment(&mut self, window_duration: Duration) {
        if self.is_new_window(window_duration) {
            self.count = 1;
            self.window_start = Instant::now();
        } else {
            self.count += 1;
        }
    }
}

/// Rolling-window rate limiter keyed by client address
pub struct RateLimiter {
    /// Rate limit entries: client key -> entry
    entries: RwLock<HashMap<String, RateLimitEntry>>,
    /// Maximum requests per window
    max_requests: u32,
    /// Window duration
    window_duration: Duration,
    /// Maximum number of tracked clients in memory
    max_tracked_clients: usize,
}

impl RateLimiter {
    /// Create new rate limiter
    ///
    /// # Arguments
    /// * `max_requests` - Maximum requests per window
    /// * `window_duration` - Window duration
    pub fn new(max_requests: u32, window_duration: Duration) -> Self {
        Self::with_max_tracked_clients(max_requests, window_duration, DEFAULT_MAX_TRACKED_CLIENTS)
    }

    /// Create new rate limiter with explicit in-memory key cap.
    pub fn with_max_tracked_clients(
        max_requests: u32,
        window_duration: Duration,
        max_tracked_clients: usize,
    ) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_requests,
            window_duration,
            max_tracked_clients: max_tracked_clients.max(1),
        }
    }

    fn prune_expired_locked(
        entries: &mut HashMap<String, RateLimitEntry>,
        window_duration: Duration,
    ) -> usize {
        let before = entries.len();
        entries.retain(|_, value| !value.is_new_window(window_duration));
        before - entries.len()
    }

    fn evict_oldest_locked(entries: &mut HashMap<String, RateLimitEntry>) -> bool {
        let Some(oldest_key) = entries
            .iter()
            .min_by_key(|(_, value)| value.window_start)
            .map(|(key, _)| key.clone())
        else {
            return false;
        };
        entries.remove(&oldest_key);
        true
    }

    /// Check if a request should be allowed
    ///
    /// # Arguments
    /// * `client` - Rate limit key (client IP address)
    ///
    /// # Returns
    /// Ok if allowed, Err(RateLimited) if over the limit
    pub async fn check_and_increment(&self, client: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(client) && entries.len() >= self.max_tracked_clients {
            Self::prune_expired_locked(&mut entries, self.window_duration);
            if entries.len() >= self.max_tracked_clients {
                let _ = Self::evict_oldest_locked(&mut entries);
            }
        }

        let entry = entries
            .entry(client.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_start: Instant::now(),
            });

        if !entry.is_new_window(self.window_duration) && entry.count >= self.max_requests {
            Err(AppError::RateLimited)
        } else {
            entry.increment(self.window_duration);
            Ok(())
        }
    }

    /// Get current count for a client
    pub async fn get_count(&self, client: &str) -> u32 {
        let entries = self.entries.read().await;
        entries
            .get(client)
            .filter(|e| !e.is_new_window(self.window_duration))
            .map(|e| e.count)
            .unwrap_or(0)
    }

    /// Prune expired entries
    ///
    /// Called opportunistically; the map is also pruned when the key cap
    /// is hit.
    pub async fn prune_old(&self) {
        let mut entries = self.entries.write().await;
        let removed = Self::prune_expired_locked(&mut entries, self.window_duration);

        if removed > 0 {
            tracing::debug!("Pruned {} expired rate limit entries", removed);
        }
    }
}
