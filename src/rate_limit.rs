//! Fixed-window rate limiting for the protected route.
//!
//! Counters live in a `DashMap` keyed by `(caller, route)`. Every decision for
//! a key runs under that key's entry guard, so two requests racing on an
//! expired window cannot both reset it. Keys in other shards are not blocked.

use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::interval;
use crate::clock::Clock;
use crate::metrics::RATE_LIMIT_KEYS;

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_size_minutes: u32,
    pub enabled: bool,
    pub protected_route: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_size_minutes: 1,
            enabled: true,
            protected_route: "/owners/find".to_string(),
        }
    }
}

// Counter key - caller address + route
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub caller: String,
    pub route: String,
}

// Rate limit entry - tracks requests per key in the current window
#[derive(Debug, Clone, Copy)]
pub struct WindowCounter {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

impl WindowCounter {
    // A zero limit opens the window without counting the denied request
    fn starting_at(now: DateTime<Utc>, max_requests: u32) -> Self {
        Self {
            count: max_requests.min(1),
            window_start: now,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.window_start >= window
    }

    // Caller must hold exclusive access to the counter
    fn observe(&mut self, now: DateTime<Utc>, window: Duration, max_requests: u32) -> bool {
        if self.is_expired(now, window) {
            *self = Self::starting_at(now, max_requests);
            return self.count > 0;
        }

        if self.count < max_requests {
            self.count += 1;
            return true;
        }

        false
    }
}

/// Outcome of a rate limit check, with the metadata for a 429 body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub window_minutes: u32,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    window: Duration,
    counters: DashMap<RateLimitKey, WindowCounter>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let window = Duration::minutes(i64::from(config.window_size_minutes));
        Self {
            config,
            window,
            counters: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn tracked_keys(&self) -> usize {
        self.counters.len()
    }

    pub fn applies_to(&self, route: &str) -> bool {
        self.config.enabled && route == self.config.protected_route
    }

    pub fn should_allow(&self, caller_key: &str, route: &str, now: DateTime<Utc>) -> Decision {
        let allowed = !self.applies_to(route) || self.check_key(caller_key, route, now);

        Decision {
            allowed,
            limit: self.config.max_requests,
            window_minutes: self.config.window_size_minutes,
        }
    }

    fn check_key(&self, caller_key: &str, route: &str, now: DateTime<Utc>) -> bool {
        let key = RateLimitKey {
            caller: caller_key.to_string(),
            route: route.to_string(),
        };

        // the entry guard holds the shard lock for the whole read-check-update
        match self.counters.entry(key) {
            Entry::Occupied(mut entry) => {
                entry
                    .get_mut()
                    .observe(now, self.window, self.config.max_requests)
            }
            Entry::Vacant(entry) => {
                let counter = entry.insert(WindowCounter::starting_at(now, self.config.max_requests));
                RATE_LIMIT_KEYS.inc();
                counter.count > 0
            }
        }
    }

    /// Drop counters whose window has already ended. A dropped key restarts
    /// at `(now, 1)` on its next request, exactly as an expired window would.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0usize;
        self.counters.retain(|_, counter| {
            let keep = !counter.is_expired(now, self.window);
            if !keep {
                evicted += 1;
            }
            keep
        });

        RATE_LIMIT_KEYS.sub(evicted as f64);
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.counters.len(), "evicted idle rate limit keys");
        }
        evicted
    }
}

// Expired-key sweeper - runs until the process exits
pub async fn expiry_sweeper(limiter: Arc<RateLimiter>, clock: Arc<dyn Clock>, every: std::time::Duration) {
    let mut interval = interval(every);

    tracing::info!(interval = ?every, "rate limit sweeper started");

    loop {
        interval.tick().await;
        limiter.evict_expired(clock.now());
    }
}

/// Derive the caller key: first `X-Forwarded-For` hop, then `X-Real-IP`,
/// then the connection's address.
pub fn client_ip(headers: &HeaderMap, remote_addr: SocketAddr) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            return first.trim().to_string();
        }
    }

    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }

    remote_addr.ip().to_string()
}
