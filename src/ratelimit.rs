//! Sliding-window request counting per (route, client identity).
//!
//! Counters live in a [`DashMap`]; the per-key entry lock serializes
//! concurrent increments from the same client so bursts are never
//! undercounted.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// How often (in checks) the whole table is swept for stale clients.
const SWEEP_EVERY: u64 = 1024;

#[derive(Debug, Clone, Copy)]
pub struct Quota {
    pub max_requests: u32,
    pub window: Duration,
}

impl Quota {
    #[must_use]
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// Over quota; carries the time until the oldest counted request
    /// leaves the window.
    Limited(Duration),
}

#[derive(Debug)]
struct ClientHistory {
    hits: VecDeque<Instant>,
    window: Duration,
}

#[derive(Default)]
pub struct RateLimiter {
    hits: DashMap<(String, String), ClientHistory>,
    checks: AtomicU64,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request and decide whether it is within quota. Rejected
    /// requests are not counted against the window.
    pub fn check(&self, route: &str, client: &str, quota: Quota) -> Decision {
        self.check_at(route, client, quota, Instant::now())
    }

    fn check_at(&self, route: &str, client: &str, quota: Quota, now: Instant) -> Decision {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep(now);
        }

        let mut entry = self
            .hits
            .entry((route.to_string(), client.to_string()))
            .or_insert_with(|| ClientHistory {
                hits: VecDeque::new(),
                window: quota.window,
            });
        entry.window = quota.window;

        while entry
            .hits
            .front()
            .is_some_and(|t| now.duration_since(*t) >= quota.window)
        {
            entry.hits.pop_front();
        }

        if entry.hits.len() >= quota.max_requests as usize {
            let oldest = entry.hits.front().copied().unwrap_or(now);
            return Decision::Limited(quota.window.saturating_sub(now.duration_since(oldest)));
        }

        entry.hits.push_back(now);
        Decision::Allowed
    }

    /// Drops every client whose last hit has aged out of its window, so the
    /// table stays bounded under churning client identities.
    fn sweep(&self, now: Instant) {
        self.hits
            .retain(|_, h| h.hits.back().is_some_and(|t| now.duration_since(*t) < h.window));
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTA: Quota = Quota::new(3, Duration::from_secs(300));

    #[test]
    fn allows_up_to_quota_then_limits() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        for _ in 0..3 {
            assert_eq!(
                limiter.check_at("/login", "10.0.0.1", QUOTA, t0),
                Decision::Allowed
            );
        }
        assert!(matches!(
            limiter.check_at("/login", "10.0.0.1", QUOTA, t0),
            Decision::Limited(_)
        ));
    }

    #[test]
    fn window_slides() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        for i in 0..3 {
            limiter.check_at("/login", "c", QUOTA, t0 + Duration::from_secs(i * 10));
        }
        assert!(matches!(
            limiter.check_at("/login", "c", QUOTA, t0 + Duration::from_secs(31)),
            Decision::Limited(_)
        ));

        // First hit has aged out after the full window.
        assert_eq!(
            limiter.check_at("/login", "c", QUOTA, t0 + Duration::from_secs(301)),
            Decision::Allowed
        );
    }

    #[test]
    fn clients_and_routes_are_independent() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        for _ in 0..3 {
            limiter.check_at("/login", "a", QUOTA, t0);
        }
        assert_eq!(limiter.check_at("/login", "b", QUOTA, t0), Decision::Allowed);
        assert_eq!(
            limiter.check_at("/register", "a", QUOTA, t0),
            Decision::Allowed
        );
    }

    #[test]
    fn rejected_requests_do_not_extend_the_window() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        for _ in 0..3 {
            limiter.check_at("/login", "c", QUOTA, t0);
        }
        for i in 0..50 {
            assert!(matches!(
                limiter.check_at("/login", "c", QUOTA, t0 + Duration::from_secs(i)),
                Decision::Limited(_)
            ));
        }
        assert_eq!(
            limiter.check_at("/login", "c", QUOTA, t0 + Duration::from_secs(300)),
            Decision::Allowed
        );
    }

    #[test]
    fn stale_clients_are_evicted() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        for i in 0..10_000u32 {
            let client = format!("10.0.{}.{}", i / 256, i % 256);
            limiter.check_at("/login", &client, QUOTA, t0);
            limiter.check_at("/register", &client, QUOTA, t0);
        }
        assert!(limiter.tracked_clients() >= 20_000);

        // Once every window has elapsed, the periodic sweep reclaims the
        // whole table; only the still-active client survives.
        let t1 = t0 + QUOTA.window + Duration::from_secs(1);
        for _ in 0..2 * SWEEP_EVERY {
            limiter.check_at("/login", "10.9.9.9", QUOTA, t1);
        }
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
