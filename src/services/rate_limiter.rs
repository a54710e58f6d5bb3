//! Rate limiter (C6): global and per-session token buckets over the RPC
//! surface, backed by `governor`. Grounded in the teacher's
//! `CircuitBreaker`-style guard service: a single service owning shared
//! state behind an async-friendly lock, consulted before dispatch.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::{Clock, DefaultClock};
use governor::{Quota, RateLimiter as GovernorLimiter};
use tokio::sync::RwLock;

use crate::domain::error::RateLimitError;
use crate::domain::ids::SessionId;

type GlobalLimiter = GovernorLimiter<governor::state::direct::NotKeyed, governor::state::InMemoryState, DefaultClock>;
type SessionLimiter = GovernorLimiter<governor::state::direct::NotKeyed, governor::state::InMemoryState, DefaultClock>;

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub requests_per_second: f64,
    pub burst_size: u32,
    pub per_session_limit: u32,
    /// Methods exempt from rate limiting. Defaults to `{"initialize"}`
    /// so the handshake itself is never throttled.
    pub exempt_methods: Vec<String>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 100.0,
            burst_size: 200,
            per_session_limit: 50,
            exempt_methods: vec!["initialize".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RateLimiterStats {
    pub global_rejections: u64,
    pub session_rejections: u64,
}

fn quota_from(rps: f64, burst: u32) -> Quota {
    let per_second = NonZeroU32::new(rps.max(1.0) as u32).unwrap_or(NonZeroU32::new(1).unwrap());
    Quota::per_second(per_second).allow_burst(NonZeroU32::new(burst.max(1)).unwrap_or(NonZeroU32::new(1).unwrap()))
}

/// Token-bucket rate limiter with one global bucket and one bucket per
/// session, both refilled at the configured rate.
pub struct RateLimiter {
    global: Arc<GlobalLimiter>,
    sessions: RwLock<HashMap<SessionId, Arc<SessionLimiter>>>,
    config: RateLimiterConfig,
    stats: RwLock<RateLimiterStats>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimiterConfig) -> Self {
        let global = Arc::new(GovernorLimiter::direct(quota_from(
            config.requests_per_second,
            config.burst_size,
        )));
        Self {
            global,
            sessions: RwLock::new(HashMap::new()),
            config,
            stats: RwLock::new(RateLimiterStats::default()),
        }
    }

    /// Checks both the global and the per-session bucket for `method`,
    /// bypassing both for exempt methods.
    pub async fn check(&self, session_id: SessionId, method: &str) -> Result<(), RateLimitError> {
        if self.config.exempt_methods.iter().any(|m| m == method) {
            return Ok(());
        }

        if let Err(not_until) = self.global.check() {
            let retry_after_ms = not_until.wait_time_from(DefaultClock::default().now()).as_millis() as u64;
            self.stats.write().await.global_rejections += 1;
            return Err(RateLimitError::GlobalExceeded { retry_after_ms });
        }

        let session_limiter = self.session_limiter_for(session_id).await;
        if let Err(not_until) = session_limiter.check() {
            let retry_after_ms = not_until.wait_time_from(DefaultClock::default().now()).as_millis() as u64;
            self.stats.write().await.session_rejections += 1;
            return Err(RateLimitError::SessionExceeded {
                session: session_id,
                retry_after_ms,
            });
        }
        Ok(())
    }

    async fn session_limiter_for(&self, session_id: SessionId) -> Arc<SessionLimiter> {
        if let Some(limiter) = self.sessions.read().await.get(&session_id) {
            return limiter.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_insert_with(|| {
                Arc::new(GovernorLimiter::direct(quota_from(
                    self.config.per_session_limit as f64,
                    self.config.per_session_limit,
                )))
            })
            .clone()
    }

    pub async fn drop_session(&self, session_id: SessionId) {
        self.sessions.write().await.remove(&session_id);
    }

    pub async fn stats(&self) -> RateLimiterStats {
        self.stats.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exempt_method_always_passes() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            requests_per_second: 1.0,
            burst_size: 1,
            per_session_limit: 1,
            exempt_methods: vec!["initialize".to_string()],
        });
        let session = SessionId::new();
        for _ in 0..10 {
            limiter.check(session, "initialize").await.unwrap();
        }
    }

    #[tokio::test]
    async fn session_bucket_is_independent_of_other_sessions() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            requests_per_second: 1000.0,
            burst_size: 1000,
            per_session_limit: 1,
            exempt_methods: vec![],
        });
        let a = SessionId::new();
        let b = SessionId::new();
        limiter.check(a, "tools/call").await.unwrap();
        let err = limiter.check(a, "tools/call").await.unwrap_err();
        assert!(matches!(err, RateLimitError::SessionExceeded { .. }));
        limiter.check(b, "tools/call").await.unwrap();
    }

    #[tokio::test]
    async fn global_bucket_rejects_past_burst() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            requests_per_second: 1.0,
            burst_size: 1,
            per_session_limit: 1000,
            exempt_methods: vec![],
        });
        let session = SessionId::new();
        limiter.check(session, "tools/call").await.unwrap();
        let err = limiter.check(session, "tools/call").await.unwrap_err();
        assert!(matches!(err, RateLimitError::SessionExceeded { .. } | RateLimitError::GlobalExceeded { .. }));
    }
}
