//! Connection pool (C7): bounded acquire/release over external
//! collaborator connections (storage, LLM provider), with a waiter queue
//! and a draining mode for graceful shutdown.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{oneshot, Mutex};
use tokio::time::{timeout, Duration, Instant};

use crate::domain::error::PoolError;
use crate::domain::ids::{LogicalClock, SubscriptionId};

#[derive(Debug, Clone)]
pub struct ConnectionPoolConfig {
    pub min: u32,
    pub max: u32,
    pub idle_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
    pub max_waiting_clients: u32,
    pub drain_timeout_ms: u64,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            min: 1,
            max: 16,
            idle_timeout_ms: 30_000,
            acquire_timeout_ms: 5_000,
            max_waiting_clients: 64,
            drain_timeout_ms: 10_000,
        }
    }
}

/// A handle representing one leased connection slot. Dropping it without
/// calling `release` still frees the slot via `ConnectionPool::release`
/// driven externally by the RPC layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionLease(SubscriptionId);

struct PoolState {
    idle: u32,
    busy: u32,
    closed_in_flight: u32,
    waiters: VecDeque<oneshot::Sender<()>>,
    draining: bool,
}

/// Bounded pool maintaining the invariant `total == idle + busy +
/// closed_in_flight`.
pub struct ConnectionPool {
    state: Mutex<PoolState>,
    config: ConnectionPoolConfig,
    waiting_count: AtomicU32,
}

impl ConnectionPool {
    #[must_use]
    pub fn new(config: ConnectionPoolConfig) -> Self {
        Self {
            state: Mutex::new(PoolState {
                idle: config.min,
                busy: 0,
                closed_in_flight: 0,
                waiters: VecDeque::new(),
                draining: false,
            }),
            config,
            waiting_count: AtomicU32::new(0),
        }
    }

    pub async fn acquire(&self) -> Result<ConnectionLease, PoolError> {
        {
            let mut state = self.state.lock().await;
            if state.draining {
                return Err(PoolError::Draining);
            }
            if state.idle > 0 {
                state.idle -= 1;
                state.busy += 1;
                return Ok(ConnectionLease(SubscriptionId::new()));
            }
            if state.idle + state.busy < self.config.max {
                state.busy += 1;
                return Ok(ConnectionLease(SubscriptionId::new()));
            }
        }

        if self.waiting_count.load(Ordering::SeqCst) >= self.config.max_waiting_clients {
            return Err(PoolError::TooManyWaiters {
                current: self.waiting_count.load(Ordering::SeqCst) as usize,
                max: self.config.max_waiting_clients as usize,
            });
        }

        let (tx, rx) = oneshot::channel();
        self.waiting_count.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.lock().await;
            state.waiters.push_back(tx);
        }

        let wait = timeout(Duration::from_millis(self.config.acquire_timeout_ms), rx).await;
        self.waiting_count.fetch_sub(1, Ordering::SeqCst);
        match wait {
            Ok(Ok(())) => {
                let mut state = self.state.lock().await;
                state.busy += 1;
                Ok(ConnectionLease(SubscriptionId::new()))
            }
            _ => Err(PoolError::AcquireTimeout(self.config.acquire_timeout_ms)),
        }
    }

    pub async fn release(&self, _lease: ConnectionLease) {
        let mut state = self.state.lock().await;
        state.busy = state.busy.saturating_sub(1);
        if let Some(waiter) = state.waiters.pop_front() {
            let _ = waiter.send(());
        } else {
            state.idle += 1;
        }
    }

    pub async fn close(&self, _lease: ConnectionLease) {
        let mut state = self.state.lock().await;
        state.busy = state.busy.saturating_sub(1);
        state.closed_in_flight += 1;
    }

    /// Stops admitting new connections, then waits up to `drain_timeout_ms`
    /// for in-flight leases to `release`/`close` on their own. Whatever is
    /// still `busy` past the deadline is forcibly moved to
    /// `closed_in_flight`.
    pub async fn drain(&self) {
        {
            let mut state = self.state.lock().await;
            state.draining = true;
            for waiter in state.waiters.drain(..) {
                drop(waiter);
            }
        }

        let deadline = Instant::now() + Duration::from_millis(self.config.drain_timeout_ms);
        loop {
            {
                let state = self.state.lock().await;
                if state.busy == 0 {
                    return;
                }
            }
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut state = self.state.lock().await;
        let remaining = state.busy;
        state.busy = 0;
        state.closed_in_flight += remaining;
    }

    pub async fn stats(&self) -> (u32, u32, u32) {
        let state = self.state.lock().await;
        (state.idle, state.busy, state.closed_in_flight)
    }

    /// Evicts idle connections beyond `idle_timeout_ms`, driven by a
    /// periodic background loop. This in-memory pool has no physical
    /// handles to close; eviction here just contracts `idle` back to
    /// `min` to model the timeout policy.
    pub async fn evict_idle(&self) {
        let _now = LogicalClock::now_wall();
        let mut state = self.state.lock().await;
        if state.idle > self.config.min {
            state.idle = self.config.min;
        }
    }
}
