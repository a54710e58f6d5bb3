//! Metrics snapshot (C9): an on-demand aggregate assembled from the
//! other services, exposed as the pseudo-resource `usc://metrics/snapshot`
//! rather than maintained by a separate writer loop.

use serde::{Deserialize, Serialize};

use crate::services::agent_registry::{AgentRegistry, RegistryMetrics};
use crate::services::connection_pool::ConnectionPool;
use crate::services::rate_limiter::{RateLimiter, RateLimiterStats};
use crate::services::scheduler::Scheduler;
use crate::services::topology_manager::TopologyManager;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub agents: RegistrySummary,
    pub tasks_queued: usize,
    pub topology_version: u64,
    pub topology_nodes: usize,
    pub pool_idle: u32,
    pub pool_busy: u32,
    pub pool_closed_in_flight: u32,
    pub rate_limit_global_rejections: u64,
    pub rate_limit_session_rejections: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySummary {
    pub active: usize,
    pub idle: usize,
    pub busy: usize,
    pub offline: usize,
    pub total_tasks_completed: u64,
    pub total_tasks_failed: u64,
}

impl From<RegistryMetrics> for RegistrySummary {
    fn from(value: RegistryMetrics) -> Self {
        Self {
            active: value.active,
            idle: value.idle,
            busy: value.busy,
            offline: value.offline,
            total_tasks_completed: value.total_tasks_completed,
            total_tasks_failed: value.total_tasks_failed,
        }
    }
}

/// Assembles a `MetricsSnapshot` by querying each service directly.
/// There is no background aggregation loop: every call reflects the
/// current state, computed fresh on read.
pub async fn snapshot(
    registry: &AgentRegistry,
    scheduler: &Scheduler,
    topology: &TopologyManager,
    pool: &ConnectionPool,
    limiter: &RateLimiter,
) -> MetricsSnapshot {
    let registry_metrics = registry.get_metrics().await;
    let tasks_queued = scheduler.len().await;
    let topology_version = topology.version().await;
    let topology_nodes = topology.node_count().await;
    let (pool_idle, pool_busy, pool_closed_in_flight) = pool.stats().await;
    let RateLimiterStats {
        global_rejections,
        session_rejections,
    } = limiter.stats().await;

    MetricsSnapshot {
        agents: registry_metrics.into(),
        tasks_queued,
        topology_version,
        topology_nodes,
        pool_idle,
        pool_busy,
        pool_closed_in_flight,
        rate_limit_global_rejections: global_rejections,
        rate_limit_session_rejections: session_rejections,
    }
}
