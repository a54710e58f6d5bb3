//! Agent registry (C2): the single writer for agent state.
//!
//! Grounded in the teacher's `AgentRepository` port (CRUD + filter-based
//! `list`), reimplemented as an in-memory `Arc<RwLock<HashMap>>`-backed
//! registry with no persistence guarantee.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::error::AgentError;
use crate::domain::ids::{AgentId, LogicalClock, TaskId};
use crate::domain::models::agent::{Agent, AgentKind, AgentStatus};

/// Filter for `AgentRegistry::list`, mirroring the teacher's
/// `AgentFilter` pattern.
#[derive(Debug, Default, Clone)]
pub struct AgentFilter {
    pub status: Option<AgentStatus>,
    pub kind: Option<AgentKind>,
    pub capability: Option<String>,
    pub topology_role: Option<String>,
}

impl AgentFilter {
    fn matches(&self, agent: &Agent) -> bool {
        if let Some(status) = self.status {
            if agent.status != status {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if agent.kind != kind {
                return false;
            }
        }
        if let Some(ref cap) = self.capability {
            if !agent.capabilities.skills.contains_key(cap) {
                return false;
            }
        }
        if let Some(ref role) = self.topology_role {
            if agent.topology_role.as_deref() != Some(role.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Registry-wide gauges assembled from per-agent metrics for C9 export.
#[derive(Debug, Clone, Default)]
pub struct RegistryMetrics {
    pub active: usize,
    pub idle: usize,
    pub busy: usize,
    pub offline: usize,
    pub total_tasks_completed: u64,
    pub total_tasks_failed: u64,
}

#[derive(Debug, Clone)]
pub struct AgentRegistryConfig {
    pub max_agents: usize,
    pub dead_after_ms: u64,
}

impl Default for AgentRegistryConfig {
    fn default() -> Self {
        Self {
            max_agents: 50,
            dead_after_ms: 60_000,
        }
    }
}

/// In-memory agent registry. One writer owns this struct; callers never
/// hold the lock across an `.await` that invokes another component.
pub struct AgentRegistry {
    agents: RwLock<HashMap<AgentId, Agent>>,
    config: AgentRegistryConfig,
}

impl AgentRegistry {
    #[must_use]
    pub fn new(config: AgentRegistryConfig) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub async fn register(&self, agent: Agent) -> Result<AgentId, AgentError> {
        agent.validate()?;
        let mut agents = self.agents.write().await;
        if agents.len() >= self.config.max_agents {
            return Err(AgentError::CapacityExceeded {
                current: agents.len(),
                max: self.config.max_agents,
            });
        }
        if agents.contains_key(&agent.agent_id) {
            return Err(AgentError::AlreadyExists(agent.agent_id));
        }
        let id = agent.agent_id;
        debug!(agent_id = %id, kind = agent.kind.as_str(), "agent registered");
        agents.insert(id, agent);
        Ok(id)
    }

    pub async fn unregister(&self, agent_id: AgentId) -> Result<(), AgentError> {
        let mut agents = self.agents.write().await;
        agents
            .remove(&agent_id)
            .map(|_| ())
            .ok_or(AgentError::NotFound(agent_id))
    }

    pub async fn get(&self, agent_id: AgentId) -> Result<Agent, AgentError> {
        self.agents
            .read()
            .await
            .get(&agent_id)
            .cloned()
            .ok_or(AgentError::NotFound(agent_id))
    }

    pub async fn list(&self, filter: &AgentFilter) -> Vec<Agent> {
        self.agents
            .read()
            .await
            .values()
            .filter(|agent| filter.matches(agent))
            .cloned()
            .collect()
    }

    pub async fn heartbeat(&self, agent_id: AgentId) -> Result<(), AgentError> {
        let mut agents = self.agents.write().await;
        let agent = agents.get_mut(&agent_id).ok_or(AgentError::NotFound(agent_id))?;
        agent.record_heartbeat();
        Ok(())
    }

    pub async fn update_health(&self, agent_id: AgentId, health: f64) -> Result<(), AgentError> {
        if !(0.0..=1.0).contains(&health) {
            return Err(AgentError::InvalidHealth(health));
        }
        let mut agents = self.agents.write().await;
        let agent = agents.get_mut(&agent_id).ok_or(AgentError::NotFound(agent_id))?;
        agent.health = health;
        agent.mark_unhealthy_if_needed();
        Ok(())
    }

    pub async fn assign(&self, agent_id: AgentId, task_id: TaskId) -> Result<(), AgentError> {
        let mut agents = self.agents.write().await;
        let agent = agents.get_mut(&agent_id).ok_or(AgentError::NotFound(agent_id))?;
        if !agent.is_available() {
            return Err(AgentError::NotAvailable {
                agent: agent_id,
                status: agent.status.as_str().to_string(),
                task: task_id,
            });
        }
        agent.assign_task(task_id);
        Ok(())
    }

    pub async fn release(&self, agent_id: AgentId) -> Result<(), AgentError> {
        let mut agents = self.agents.write().await;
        let agent = agents.get_mut(&agent_id).ok_or(AgentError::NotFound(agent_id))?;
        agent.release_task();
        Ok(())
    }

    /// Health-monitor loop tick: agents silent past `dead_after_ms`
    /// transition to `offline` rather than being removed. Returns each dead
    /// agent's id paired with the task it held, if any, so the caller can
    /// re-queue that task and flag the agent's topology edges stale.
    pub async fn sweep_dead(&self) -> Vec<(AgentId, Option<TaskId>)> {
        let now = LogicalClock::now_wall();
        let mut agents = self.agents.write().await;
        let dead: Vec<(AgentId, Option<TaskId>)> = agents
            .values()
            .filter(|agent| {
                agent.status != AgentStatus::Offline && {
                    let silence = now - agent.last_heartbeat;
                    silence.num_milliseconds() as u64 >= self.config.dead_after_ms
                }
            })
            .map(|agent| (agent.agent_id, agent.current_task))
            .collect();
        for (id, _) in &dead {
            if let Some(agent) = agents.get_mut(id) {
                agent.status = AgentStatus::Offline;
                agent.current_task = None;
            }
            warn!(agent_id = %id, "agent transitioned to offline after missed heartbeat deadline");
        }
        dead
    }

    pub async fn get_metrics(&self) -> RegistryMetrics {
        let agents = self.agents.read().await;
        let mut metrics = RegistryMetrics::default();
        for agent in agents.values() {
            metrics.active += 1;
            match agent.status {
                AgentStatus::Idle | AgentStatus::Waiting => metrics.idle += 1,
                AgentStatus::Busy => metrics.busy += 1,
                AgentStatus::Offline | AgentStatus::Error => metrics.offline += 1,
            }
            metrics.total_tasks_completed += agent.metrics.tasks_completed;
            metrics.total_tasks_failed += agent.metrics.tasks_failed;
        }
        metrics
    }
}
