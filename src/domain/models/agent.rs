//! Agent model: registry-managed worker identity, capabilities, and health.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::AgentError;
use crate::domain::ids::{AgentId, TaskId};

/// Broad classification of an agent's role in the swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Queen,
    Coordinator,
    Worker,
    Peer,
    Specialist,
}

impl AgentKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queen => "queen",
            Self::Coordinator => "coordinator",
            Self::Worker => "worker",
            Self::Peer => "peer",
            Self::Specialist => "specialist",
        }
    }
}

/// Lifecycle status of a registered agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    Waiting,
    Offline,
    Error,
}

impl AgentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Waiting => "waiting",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

/// Hard resource limits an agent enforces locally; the scheduler must
/// never assign work that would exceed these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityLimits {
    pub max_concurrent_tasks: u32,
    pub max_memory_mb: Option<u64>,
    pub max_exec_time_ms: Option<u64>,
}

impl Default for CapabilityLimits {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 1,
            max_memory_mb: None,
            max_exec_time_ms: None,
        }
    }
}

/// Declared capabilities: named skills with a proficiency score in
/// `[0, 1]`, plus the hard limits above.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub skills: HashMap<String, f64>,
    pub limits: CapabilityLimits,
}

impl Capabilities {
    #[must_use]
    pub fn has(&self, skill: &str, min_proficiency: f64) -> bool {
        self.skills
            .get(skill)
            .is_some_and(|&p| p >= min_proficiency)
    }
}

/// Rolling per-agent counters used to assemble registry-wide metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub avg_latency_ms: f64,
}

impl AgentMetrics {
    pub fn record_completion(&mut self, latency_ms: f64) {
        let n = self.tasks_completed as f64;
        self.avg_latency_ms = (self.avg_latency_ms * n + latency_ms) / (n + 1.0);
        self.tasks_completed += 1;
    }

    pub fn record_failure(&mut self) {
        self.tasks_failed += 1;
    }
}

/// A registered agent: the unit the coordinator assigns work to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: AgentId,
    pub name: String,
    pub kind: AgentKind,
    pub status: AgentStatus,
    pub capabilities: Capabilities,
    pub workload: f64,
    pub health: f64,
    pub last_heartbeat: chrono::DateTime<chrono::Utc>,
    pub topology_role: Option<String>,
    pub connections: Vec<AgentId>,
    pub current_task: Option<TaskId>,
    pub metrics: AgentMetrics,
}

impl Agent {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AgentKind, capabilities: Capabilities) -> Self {
        Self {
            agent_id: AgentId::new(),
            name: name.into(),
            kind,
            status: AgentStatus::Idle,
            capabilities,
            workload: 0.0,
            health: 1.0,
            last_heartbeat: chrono::Utc::now(),
            topology_role: None,
            connections: Vec::new(),
            current_task: None,
            metrics: AgentMetrics::default(),
        }
    }

    /// Validates workload and health bounds.
    pub fn validate(&self) -> Result<(), AgentError> {
        if !(0.0..=1.0).contains(&self.workload) {
            return Err(AgentError::InvalidWorkload(self.workload));
        }
        if !(0.0..=1.0).contains(&self.health) {
            return Err(AgentError::InvalidHealth(self.health));
        }
        Ok(())
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self.status, AgentStatus::Idle | AgentStatus::Waiting)
    }

    pub fn assign_task(&mut self, task_id: TaskId) {
        self.current_task = Some(task_id);
        self.status = AgentStatus::Busy;
    }

    pub fn release_task(&mut self) {
        self.current_task = None;
        self.status = AgentStatus::Idle;
    }

    /// Health check interval expiry: a silent/unhealthy agent within one
    /// tick is forced `offline`.
    pub fn mark_unhealthy_if_needed(&mut self) {
        if self.health <= 0.0 {
            self.status = AgentStatus::Offline;
        }
    }

    pub fn record_heartbeat(&mut self) {
        self.last_heartbeat = chrono::Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_agent() -> Agent {
        let mut caps = Capabilities::default();
        caps.skills.insert("codeGeneration".into(), 1.0);
        caps.limits.max_concurrent_tasks = 3;
        Agent::new("worker-1", AgentKind::Worker, caps)
    }

    #[test]
    fn new_agent_starts_idle_and_healthy() {
        let agent = sample_agent();
        assert_eq!(agent.status, AgentStatus::Idle);
        assert!((agent.health - 1.0).abs() < f64::EPSILON);
        assert!(agent.validate().is_ok());
    }

    #[test]
    fn workload_out_of_range_fails_validation() {
        let mut agent = sample_agent();
        agent.workload = 1.5;
        assert!(matches!(
            agent.validate(),
            Err(AgentError::InvalidWorkload(_))
        ));
    }

    #[test]
    fn assigning_task_marks_busy() {
        let mut agent = sample_agent();
        let task = TaskId::new();
        agent.assign_task(task);
        assert_eq!(agent.status, AgentStatus::Busy);
        assert_eq!(agent.current_task, Some(task));
    }

    #[test]
    fn zero_health_forces_offline() {
        let mut agent = sample_agent();
        agent.health = 0.0;
        agent.mark_unhealthy_if_needed();
        assert_eq!(agent.status, AgentStatus::Offline);
    }

    #[test]
    fn capability_proficiency_threshold() {
        let agent = sample_agent();
        assert!(agent.capabilities.has("codeGeneration", 1.0));
        assert!(!agent.capabilities.has("codeGeneration", 1.1));
        assert!(!agent.capabilities.has("unknown", 0.0));
    }
}
