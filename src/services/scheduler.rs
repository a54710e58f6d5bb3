//! Task scheduler (C4): admission, dependency tracking, assignment, and
//! retry dispatch. Grounded in the teacher's `DependencyResolver` +
//! `PriorityCalculator` split, merged here into one service that owns the
//! `TaskGraph`/`ReadyQueue` pair from `domain::models::task`.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::error::SchedulerError;
use crate::domain::ids::{AgentId, TaskId};
use crate::domain::models::agent::Agent;
use crate::domain::models::task::{ReadyQueue, Task, TaskGraph, TaskPriority, TaskStatus};

/// The four candidate-agent assignment strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentStrategy {
    RoundRobin,
    LeastLoaded,
    CapabilityMatch,
    PriorityBased,
}

impl AssignmentStrategy {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "round_robin" => Self::RoundRobin,
            "least_loaded" => Self::LeastLoaded,
            "priority_based" => Self::PriorityBased,
            _ => Self::CapabilityMatch,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_tasks: usize,
    pub strategy: AssignmentStrategy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_tasks: 10_000,
            strategy: AssignmentStrategy::CapabilityMatch,
        }
    }
}

struct SchedulerState {
    tasks: HashMap<TaskId, Task>,
    graph: TaskGraph,
    ready: ReadyQueue,
    priorities: HashMap<TaskId, TaskPriority>,
    round_robin_cursor: usize,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            tasks: HashMap::new(),
            graph: TaskGraph::new(),
            ready: ReadyQueue::new(),
            priorities: HashMap::new(),
            round_robin_cursor: 0,
        }
    }
}

/// Owns the full task lifecycle: submission, dependency admission,
/// assignment, completion/failure, and retry/backoff.
pub struct Scheduler {
    state: RwLock<SchedulerState>,
    config: SchedulerConfig,
}

impl Scheduler {
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            state: RwLock::new(SchedulerState::default()),
            config,
        }
    }

    /// Submits a task, rejecting it if its declared dependencies would
    /// introduce a cycle.
    pub async fn submit(&self, task: Task) -> Result<TaskId, SchedulerError> {
        let mut state = self.state.write().await;
        if state.tasks.len() >= self.config.max_tasks {
            return Err(SchedulerError::CapacityExceeded {
                current: state.tasks.len(),
                max: self.config.max_tasks,
            });
        }
        if state.tasks.contains_key(&task.task_id) {
            return Err(SchedulerError::AlreadyExists(task.task_id));
        }
        if let Some(cycle_at) = state.graph.would_cycle(task.task_id, &task.dependencies) {
            return Err(SchedulerError::CircularDependency(cycle_at));
        }

        let id = task.task_id;
        let priority = task.priority;
        let unresolved = task
            .dependencies
            .iter()
            .filter(|dep| {
                state
                    .tasks
                    .get(dep)
                    .map_or(true, |t| !matches!(t.status, TaskStatus::Completed))
            })
            .count();

        state.graph.insert(id, task.dependencies.clone());
        state.priorities.insert(id, priority);
        state.tasks.insert(id, task);

        if unresolved == 0 {
            let lookup = state.priorities.clone();
            state.ready.push_ordered(id, priority, &lookup);
        }
        debug!(task_id = %id, unresolved, "task submitted");
        Ok(id)
    }

    pub async fn get(&self, task_id: TaskId) -> Result<Task, SchedulerError> {
        self.state
            .read()
            .await
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(SchedulerError::NotFound(task_id))
    }

    /// Pops the next ready task in priority/FIFO order, then pairs it with
    /// an eligible agent from `candidates` using the configured strategy.
    pub async fn assign_next(&self, candidates: &[Agent]) -> Option<(TaskId, AgentId)> {
        let mut state = self.state.write().await;
        let task_id = state.ready.pop()?;
        let task = state.tasks.get(&task_id)?.clone();
        let agent_id = Self::pick_agent(&self.config.strategy, &task, candidates, &mut state.round_robin_cursor)?;

        if let Some(task) = state.tasks.get_mut(&task_id) {
            task.assigned_to = Some(agent_id);
            let _ = task.transition(TaskStatus::Assigned);
        }
        Some((task_id, agent_id))
    }

    fn pick_agent(
        strategy: &AssignmentStrategy,
        task: &Task,
        candidates: &[Agent],
        cursor: &mut usize,
    ) -> Option<AgentId> {
        let eligible: Vec<&Agent> = candidates.iter().filter(|a| a.is_available()).collect();
        if eligible.is_empty() {
            return None;
        }
        match strategy {
            AssignmentStrategy::RoundRobin => {
                let idx = *cursor % eligible.len();
                *cursor = cursor.wrapping_add(1);
                Some(eligible[idx].agent_id)
            }
            AssignmentStrategy::LeastLoaded => eligible
                .iter()
                .min_by(|a, b| a.workload.partial_cmp(&b.workload).unwrap())
                .map(|a| a.agent_id),
            AssignmentStrategy::CapabilityMatch => eligible
                .iter()
                .find(|a| a.capabilities.has(&task.kind, 0.0))
                .or_else(|| eligible.first())
                .map(|a| a.agent_id),
            AssignmentStrategy::PriorityBased => eligible
                .iter()
                .max_by(|a, b| {
                    a.capabilities
                        .skills
                        .get(&task.kind)
                        .unwrap_or(&0.0)
                        .partial_cmp(b.capabilities.skills.get(&task.kind).unwrap_or(&0.0))
                        .unwrap()
                })
                .map(|a| a.agent_id),
        }
    }

    pub async fn start(&self, task_id: TaskId) -> Result<(), SchedulerError> {
        let mut state = self.state.write().await;
        let task = state.tasks.get_mut(&task_id).ok_or(SchedulerError::NotFound(task_id))?;
        task.transition(TaskStatus::Running)
    }

    pub async fn complete(&self, task_id: TaskId, output: serde_json::Value) -> Result<(), SchedulerError> {
        let mut state = self.state.write().await;
        let task = state.tasks.get_mut(&task_id).ok_or(SchedulerError::NotFound(task_id))?;
        task.output = Some(output);
        task.transition(TaskStatus::Completed)?;
        let dependents = state.graph.transitive_dependents(task_id);
        self.release_ready_dependents(&mut state, &dependents).await;
        info!(task_id = %task_id, "task completed");
        Ok(())
    }

    async fn release_ready_dependents(
        &self,
        state: &mut SchedulerState,
        dependents: &std::collections::HashSet<TaskId>,
    ) {
        let mut newly_ready = Vec::new();
        for &dep in dependents {
            let all_done = state
                .graph
                .dependencies_of(dep)
                .iter()
                .all(|d| state.tasks.get(d).is_some_and(|t| t.status == TaskStatus::Completed));
            if all_done {
                if let Some(task) = state.tasks.get(&dep) {
                    if task.status == TaskStatus::Pending {
                        newly_ready.push((dep, task.priority));
                    }
                }
            }
        }
        let lookup = state.priorities.clone();
        for (dep, priority) in newly_ready {
            state.ready.push_ordered(dep, priority, &lookup);
        }
    }

    /// Fails a task, retrying with backoff unless retries are exhausted
    /// or the failure is permanent. Returns the backoff applied, if any.
    pub async fn fail(&self, task_id: TaskId, error: impl Into<String>) -> Result<Option<u64>, SchedulerError> {
        let mut state = self.state.write().await;
        let task = state.tasks.get_mut(&task_id).ok_or(SchedulerError::NotFound(task_id))?;
        match task.retry(error) {
            Ok(backoff) => {
                let priority = task.priority;
                let lookup = state.priorities.clone();
                state.ready.push_ordered(task_id, priority, &lookup);
                Ok(Some(backoff))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn cancel(&self, task_id: TaskId) -> Result<(), SchedulerError> {
        let mut state = self.state.write().await;
        let task = state.tasks.get_mut(&task_id).ok_or(SchedulerError::NotFound(task_id))?;
        task.transition(TaskStatus::Cancelled)
    }

    /// Enforces `timeout_ms` on tasks still `running`; called by a
    /// periodic background loop. Each timed-out task re-enters retry logic
    /// exactly like `fail`, so it lands back in `pending` with backoff
    /// applied or `failed` once retries are exhausted. Returns each
    /// timed-out task paired with the agent it was assigned to, if any, so
    /// the caller can release that agent's slot.
    pub async fn enforce_timeouts(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<(TaskId, Option<AgentId>)> {
        let mut state = self.state.write().await;
        let timed_out: Vec<(TaskId, Option<AgentId>)> = state
            .tasks
            .values()
            .filter(|t| {
                t.status == TaskStatus::Running
                    && t.timeout_ms.is_some_and(|timeout| {
                        t.started_at
                            .is_some_and(|start| (now - start).num_milliseconds() as u64 >= timeout)
                    })
            })
            .map(|t| (t.task_id, t.assigned_to))
            .collect();
        for &(id, _) in &timed_out {
            if let Some(task) = state.tasks.get_mut(&id) {
                if let Ok(_backoff) = task.retry("task exceeded its configured timeout") {
                    let priority = task.priority;
                    let lookup = state.priorities.clone();
                    state.ready.push_ordered(id, priority, &lookup);
                }
            }
        }
        timed_out
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::agent::{AgentKind, Capabilities};

    fn task(priority: TaskPriority) -> Task {
        Task::new("generic", "t", priority)
    }

    #[tokio::test]
    async fn submit_rejects_cycle() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let mut a = task(TaskPriority::Normal);
        let mut b = task(TaskPriority::Normal);
        b.dependencies.push(a.task_id);
        a.dependencies.push(b.task_id);
        scheduler.submit(b).await.unwrap();
        let err = scheduler.submit(a).await.unwrap_err();
        assert!(matches!(err, SchedulerError::CircularDependency(_)));
    }

    #[tokio::test]
    async fn assign_next_picks_capability_match() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let id = scheduler.submit(task(TaskPriority::High)).await.unwrap();
        let agent = Agent::new("w", AgentKind::Worker, Capabilities::default());
        let (assigned, _) = scheduler.assign_next(&[agent]).await.unwrap();
        assert_eq!(assigned, id);
    }

    #[tokio::test]
    async fn completing_a_task_releases_ready_dependent() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let a = task(TaskPriority::Normal);
        let a_id = a.task_id;
        let mut b = task(TaskPriority::Normal);
        b.dependencies.push(a_id);
        let b_id = b.task_id;
        scheduler.submit(a).await.unwrap();
        scheduler.submit(b).await.unwrap();

        let agent = Agent::new("w", AgentKind::Worker, Capabilities::default());
        let (first, _) = scheduler.assign_next(&[agent.clone()]).await.unwrap();
        assert_eq!(first, a_id);
        scheduler.complete(a_id, serde_json::json!({})).await.unwrap();

        let (second, _) = scheduler.assign_next(&[agent]).await.unwrap();
        assert_eq!(second, b_id);
    }

    #[tokio::test]
    async fn fail_retries_with_backoff_then_gives_up() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let mut t = task(TaskPriority::Normal);
        t.max_retries = 1;
        let id = t.task_id;
        scheduler.submit(t).await.unwrap();
        let backoff = scheduler.fail(id, "boom").await.unwrap();
        assert_eq!(backoff, Some(200));
        let err = scheduler.fail(id, "boom again").await.unwrap_err();
        assert!(matches!(err, SchedulerError::MaxRetriesExceeded(_)));
    }
}
