//! Task model, dependency graph, and priority-ordered ready queue (C4).

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::SchedulerError;
use crate::domain::ids::{AgentId, TaskId};

/// Task priority tiers; ties broken by submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskPriority {
    Low = 25,
    Normal = 50,
    High = 75,
    Critical = 100,
}

impl TaskPriority {
    #[must_use]
    pub const fn numeric(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Running,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl TaskStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::TimedOut
        )
    }
}

/// Exponential backoff policy applied between retry attempts.
/// Open Question 1 resolution: base 200ms, multiplier 2.0, cap 30s.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub base_ms: u64,
    pub multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_ms: 200,
            multiplier: 2.0,
            max_backoff_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> u64 {
        let raw = self.base_ms as f64 * self.multiplier.powi(attempt as i32);
        raw.min(self.max_backoff_ms as f64) as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryRecord {
    pub attempt: u32,
    pub error: String,
    pub backoff_applied_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub kind: String,
    pub name: String,
    pub description: String,
    pub priority: TaskPriority,
    pub dependencies: Vec<TaskId>,
    pub assigned_to: Option<AgentId>,
    pub status: TaskStatus,
    pub input: serde_json::Value,
    pub output: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub timeout_ms: Option<u64>,
    pub retries: u32,
    pub max_retries: u32,
    pub retry_policy: RetryPolicy,
    pub retry_history: Vec<RetryRecord>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Task {
    #[must_use]
    pub fn new(kind: impl Into<String>, name: impl Into<String>, priority: TaskPriority) -> Self {
        Self {
            task_id: TaskId::new(),
            kind: kind.into(),
            name: name.into(),
            description: String::new(),
            priority,
            dependencies: Vec::new(),
            assigned_to: None,
            status: TaskStatus::Pending,
            input: serde_json::Value::Null,
            output: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            timeout_ms: None,
            retries: 0,
            max_retries: 3,
            retry_policy: RetryPolicy::default(),
            retry_history: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn transition(&mut self, to: TaskStatus) -> Result<(), SchedulerError> {
        if self.status.is_terminal() {
            return Err(SchedulerError::InvalidStatusTransition {
                from: format!("{:?}", self.status),
                to: format!("{to:?}"),
            });
        }
        self.status = to;
        match to {
            TaskStatus::Running => self.started_at = Some(Utc::now()),
            _ if to.is_terminal() => self.completed_at = Some(Utc::now()),
            _ => {}
        }
        Ok(())
    }

    /// Re-enters `pending`, incrementing the retry count and recording the
    /// backoff applied, or fails permanently past `max_retries`.
    pub fn retry(&mut self, error: impl Into<String>) -> Result<u64, SchedulerError> {
        if self.retries >= self.max_retries {
            self.status = TaskStatus::Failed;
            return Err(SchedulerError::MaxRetriesExceeded(self.task_id));
        }
        let backoff = self.retry_policy.backoff_for_attempt(self.retries);
        self.retry_history.push(RetryRecord {
            attempt: self.retries,
            error: error.into(),
            backoff_applied_ms: backoff,
        });
        self.retries += 1;
        self.status = TaskStatus::Pending;
        self.assigned_to = None;
        Ok(backoff)
    }
}

/// Summary result view for `results(id, "summary")`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResultSummary {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub duration_ms: Option<i64>,
}

/// Detailed result view for `results(id, "detailed")`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResultDetailed {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub duration_ms: Option<i64>,
    pub output: Option<serde_json::Value>,
    pub retry_history: Vec<RetryRecord>,
}

impl Task {
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }

    #[must_use]
    pub fn result_summary(&self) -> TaskResultSummary {
        TaskResultSummary {
            task_id: self.task_id,
            status: self.status,
            duration_ms: self.duration_ms(),
        }
    }

    #[must_use]
    pub fn result_detailed(&self) -> TaskResultDetailed {
        TaskResultDetailed {
            task_id: self.task_id,
            status: self.status,
            duration_ms: self.duration_ms(),
            output: self.output.clone(),
            retry_history: self.retry_history.clone(),
        }
    }
}

/// Dependency graph over a task set, grounded in the teacher's DAG model:
/// cycle detection via DFS, topological order via Kahn's algorithm, and
/// execution waves grouping ready tasks into parallel batches.
#[derive(Debug, Default)]
pub struct TaskGraph {
    dependents: HashMap<TaskId, Vec<TaskId>>,
    dependencies: HashMap<TaskId, Vec<TaskId>>,
    nodes: HashSet<TaskId>,
}

impl TaskGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task_id: TaskId, dependencies: Vec<TaskId>) {
        self.nodes.insert(task_id);
        for dep in &dependencies {
            self.nodes.insert(*dep);
            self.dependents.entry(*dep).or_default().push(task_id);
        }
        self.dependencies.insert(task_id, dependencies);
    }

    /// Rejects an insertion that would introduce a cycle. Returns the
    /// task that would close the cycle.
    pub fn would_cycle(&self, task_id: TaskId, new_dependencies: &[TaskId]) -> Option<TaskId> {
        let mut stack: Vec<TaskId> = new_dependencies.to_vec();
        let mut visited: HashSet<TaskId> = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == task_id {
                return Some(current);
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(deps) = self.dependencies.get(&current) {
                stack.extend(deps.iter().copied());
            }
        }
        None
    }

    #[must_use]
    pub fn dependencies_of(&self, task_id: TaskId) -> &[TaskId] {
        self.dependencies
            .get(&task_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All transitive dependents of `task_id`, computed on demand (no
    /// persisted closure is maintained).
    #[must_use]
    pub fn transitive_dependents(&self, task_id: TaskId) -> HashSet<TaskId> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<TaskId> = VecDeque::new();
        queue.push_back(task_id);
        while let Some(current) = queue.pop_front() {
            if let Some(direct) = self.dependents.get(&current) {
                for &d in direct {
                    if seen.insert(d) {
                        queue.push_back(d);
                    }
                }
            }
        }
        seen
    }

    /// Topological order via Kahn's algorithm; `None` if a cycle exists.
    #[must_use]
    pub fn topological_order(&self) -> Option<Vec<TaskId>> {
        let mut in_degree: HashMap<TaskId, usize> =
            self.nodes.iter().map(|&n| (n, 0)).collect();
        for (&task, deps) in &self.dependencies {
            *in_degree.entry(task).or_insert(0) = deps.len();
        }

        let mut queue: VecDeque<TaskId> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&n, _)| n)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(current) = queue.pop_front() {
            order.push(current);
            if let Some(dependents) = self.dependents.get(&current) {
                for &dep in dependents {
                    if let Some(deg) = in_degree.get_mut(&dep) {
                        *deg -= 1;
                        if *deg == 0 {
                            queue.push_back(dep);
                        }
                    }
                }
            }
        }

        if order.len() == self.nodes.len() {
            Some(order)
        } else {
            None
        }
    }

    /// Groups tasks into parallel execution waves: wave N contains every
    /// task whose dependencies all finished by wave N-1.
    #[must_use]
    pub fn execution_waves(&self) -> Vec<Vec<TaskId>> {
        let mut remaining: HashMap<TaskId, HashSet<TaskId>> = self
            .nodes
            .iter()
            .map(|&n| {
                (
                    n,
                    self.dependencies
                        .get(&n)
                        .cloned()
                        .unwrap_or_default()
                        .into_iter()
                        .collect(),
                )
            })
            .collect();

        let mut waves = Vec::new();
        let mut done: HashSet<TaskId> = HashSet::new();

        while done.len() < self.nodes.len() {
            let ready: Vec<TaskId> = remaining
                .iter()
                .filter(|(id, deps)| !done.contains(*id) && deps.is_empty())
                .map(|(&id, _)| id)
                .collect();
            if ready.is_empty() {
                break; // cycle; caller should have rejected this already
            }
            for &id in &ready {
                done.insert(id);
            }
            for deps in remaining.values_mut() {
                for id in &ready {
                    deps.remove(id);
                }
            }
            waves.push(ready);
        }
        waves
    }
}

/// FIFO-tie-break priority queue over ready tasks, grounded in the
/// teacher's `TaskQueue<T>`: ordered insertion keeps higher-priority,
/// earlier-submitted tasks at the front.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    items: VecDeque<TaskId>,
}

impl ReadyQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts respecting descending priority with FIFO tie-break, given
    /// a lookup for comparison.
    pub fn push_ordered(&mut self, task_id: TaskId, priority: TaskPriority, lookup: &HashMap<TaskId, TaskPriority>) {
        let pos = self
            .items
            .iter()
            .position(|existing| {
                lookup
                    .get(existing)
                    .is_some_and(|&p| p < priority)
            })
            .unwrap_or(self.items.len());
        self.items.insert(pos, task_id);
    }

    pub fn pop(&mut self) -> Option<TaskId> {
        self.items.pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for_attempt(0), 200);
        assert_eq!(policy.backoff_for_attempt(1), 400);
        assert_eq!(policy.backoff_for_attempt(20), 30_000);
    }

    #[test]
    fn retry_past_max_fails_permanently() {
        let mut task = Task::new("generic", "t1", TaskPriority::Normal);
        task.max_retries = 1;
        task.retry("boom").unwrap();
        let err = task.retry("boom again").unwrap_err();
        assert!(matches!(err, SchedulerError::MaxRetriesExceeded(_)));
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[test]
    fn terminal_status_is_immutable() {
        let mut task = Task::new("generic", "t1", TaskPriority::Normal);
        task.transition(TaskStatus::Completed).unwrap();
        let err = task.transition(TaskStatus::Running).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn cycle_detection_rejects_self_referential_chain() {
        let mut graph = TaskGraph::new();
        let a = TaskId::new();
        let b = TaskId::new();
        graph.insert(a, vec![]);
        graph.insert(b, vec![a]);
        // b depends on a; adding a->b would cycle
        assert_eq!(graph.would_cycle(a, &[b]), Some(a));
        assert!(graph.would_cycle(b, &[a]).is_none());
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let mut graph = TaskGraph::new();
        let a = TaskId::new();
        let b = TaskId::new();
        let c = TaskId::new();
        graph.insert(a, vec![]);
        graph.insert(b, vec![a]);
        graph.insert(c, vec![b]);
        let order = graph.topological_order().unwrap();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn execution_waves_group_independent_tasks() {
        let mut graph = TaskGraph::new();
        let a = TaskId::new();
        let b = TaskId::new();
        let c = TaskId::new();
        graph.insert(a, vec![]);
        graph.insert(b, vec![]);
        graph.insert(c, vec![a, b]);
        let waves = graph.execution_waves();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].len(), 2);
        assert_eq!(waves[1], vec![c]);
    }

    #[test]
    fn transitive_dependents_computed_on_demand() {
        let mut graph = TaskGraph::new();
        let a = TaskId::new();
        let b = TaskId::new();
        let c = TaskId::new();
        graph.insert(a, vec![]);
        graph.insert(b, vec![a]);
        graph.insert(c, vec![b]);
        let dependents = graph.transitive_dependents(a);
        assert!(dependents.contains(&b));
        assert!(dependents.contains(&c));
    }

    #[test]
    fn ready_queue_orders_by_priority_then_fifo() {
        let mut queue = ReadyQueue::new();
        let mut lookup = HashMap::new();
        let low = Task::new("k", "low", TaskPriority::Low);
        let crit = Task::new("k", "crit", TaskPriority::Critical);
        lookup.insert(low.task_id, TaskPriority::Low);
        lookup.insert(crit.task_id, TaskPriority::Critical);
        queue.push_ordered(low.task_id, TaskPriority::Low, &lookup);
        queue.push_ordered(crit.task_id, TaskPriority::Critical, &lookup);
        assert_eq!(queue.pop(), Some(crit.task_id));
        assert_eq!(queue.pop(), Some(low.task_id));
    }
}
