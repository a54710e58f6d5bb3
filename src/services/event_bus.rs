//! Event bus and metrics export (C9): a broadcast channel of
//! `UnifiedEvent`s with monotonic sequencing and correlation-id
//! propagation. Grounded in the teacher's `EventBus`/`UnifiedEvent`
//! mechanism; the payload enum below is USC-specific.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::ids::{AgentId, LogicalClock, PartitionId, ProposalId, SequenceCounter, SequenceNumber, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Agent,
    Topology,
    Task,
    Consensus,
    RateLimit,
    Pool,
    Session,
    System,
}

/// USC-specific event payloads, one variant per notable state change
/// across C2-C8.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    AgentRegistered { agent_id: AgentId },
    AgentUnregistered { agent_id: AgentId },
    AgentStatusChanged { agent_id: AgentId, status: String },
    AgentMarkedDead { agent_id: AgentId },

    TopologyNodeJoined { agent_id: AgentId, role: String },
    TopologyNodeLeft { agent_id: AgentId },
    TopologyRebalanced { version: u64 },
    TopologyPartitionCreated { partition_id: PartitionId },
    TopologyLeaderElected { partition_id: PartitionId, leader: AgentId },
    TopologyLeaderChanged { agent_id: AgentId },
    TopologyNodeMarkedStale { agent_id: AgentId },

    TaskSubmitted { task_id: TaskId },
    TaskAssigned { task_id: TaskId, agent_id: AgentId },
    TaskCompleted { task_id: TaskId },
    TaskFailed { task_id: TaskId, retry_in_ms: Option<u64> },
    TaskTimedOut { task_id: TaskId },
    TaskCancelled { task_id: TaskId },

    ConsensusProposed { proposal_id: ProposalId },
    ConsensusCommitted { proposal_id: ProposalId },
    ConsensusExpired { proposal_id: ProposalId },
    ConsensusViolation { proposal_id: ProposalId, detail: String },

    RateLimitRejected { session_id: Option<String> },
    PoolExhausted { busy: u32, max: u32 },

    SessionOpened { session_id: String },
    SessionClosed { session_id: String },
    SessionTimedOut { session_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedEvent {
    pub sequence: SequenceNumber,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub severity: EventSeverity,
    pub category: EventCategory,
    pub correlation_id: Option<String>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone)]
pub struct EventBusConfig {
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { channel_capacity: 4096 }
    }
}

/// Broadcasts `UnifiedEvent`s to any number of subscribers (the RPC
/// session manager's `resources/subscribe` fan-out, plus internal
/// observers). Lagging subscribers drop old events rather than blocking
/// publishers, per `tokio::sync::broadcast` semantics.
pub struct EventBus {
    sender: broadcast::Sender<UnifiedEvent>,
    sequence: Arc<SequenceCounter>,
}

impl EventBus {
    #[must_use]
    pub fn new(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity);
        Self {
            sender,
            sequence: Arc::new(SequenceCounter::new()),
        }
    }

    pub fn publish(&self, severity: EventSeverity, category: EventCategory, payload: EventPayload) -> SequenceNumber {
        self.publish_correlated(severity, category, payload, None)
    }

    pub fn publish_correlated(
        &self,
        severity: EventSeverity,
        category: EventCategory,
        payload: EventPayload,
        correlation_id: Option<String>,
    ) -> SequenceNumber {
        let sequence = self.sequence.next();
        let event = UnifiedEvent {
            sequence,
            timestamp: LogicalClock::now_wall(),
            severity,
            category,
            correlation_id,
            payload,
        };
        trace!(sequence = sequence.0, ?category, "event published");
        // Errors here mean there are currently no subscribers; that is
        // not a publish failure, so the result is intentionally ignored.
        let _ = self.sender.send(event);
        sequence
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<UnifiedEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn current_sequence(&self) -> SequenceNumber {
        self.sequence.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_events_carry_strictly_increasing_sequence() {
        let bus = EventBus::new(EventBusConfig::default());
        let mut rx = bus.subscribe();
        bus.publish(
            EventSeverity::Info,
            EventCategory::Agent,
            EventPayload::AgentRegistered { agent_id: AgentId::new() },
        );
        bus.publish(
            EventSeverity::Info,
            EventCategory::Task,
            EventPayload::TaskSubmitted { task_id: TaskId::new() },
        );
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(second.sequence.0 > first.sequence.0);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(EventBusConfig::default());
        let mut rx = bus.subscribe();
        bus.publish(
            EventSeverity::Warning,
            EventCategory::RateLimit,
            EventPayload::RateLimitRejected { session_id: None },
        );
        let event = rx.recv().await.unwrap();
        assert_eq!(event.severity, EventSeverity::Warning);
        assert!(matches!(event.payload, EventPayload::RateLimitRejected { .. }));
    }
}
