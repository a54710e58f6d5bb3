//! Domain layer for the Unified Swarm Coordinator.
//!
//! Pure business logic: identifiers, error types, and domain models.
//! Framework-agnostic; no tokio, no axum, no figment below this module.

pub mod error;
pub mod ids;
pub mod models;
pub mod ports;

pub use error::{
    AgentError, ConsensusError, PoolError, RateLimitError, RpcError, SchedulerError, SessionError,
    TopologyError,
};
pub use ids::{
    AgentId, LogicalClock, MonotonicInstant, PartitionId, ProposalId, SequenceNumber, SessionId,
    SubscriptionId, TaskId,
};
