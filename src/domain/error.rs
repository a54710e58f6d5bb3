//! Domain error types, one enum per component.
//!
//! Each enum follows the same shape: `thiserror`-derived variants with
//! `is_transient()` / `is_permanent()` classifiers where retry behavior
//! depends on the failure kind. The RPC surface maps these to JSON-RPC
//! error codes through `From` impls in `crate::rpc::methods`, never by
//! matching on the `Display` string.

use thiserror::Error;

use crate::domain::ids::{AgentId, PartitionId, ProposalId, SessionId, TaskId};

/// Errors raised by the agent registry (C2).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("agent not found: {0}")]
    NotFound(AgentId),

    #[error("agent already registered: {0}")]
    AlreadyExists(AgentId),

    #[error("registry at capacity: {current}/{max}")]
    CapacityExceeded { current: usize, max: usize },

    #[error("workload {0} is outside [0, 1]")]
    InvalidWorkload(f64),

    #[error("health {0} is outside [0, 1]")]
    InvalidHealth(f64),

    #[error("agent {agent} is {status} and cannot accept task {task}")]
    NotAvailable {
        agent: AgentId,
        status: String,
        task: TaskId,
    },

    #[error("agent {0} missed its heartbeat deadline")]
    HeartbeatExpired(AgentId),
}

impl AgentError {
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists(_) | Self::InvalidWorkload(_) | Self::InvalidHealth(_)
        )
    }

    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !self.is_permanent()
    }
}

/// Errors raised by the topology manager (C3).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("node not found: {0}")]
    NodeNotFound(AgentId),

    #[error("self-loop edges are not allowed: {0}")]
    SelfLoop(AgentId),

    #[error("hierarchical topology requires exactly one queen, found {0}")]
    InvalidQueenCount(usize),

    #[error("centralized topology requires exactly one coordinator, found {0}")]
    InvalidCoordinatorCount(usize),

    #[error("mesh topology average degree {actual} is below the minimum {required}")]
    InsufficientMeshDegree { actual: f64, required: f64 },

    #[error("partition not found: {0}")]
    PartitionNotFound(PartitionId),

    #[error("no leader available for partition {0}")]
    NoLeaderAvailable(PartitionId),

    #[error("rebalance already in progress")]
    RebalanceInProgress,

    #[error("node already joined: {0}")]
    AlreadyExists(AgentId),

    #[error("topology at capacity: {current}/{max}")]
    CapacityExceeded { current: usize, max: usize },
}

impl TopologyError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NoLeaderAvailable(_) | Self::RebalanceInProgress)
    }
}

/// Errors raised by the task graph and scheduler (C4).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("task already exists: {0}")]
    AlreadyExists(TaskId),

    #[error("adding this dependency would create a cycle through {0}")]
    CircularDependency(TaskId),

    #[error("task {0} is blocked by {1} unresolved dependencies")]
    BlockedByDependencies(TaskId, usize),

    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("task {0} has exceeded its maximum retry count")]
    MaxRetriesExceeded(TaskId),

    #[error("task {0} timed out after {1}ms")]
    TimedOut(TaskId, u64),

    #[error("no agent satisfies the capability requirements for task {0}")]
    NoEligibleAgent(TaskId),

    #[error("scheduler queue at capacity: {current}/{max}")]
    CapacityExceeded { current: usize, max: usize },
}

impl SchedulerError {
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists(_)
                | Self::CircularDependency(_)
                | Self::MaxRetriesExceeded(_)
                | Self::InvalidStatusTransition { .. }
        )
    }

    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !self.is_permanent()
    }
}

/// Errors raised by the consensus core (C5).
///
/// `Violation` is fatal: it halts the owning protocol instance and emits
/// `critical_invariant_violated` rather than being retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsensusError {
    #[error("proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("proposal {0} already decided")]
    AlreadyDecided(ProposalId),

    #[error("proposal {0} expired before reaching quorum")]
    Expired(ProposalId),

    #[error("term/view {0} is stale, current is {1}")]
    StaleTerm(u64, u64),

    #[error("quorum not reached: {votes}/{required}")]
    QuorumNotReached { votes: usize, required: usize },

    #[error("safety invariant violated: {0}")]
    Violation(String),

    #[error("no leader elected for partition {0}")]
    NoLeader(PartitionId),
}

impl ConsensusError {
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Violation(_))
    }

    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Expired(_) | Self::QuorumNotReached { .. } | Self::NoLeader(_)
        )
    }
}

/// Errors raised by the rate limiter (C6).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateLimitError {
    #[error("global rate limit exceeded, retry after {retry_after_ms}ms")]
    GlobalExceeded { retry_after_ms: u64 },

    #[error("per-session rate limit exceeded for {session}, retry after {retry_after_ms}ms")]
    SessionExceeded {
        session: SessionId,
        retry_after_ms: u64,
    },
}

impl RateLimitError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        true
    }

    #[must_use]
    pub const fn retry_after_ms(&self) -> u64 {
        match self {
            Self::GlobalExceeded { retry_after_ms } | Self::SessionExceeded { retry_after_ms, .. } => {
                *retry_after_ms
            }
        }
    }
}

/// Errors raised by the connection pool (C7).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    #[error("pool exhausted: {busy}/{max} connections in use")]
    Exhausted { busy: usize, max: usize },

    #[error("acquire timed out after {0}ms")]
    AcquireTimeout(u64),

    #[error("too many waiting clients: {current}/{max}")]
    TooManyWaiters { current: usize, max: usize },

    #[error("pool is draining and accepts no new acquisitions")]
    Draining,
}

impl PoolError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::Draining)
    }
}

/// Errors raised by the RPC surface and session manager (C8).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    #[error("jsonrpc version mismatch")]
    VersionMismatch,

    #[error("failed to parse request: {0}")]
    ParseFailure(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("message exceeds maximum size of {max} bytes")]
    MessageTooLarge { max: usize },

    /// A component-level error surfaced to the RPC client. `code` falls in
    /// the reserved `-32000..-32099` band; `slug` is carried in the response
    /// payload's `data.kind` field for machine-readable dispatch.
    #[error("{slug}: {message}")]
    Domain {
        code: i64,
        slug: &'static str,
        message: String,
    },
}

impl RpcError {
    /// Maps a domain error to its JSON-RPC 2.0 error code.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::VersionMismatch => -32600,
            Self::ParseFailure(_) | Self::MessageTooLarge { .. } => -32700,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::Internal(_) => -32603,
            Self::Domain { code, .. } => *code,
        }
    }

    #[must_use]
    pub fn slug(&self) -> Option<&'static str> {
        match self {
            Self::Domain { slug, .. } => Some(slug),
            _ => None,
        }
    }
}

/// Rate limit rejections map to a single literal code: everything past
/// the configured burst gets `-32000 rate_limit_exceeded`.
impl From<RateLimitError> for RpcError {
    fn from(err: RateLimitError) -> Self {
        Self::Domain {
            code: -32000,
            slug: "rate_limit_exceeded",
            message: err.to_string(),
        }
    }
}

impl From<AgentError> for RpcError {
    fn from(err: AgentError) -> Self {
        let code = match &err {
            AgentError::NotFound(_) => -32010,
            AgentError::AlreadyExists(_) => -32011,
            AgentError::CapacityExceeded { .. } => -32012,
            AgentError::InvalidWorkload(_) => -32013,
            AgentError::InvalidHealth(_) => -32014,
            AgentError::NotAvailable { .. } => -32015,
            AgentError::HeartbeatExpired(_) => -32016,
        };
        Self::Domain {
            code,
            slug: "agent_error",
            message: err.to_string(),
        }
    }
}

impl From<TopologyError> for RpcError {
    fn from(err: TopologyError) -> Self {
        let code = match &err {
            TopologyError::NodeNotFound(_) => -32020,
            TopologyError::SelfLoop(_) => -32021,
            TopologyError::InvalidQueenCount(_) => -32022,
            TopologyError::InvalidCoordinatorCount(_) => -32023,
            TopologyError::InsufficientMeshDegree { .. } => -32024,
            TopologyError::PartitionNotFound(_) => -32025,
            TopologyError::NoLeaderAvailable(_) => -32026,
            TopologyError::RebalanceInProgress => -32027,
            TopologyError::AlreadyExists(_) => -32028,
            TopologyError::CapacityExceeded { .. } => -32029,
        };
        Self::Domain {
            code,
            slug: "topology_error",
            message: err.to_string(),
        }
    }
}

impl From<SchedulerError> for RpcError {
    fn from(err: SchedulerError) -> Self {
        let code = match &err {
            SchedulerError::NotFound(_) => -32030,
            SchedulerError::AlreadyExists(_) => -32031,
            SchedulerError::CircularDependency(_) => -32032,
            SchedulerError::BlockedByDependencies(..) => -32033,
            SchedulerError::InvalidStatusTransition { .. } => -32034,
            SchedulerError::MaxRetriesExceeded(_) => -32035,
            SchedulerError::TimedOut(..) => -32036,
            SchedulerError::NoEligibleAgent(_) => -32037,
            SchedulerError::CapacityExceeded { .. } => -32038,
        };
        Self::Domain {
            code,
            slug: "scheduler_error",
            message: err.to_string(),
        }
    }
}

impl From<ConsensusError> for RpcError {
    fn from(err: ConsensusError) -> Self {
        let code = match &err {
            ConsensusError::ProposalNotFound(_) => -32040,
            ConsensusError::AlreadyDecided(_) => -32041,
            ConsensusError::Expired(_) => -32042,
            ConsensusError::StaleTerm(..) => -32043,
            ConsensusError::QuorumNotReached { .. } => -32044,
            ConsensusError::Violation(_) => -32045,
            ConsensusError::NoLeader(_) => -32046,
        };
        Self::Domain {
            code,
            slug: "consensus_error",
            message: err.to_string(),
        }
    }
}

impl From<PoolError> for RpcError {
    fn from(err: PoolError) -> Self {
        let code = match &err {
            PoolError::Exhausted { .. } => -32050,
            PoolError::AcquireTimeout(_) => -32051,
            PoolError::TooManyWaiters { .. } => -32052,
            PoolError::Draining => -32053,
        };
        Self::Domain {
            code,
            slug: "pool_error",
            message: err.to_string(),
        }
    }
}

impl From<SessionError> for RpcError {
    fn from(err: SessionError) -> Self {
        let code = match &err {
            SessionError::NotFound(_) => -32060,
            SessionError::NotInitialized(_) => -32061,
            SessionError::LimitReached { .. } => -32062,
            SessionError::AlreadySubscribed(..) => -32063,
            SessionError::NotSubscribed(..) => -32064,
            SessionError::TimedOut(..) => -32065,
        };
        Self::Domain {
            code,
            slug: "session_error",
            message: err.to_string(),
        }
    }
}

/// `sampling/createMessage` with no configured `LlmProvider` must return a
/// domain error rather than fall back to a silent default.
#[must_use]
pub fn sampling_unavailable_error() -> RpcError {
    RpcError::Domain {
        code: -32070,
        slug: "sampling_unavailable",
        message: "no sampling provider is configured".to_string(),
    }
}

/// Errors raised by session and subscription management (C8).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(SessionId),

    #[error("session {0} has not completed initialize")]
    NotInitialized(SessionId),

    #[error("session limit reached: {current}/{max}")]
    LimitReached { current: usize, max: usize },

    #[error("session {0} already subscribed to {1}")]
    AlreadySubscribed(SessionId, String),

    #[error("session {0} is not subscribed to {1}")]
    NotSubscribed(SessionId, String),

    #[error("session {0} timed out after {1}ms of inactivity")]
    TimedOut(SessionId, u64),
}

impl SessionError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::LimitReached { .. })
    }
}
