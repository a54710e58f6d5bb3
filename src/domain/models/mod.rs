//! Pure domain entities: agents, tasks, topology, consensus, sessions,
//! the RPC envelope, and configuration. No infrastructure concerns.

pub mod agent;
pub mod config;
pub mod consensus;
pub mod rpc;
pub mod session;
pub mod task;
pub mod topology;

pub use agent::{Agent, AgentKind, AgentMetrics, AgentStatus, CapabilityLimits, Capabilities};
pub use config::Config;
pub use consensus::{
    GossipExtra, PbftExtra, PbftPhase, Proposal, ProposalExtra, ProposalStatus, RaftExtra, Vote,
};
pub use rpc::{JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
pub use session::{ClientInfo, RpcSession};
pub use task::{
    ReadyQueue, RetryPolicy, RetryRecord, Task, TaskGraph, TaskPriority, TaskResultDetailed,
    TaskResultSummary, TaskStatus,
};
pub use topology::{Edge, Node, NodeStatus, Partition, TopologyKind, TopologyRole, TopologyVersion};
