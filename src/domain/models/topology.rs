//! Topology model: nodes, edges, partitions, and the four wiring policies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::ids::{AgentId, PartitionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    Mesh,
    Hierarchical,
    Centralized,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyRole {
    Queen,
    Coordinator,
    Peer,
    Worker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub agent_id: AgentId,
    pub role: TopologyRole,
    pub status: NodeStatus,
    pub connections: Vec<AgentId>,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: AgentId,
    pub to: AgentId,
    pub bidirectional: bool,
    pub weight: f64,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partition {
    pub partition_id: PartitionId,
    pub nodes: Vec<AgentId>,
    pub leader: Option<AgentId>,
    pub replication_factor: u32,
}

/// Monotonic version counter, bumped on every topology mutation and
/// exposed on the corresponding event.
pub type TopologyVersion = u64;
