//! Topology manager (C3): wiring policy, partitioning, and leader
//! election over the agent set. Grounded in the teacher's swarm-topology
//! wiring pass, generalized to four wiring policies: mesh, hierarchical,
//! centralized, and hybrid.

use std::collections::{HashMap, VecDeque};

use tracing::info;

use crate::domain::error::TopologyError;
use crate::domain::ids::{AgentId, PartitionId};
use crate::domain::models::topology::{Edge, Node, NodeStatus, Partition, TopologyKind, TopologyRole, TopologyVersion};

/// How `create_partition` picks a leader from its node set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStrategy {
    FirstAvailable,
    RoundRobin,
    LeastLoaded,
}

impl PartitionStrategy {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "round_robin" => Self::RoundRobin,
            "least_loaded" => Self::LeastLoaded,
            _ => Self::FirstAvailable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TopologyManagerConfig {
    pub kind: TopologyKind,
    pub mesh_fanout: usize,
    pub min_mesh_degree: f64,
    pub max_agents: usize,
    pub partition_strategy: PartitionStrategy,
    /// Whether `leave` automatically re-elects a replacement leader.
    pub failover_enabled: bool,
}

impl Default for TopologyManagerConfig {
    fn default() -> Self {
        Self {
            kind: TopologyKind::Hierarchical,
            mesh_fanout: 4,
            min_mesh_degree: 2.0,
            max_agents: 1_000,
            partition_strategy: PartitionStrategy::FirstAvailable,
            failover_enabled: true,
        }
    }
}

struct TopologyState {
    nodes: HashMap<AgentId, Node>,
    edges: Vec<Edge>,
    partitions: HashMap<PartitionId, Partition>,
    version: TopologyVersion,
    rebalancing: bool,
    partition_round_robin_cursor: usize,
}

impl Default for TopologyState {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            partitions: HashMap::new(),
            version: 0,
            rebalancing: false,
            partition_round_robin_cursor: 0,
        }
    }
}

pub struct TopologyManager {
    state: tokio::sync::RwLock<TopologyState>,
    config: TopologyManagerConfig,
}

impl TopologyManager {
    #[must_use]
    pub fn new(config: TopologyManagerConfig) -> Self {
        Self {
            state: tokio::sync::RwLock::new(TopologyState::default()),
            config,
        }
    }

    /// Wires a newly joined node in per the configured topology kind.
    /// Rejects an agent already present and enforces `max_agents`.
    pub async fn join(&self, agent_id: AgentId, requested_role: Option<TopologyRole>) -> Result<TopologyRole, TopologyError> {
        let mut state = self.state.write().await;
        if state.nodes.contains_key(&agent_id) {
            return Err(TopologyError::AlreadyExists(agent_id));
        }
        if state.nodes.len() >= self.config.max_agents {
            return Err(TopologyError::CapacityExceeded {
                current: state.nodes.len(),
                max: self.config.max_agents,
            });
        }
        let role = match self.config.kind {
            TopologyKind::Mesh => TopologyRole::Peer,
            TopologyKind::Hierarchical => {
                let queens = state
                    .nodes
                    .values()
                    .filter(|n| n.role == TopologyRole::Queen)
                    .count();
                if queens == 0 {
                    TopologyRole::Queen
                } else {
                    requested_role.unwrap_or(TopologyRole::Worker)
                }
            }
            TopologyKind::Centralized => {
                let coordinators = state
                    .nodes
                    .values()
                    .filter(|n| n.role == TopologyRole::Coordinator)
                    .count();
                if coordinators == 0 {
                    TopologyRole::Coordinator
                } else {
                    TopologyRole::Worker
                }
            }
            TopologyKind::Hybrid => requested_role.unwrap_or(TopologyRole::Peer),
        };

        let node = Node {
            agent_id,
            role,
            status: NodeStatus::Active,
            connections: Vec::new(),
            metadata: HashMap::new(),
        };
        state.nodes.insert(agent_id, node);

        self.wire_edges(&mut state, agent_id, role)?;
        state.version += 1;
        info!(agent_id = %agent_id, role = ?role, version = state.version, "node joined topology");
        Ok(role)
    }

    fn wire_edges(&self, state: &mut TopologyState, agent_id: AgentId, role: TopologyRole) -> Result<(), TopologyError> {
        match self.config.kind {
            TopologyKind::Mesh => {
                let peers: Vec<AgentId> = state
                    .nodes
                    .keys()
                    .filter(|&&id| id != agent_id)
                    .take(self.config.mesh_fanout)
                    .copied()
                    .collect();
                for peer in peers {
                    self.connect(state, agent_id, peer)?;
                }
            }
            TopologyKind::Hierarchical => {
                if role != TopologyRole::Queen {
                    if let Some(&queen) = state
                        .nodes
                        .values()
                        .find(|n| n.role == TopologyRole::Queen)
                        .map(|n| &n.agent_id)
                    {
                        self.connect(state, agent_id, queen)?;
                    }
                }
            }
            TopologyKind::Centralized => {
                if role != TopologyRole::Coordinator {
                    if let Some(&coordinator) = state
                        .nodes
                        .values()
                        .find(|n| n.role == TopologyRole::Coordinator)
                        .map(|n| &n.agent_id)
                    {
                        self.connect(state, agent_id, coordinator)?;
                    }
                }
            }
            TopologyKind::Hybrid => {
                let peers: Vec<AgentId> = state
                    .nodes
                    .keys()
                    .filter(|&&id| id != agent_id)
                    .take(self.config.mesh_fanout.min(2))
                    .copied()
                    .collect();
                for peer in peers {
                    self.connect(state, agent_id, peer)?;
                }
            }
        }
        Ok(())
    }

    fn connect(&self, state: &mut TopologyState, from: AgentId, to: AgentId) -> Result<(), TopologyError> {
        if from == to {
            return Err(TopologyError::SelfLoop(from));
        }
        state.edges.push(Edge {
            from,
            to,
            bidirectional: true,
            weight: 1.0,
            metadata: HashMap::new(),
        });
        if let Some(node) = state.nodes.get_mut(&from) {
            node.connections.push(to);
        }
        if let Some(node) = state.nodes.get_mut(&to) {
            node.connections.push(from);
        }
        Ok(())
    }

    /// Removes `agent_id` from the topology. If it held the leader role for
    /// this topology kind, automatically elects a replacement and rewires.
    /// Returns the newly elected leader, if a re-election happened.
    pub async fn leave(&self, agent_id: AgentId) -> Result<Option<AgentId>, TopologyError> {
        let mut state = self.state.write().await;
        let departing = state.nodes.remove(&agent_id).ok_or(TopologyError::NodeNotFound(agent_id))?;
        state.edges.retain(|e| e.from != agent_id && e.to != agent_id);
        for node in state.nodes.values_mut() {
            node.connections.retain(|&id| id != agent_id);
        }
        state.version += 1;

        let new_leader = if self.config.failover_enabled && self.leader_role().is_some_and(|role| departing.role == role) {
            self.elect_leader_locked(&mut state)
        } else {
            None
        };
        Ok(new_leader)
    }

    /// Flags a node as stale after its agent missed a heartbeat deadline,
    /// without removing it from the topology. Tolerates the node already
    /// having left through a separate path.
    pub async fn mark_stale(&self, agent_id: AgentId) {
        let mut state = self.state.write().await;
        if let Some(node) = state.nodes.get_mut(&agent_id) {
            node.status = NodeStatus::Inactive;
        }
    }

    /// The role that structurally carries leadership for this topology
    /// kind, if any. Mesh and hybrid have no single leader role.
    const fn leader_role(&self) -> Option<TopologyRole> {
        match self.config.kind {
            TopologyKind::Hierarchical => Some(TopologyRole::Queen),
            TopologyKind::Centralized => Some(TopologyRole::Coordinator),
            TopologyKind::Mesh | TopologyKind::Hybrid => None,
        }
    }

    /// Bully-style election: the remaining active node with the lowest id
    /// is promoted to the leader role, and the topology is fully rewired
    /// around it. No-op (returns `None`) for topology kinds with no single
    /// leader role, or once a leader already exists.
    fn elect_leader_locked(&self, state: &mut TopologyState) -> Option<AgentId> {
        let leader_role = self.leader_role()?;
        if let Some(node) = state.nodes.values().find(|n| n.role == leader_role) {
            return Some(node.agent_id);
        }
        let winner = state.nodes.keys().min().copied()?;
        if let Some(node) = state.nodes.get_mut(&winner) {
            node.role = leader_role;
        }

        state.edges.clear();
        for node in state.nodes.values_mut() {
            node.connections.clear();
        }
        let agent_ids: Vec<AgentId> = state.nodes.keys().copied().collect();
        let roles: HashMap<AgentId, TopologyRole> = state.nodes.iter().map(|(&id, n)| (id, n.role)).collect();
        for &id in &agent_ids {
            let role = roles[&id];
            let _ = self.wire_edges(state, id, role);
        }
        state.version += 1;
        info!(agent_id = %winner, "node elected topology leader");
        Some(winner)
    }

    /// Topology-wide leader election, callable directly (not just from
    /// `leave`). Returns the current or newly elected leader.
    pub async fn elect_leader(&self) -> Option<AgentId> {
        let mut state = self.state.write().await;
        self.elect_leader_locked(&mut state)
    }

    /// Validates structural invariants per topology kind: exactly one
    /// queen for hierarchical, exactly one coordinator for centralized,
    /// minimum average degree for mesh.
    pub async fn validate(&self) -> Result<(), TopologyError> {
        let state = self.state.read().await;
        match self.config.kind {
            TopologyKind::Hierarchical => {
                let queens = state.nodes.values().filter(|n| n.role == TopologyRole::Queen).count();
                if queens != 1 && !state.nodes.is_empty() {
                    return Err(TopologyError::InvalidQueenCount(queens));
                }
            }
            TopologyKind::Centralized => {
                let coordinators = state
                    .nodes
                    .values()
                    .filter(|n| n.role == TopologyRole::Coordinator)
                    .count();
                if coordinators != 1 && !state.nodes.is_empty() {
                    return Err(TopologyError::InvalidCoordinatorCount(coordinators));
                }
            }
            TopologyKind::Mesh => {
                if !state.nodes.is_empty() {
                    let total_degree: usize = state.nodes.values().map(|n| n.connections.len()).sum();
                    let avg = total_degree as f64 / state.nodes.len() as f64;
                    if avg < self.config.min_mesh_degree {
                        return Err(TopologyError::InsufficientMeshDegree {
                            actual: avg,
                            required: self.config.min_mesh_degree,
                        });
                    }
                }
            }
            TopologyKind::Hybrid => {}
        }
        Ok(())
    }

    pub async fn create_partition(&self, nodes: Vec<AgentId>, replication_factor: u32) -> Result<PartitionId, TopologyError> {
        let mut state = self.state.write().await;
        let leader = self.pick_partition_leader(&state, &nodes);
        let partition = Partition {
            partition_id: PartitionId::new(),
            nodes,
            leader,
            replication_factor,
        };
        let id = partition.partition_id;
        state.partitions.insert(id, partition);
        Ok(id)
    }

    /// Picks a partition leader from `nodes` per the configured strategy.
    /// `LeastLoaded` uses each node's current connection count as a proxy
    /// for load, mirroring the scheduler's own least-loaded assignment.
    fn pick_partition_leader(&self, state: &mut TopologyState, nodes: &[AgentId]) -> Option<AgentId> {
        if nodes.is_empty() {
            return None;
        }
        match self.config.partition_strategy {
            PartitionStrategy::FirstAvailable => nodes.first().copied(),
            PartitionStrategy::RoundRobin => {
                let index = state.partition_round_robin_cursor % nodes.len();
                state.partition_round_robin_cursor = state.partition_round_robin_cursor.wrapping_add(1);
                nodes.get(index).copied()
            }
            PartitionStrategy::LeastLoaded => nodes
                .iter()
                .min_by_key(|id| state.nodes.get(id).map_or(0, |n| n.connections.len()))
                .copied(),
        }
    }

    /// Explicitly sets the leader of an existing partition to `candidate`,
    /// distinct from the topology-wide bully election in `elect_leader`.
    pub async fn set_partition_leader(&self, partition_id: PartitionId, candidate: AgentId) -> Result<(), TopologyError> {
        let mut state = self.state.write().await;
        let partition = state
            .partitions
            .get_mut(&partition_id)
            .ok_or(TopologyError::PartitionNotFound(partition_id))?;
        if !partition.nodes.contains(&candidate) {
            return Err(TopologyError::NoLeaderAvailable(partition_id));
        }
        partition.leader = Some(candidate);
        Ok(())
    }

    /// Rebalances node wiring under a throttle: refuses to start a second
    /// rebalance while one is in flight.
    pub async fn rebalance(&self) -> Result<TopologyVersion, TopologyError> {
        let mut state = self.state.write().await;
        if state.rebalancing {
            return Err(TopologyError::RebalanceInProgress);
        }
        state.rebalancing = true;
        state.edges.clear();
        for node in state.nodes.values_mut() {
            node.connections.clear();
        }
        let agent_ids: Vec<AgentId> = state.nodes.keys().copied().collect();
        let roles: HashMap<AgentId, TopologyRole> =
            state.nodes.iter().map(|(&id, n)| (id, n.role)).collect();
        for &agent_id in &agent_ids {
            let role = roles[&agent_id];
            self.wire_edges(&mut state, agent_id, role)?;
        }
        state.version += 1;
        state.rebalancing = false;
        Ok(state.version)
    }

    pub async fn version(&self) -> TopologyVersion {
        self.state.read().await.version
    }

    pub async fn node_count(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    /// Shortest path by hop count over the bidirectional edge set, ties
    /// broken by lowest total edge weight. `[src]` when `src == dst`;
    /// empty when `dst` is unreachable from `src`.
    pub async fn find_optimal_path(&self, src: AgentId, dst: AgentId) -> Vec<AgentId> {
        if src == dst {
            return vec![src];
        }
        let state = self.state.read().await;
        if !state.nodes.contains_key(&src) || !state.nodes.contains_key(&dst) {
            return Vec::new();
        }

        let mut adjacency: HashMap<AgentId, Vec<(AgentId, f64)>> = HashMap::new();
        for edge in &state.edges {
            adjacency.entry(edge.from).or_default().push((edge.to, edge.weight));
            if edge.bidirectional {
                adjacency.entry(edge.to).or_default().push((edge.from, edge.weight));
            }
        }

        let mut hop_dist: HashMap<AgentId, usize> = HashMap::new();
        hop_dist.insert(src, 0);
        let mut order = vec![src];
        let mut queue = VecDeque::from([src]);
        while let Some(current) = queue.pop_front() {
            let current_hops = hop_dist[&current];
            if let Some(neighbors) = adjacency.get(&current) {
                for &(next, _) in neighbors {
                    if hop_dist.contains_key(&next) {
                        continue;
                    }
                    hop_dist.insert(next, current_hops + 1);
                    order.push(next);
                    queue.push_back(next);
                }
            }
        }

        if !hop_dist.contains_key(&dst) {
            return Vec::new();
        }

        let mut best_weight: HashMap<AgentId, f64> = HashMap::new();
        let mut best_pred: HashMap<AgentId, AgentId> = HashMap::new();
        best_weight.insert(src, 0.0);
        for &node in &order {
            let node_hops = hop_dist[&node];
            let Some(neighbors) = adjacency.get(&node) else { continue };
            for &(next, weight) in neighbors {
                if hop_dist.get(&next) != Some(&(node_hops + 1)) {
                    continue;
                }
                let candidate = best_weight[&node] + weight;
                let better = match best_weight.get(&next) {
                    Some(&existing) => candidate < existing,
                    None => true,
                };
                if better {
                    best_weight.insert(next, candidate);
                    best_pred.insert(next, node);
                }
            }
        }

        let mut path = vec![dst];
        let mut current = dst;
        while current != src {
            current = best_pred[&current];
            path.push(current);
        }
        path.reverse();
        path
    }
}
