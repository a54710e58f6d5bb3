//! RPC / control-plane layer (C8). Bundles every C2-C7 service behind one
//! `Coordinator`, grounded in the teacher's `AppState`-style struct handed
//! to its stdio and HTTP MCP servers.

pub mod methods;
pub mod server;
pub mod session_manager;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::domain::ids::AgentId;
use crate::domain::models::config::Config;
use crate::domain::models::consensus::{ProposalExtra, RaftExtra};
use crate::domain::ports::{LlmProvider, Storage};
use crate::infrastructure::logging::ReloadHandle;
use crate::services::consensus::{Algorithm, GossipProtocol, PbftProtocol, RaftProtocol};
use crate::services::{
    AgentRegistry, AgentRegistryConfig, ConnectionPool, ConnectionPoolConfig, ConsensusCore,
    ConsensusCoreConfig, EventBus, EventBusConfig, RateLimiter, RateLimiterConfig, Scheduler,
    SchedulerConfig, TopologyManager, TopologyManagerConfig,
};
use session_manager::{SessionManager, SessionManagerConfig};

/// The configured consensus protocol overlay, selected once at startup
/// from `ConsensusConfig::algorithm` and never swapped at runtime.
enum ConsensusProtocol {
    Raft(RaftProtocol),
    Pbft(PbftProtocol),
    Gossip(GossipProtocol),
}

/// Every service the RPC dispatch table needs, held behind `Arc` so the
/// stdio loop, the HTTP server, and the background maintenance tasks can
/// all share one instance.
pub struct Coordinator {
    pub agents: Arc<AgentRegistry>,
    pub scheduler: Arc<Scheduler>,
    pub topology: Arc<TopologyManager>,
    pub consensus: Arc<ConsensusCore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub pool: Arc<ConnectionPool>,
    pub events: Arc<EventBus>,
    pub sessions: Arc<SessionManager>,
    pub llm_provider: Option<Arc<dyn LlmProvider>>,
    pub storage: Option<Arc<dyn Storage>>,
    protocol: ConsensusProtocol,
    raft_self: AgentId,
    log_reload: Option<ReloadHandle>,
    proposal_term: AtomicU64,
    topology_auto_rebalance: bool,
}

impl Coordinator {
    #[must_use]
    pub fn new(
        config: &Config,
        llm_provider: Option<Arc<dyn LlmProvider>>,
        storage: Option<Arc<dyn Storage>>,
        log_reload: Option<ReloadHandle>,
    ) -> Self {
        let raft_self = AgentId::new();
        let algorithm = Algorithm::parse(&config.consensus.algorithm);
        let protocol = match algorithm {
            Algorithm::Raft => ConsensusProtocol::Raft(RaftProtocol::new(raft_self)),
            Algorithm::Pbft => ConsensusProtocol::Pbft(PbftProtocol::new()),
            Algorithm::Gossip => {
                ConsensusProtocol::Gossip(GossipProtocol::new(config.consensus.max_hops, config.consensus.fanout))
            }
        };

        Self {
            agents: Arc::new(AgentRegistry::new(AgentRegistryConfig {
                max_agents: config.max_agents,
                dead_after_ms: config.dead_after_ms,
            })),
            scheduler: Arc::new(Scheduler::new(SchedulerConfig {
                max_tasks: config.max_tasks,
                strategy: crate::services::AssignmentStrategy::parse(&config.scheduler.assignment_strategy),
            })),
            topology: Arc::new(TopologyManager::new(TopologyManagerConfig {
                kind: parse_topology_kind(&config.topology.kind),
                mesh_fanout: config.topology.mesh_fanout,
                min_mesh_degree: config.topology.mesh_target_degree,
                max_agents: config.topology.max_agents,
                partition_strategy: crate::services::PartitionStrategy::parse(&config.topology.partition_strategy),
                failover_enabled: config.topology.failover_enabled,
            })),
            consensus: Arc::new(ConsensusCore::new(
                ConsensusCoreConfig {
                    algorithm,
                    threshold: config.consensus.threshold,
                    max_faulty_nodes: config.consensus.max_faulty_nodes,
                    timeout_ms: config.consensus.timeout_ms,
                },
                1,
            )),
            rate_limiter: Arc::new(RateLimiter::new(RateLimiterConfig {
                requests_per_second: config.rate_limit.requests_per_second,
                burst_size: config.rate_limit.burst_size,
                per_session_limit: config.rate_limit.per_session_limit,
                exempt_methods: vec!["initialize".to_string()],
            })),
            pool: Arc::new(ConnectionPool::new(ConnectionPoolConfig {
                min: config.pool.min,
                max: config.pool.max,
                idle_timeout_ms: config.pool.idle_timeout_ms,
                acquire_timeout_ms: config.pool.acquire_timeout_ms,
                max_waiting_clients: config.pool.max_waiting_clients,
                drain_timeout_ms: config.pool.drain_timeout_ms,
            })),
            events: Arc::new(EventBus::new(EventBusConfig::default())),
            sessions: Arc::new(SessionManager::new(SessionManagerConfig {
                max_sessions: config.session.max,
                timeout_ms: config.session.timeout_ms,
            })),
            llm_provider,
            storage,
            protocol,
            raft_self,
            log_reload,
            proposal_term: AtomicU64::new(0),
            topology_auto_rebalance: config.topology.auto_rebalance,
        }
    }

    /// Returns the term/view to attach to the next proposal, advancing it
    /// for the protocols that require a monotonic counter.
    pub async fn consensus_term(&self) -> u64 {
        match &self.protocol {
            ConsensusProtocol::Raft(raft) => raft.current_term(),
            ConsensusProtocol::Pbft(pbft) => pbft.current_view(),
            ConsensusProtocol::Gossip(_) => self.proposal_term.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Builds the protocol-specific `ProposalExtra` for a proposal raised
    /// by `proposer` carrying `value`, per the overlay selected at
    /// construction time.
    pub async fn consensus_extra(&self, proposer: AgentId, value: &serde_json::Value) -> ProposalExtra {
        match &self.protocol {
            ConsensusProtocol::Raft(raft) => ProposalExtra::Raft(RaftExtra {
                log_index: raft.next_extra().log_index,
                prev_log_term: raft.current_term(),
            }),
            ConsensusProtocol::Pbft(pbft) => {
                let _ = self.raft_self;
                ProposalExtra::Pbft(pbft.pre_prepare(value))
            }
            ConsensusProtocol::Gossip(gossip) => ProposalExtra::Gossip(gossip.originate(proposer)),
        }
    }

    pub fn set_log_level(&self, level: &str) -> Result<(), String> {
        match &self.log_reload {
            Some(handle) => handle.set_level(level),
            None => Err("log level reloading is not wired for this coordinator".to_string()),
        }
    }

    /// Spawns the periodic maintenance loops: agent health sweep, task
    /// timeout enforcement, consensus proposal expiry, connection pool
    /// eviction, and session timeout sweep.
    pub fn spawn_background_loops(self: &Arc<Self>, health_check_interval_ms: u64) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(health_check_interval_ms));
            loop {
                ticker.tick().await;
                for (agent_id, task_id) in coordinator.agents.sweep_dead().await {
                    coordinator.events.publish(
                        crate::services::EventSeverity::Warning,
                        crate::services::EventCategory::Agent,
                        crate::services::EventPayload::AgentMarkedDead { agent_id },
                    );
                    coordinator.topology.mark_stale(agent_id).await;
                    coordinator.events.publish(
                        crate::services::EventSeverity::Info,
                        crate::services::EventCategory::Topology,
                        crate::services::EventPayload::TopologyNodeMarkedStale { agent_id },
                    );
                    if let Some(task_id) = task_id {
                        if let Err(err) = coordinator.scheduler.fail(task_id, "agent became unreachable").await {
                            tracing::warn!(task_id = %task_id, error = %err, "failed to requeue task after agent death");
                        }
                    }
                }
                for (task_id, agent_id) in coordinator.scheduler.enforce_timeouts(chrono::Utc::now()).await {
                    coordinator.events.publish(
                        crate::services::EventSeverity::Warning,
                        crate::services::EventCategory::Task,
                        crate::services::EventPayload::TaskTimedOut { task_id },
                    );
                    if let Some(agent_id) = agent_id {
                        if let Err(err) = coordinator.agents.release(agent_id).await {
                            tracing::warn!(agent_id = %agent_id, error = %err, "failed to release agent slot after task timeout");
                        }
                    }
                }
                for proposal_id in coordinator.consensus.expire_overdue(chrono::Utc::now()).await {
                    coordinator.events.publish(
                        crate::services::EventSeverity::Warning,
                        crate::services::EventCategory::Consensus,
                        crate::services::EventPayload::ConsensusExpired { proposal_id },
                    );
                }
                coordinator.pool.evict_idle().await;
                for session_id in coordinator.sessions.sweep_timeouts().await {
                    coordinator.rate_limiter.drop_session(session_id).await;
                }
                if coordinator.topology_auto_rebalance {
                    if let Ok(version) = coordinator.topology.rebalance().await {
                        coordinator.events.publish(
                            crate::services::EventSeverity::Debug,
                            crate::services::EventCategory::Topology,
                            crate::services::EventPayload::TopologyRebalanced { version },
                        );
                    }
                }
            }
        });
    }
}

fn parse_topology_kind(value: &str) -> crate::domain::models::topology::TopologyKind {
    use crate::domain::models::topology::TopologyKind;
    match value {
        "mesh" => TopologyKind::Mesh,
        "centralized" => TopologyKind::Centralized,
        "hybrid" => TopologyKind::Hybrid,
        _ => TopologyKind::Hierarchical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn coordinator_builds_from_default_config() {
        let config = Config::default();
        let coordinator = Coordinator::new(&config, None, None, None);
        assert_eq!(coordinator.agents.get_metrics().await.active, 0);
        assert_eq!(coordinator.scheduler.len().await, 0);
    }

    #[tokio::test]
    async fn consensus_term_advances_for_raft() {
        let config = Config::default();
        let coordinator = Coordinator::new(&config, None, None, None);
        let first = coordinator.consensus_term().await;
        assert_eq!(first, 0);
    }
}
