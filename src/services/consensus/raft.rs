//! Raft protocol overlay: leader election and log replication bookkeeping
//! on top of the shared `ConsensusCore` proposal store.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::domain::ids::AgentId;
use crate::domain::models::consensus::RaftExtra;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaftRole {
    Follower,
    Candidate,
    Leader,
}

struct RaftState {
    term: u64,
    role: RaftRole,
    voted_for: Option<AgentId>,
    log_index: u64,
    votes_received: HashSet<AgentId>,
}

/// Per-node Raft state: current term, role, vote bookkeeping, and the
/// next log index to assign. `ConsensusCore` owns proposal storage and
/// quorum counting; this struct only tracks what is specific to the
/// Raft overlay.
pub struct RaftProtocol {
    state: Mutex<RaftState>,
    node_id: AgentId,
}

impl RaftProtocol {
    #[must_use]
    pub fn new(node_id: AgentId) -> Self {
        Self {
            state: Mutex::new(RaftState {
                term: 0,
                role: RaftRole::Follower,
                voted_for: None,
                log_index: 0,
                votes_received: HashSet::new(),
            }),
            node_id,
        }
    }

    #[must_use]
    pub fn current_term(&self) -> u64 {
        self.state.lock().unwrap().term
    }

    #[must_use]
    pub fn role(&self) -> RaftRole {
        self.state.lock().unwrap().role
    }

    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.role() == RaftRole::Leader
    }

    /// Starts an election: advances to a new term, transitions to
    /// `Candidate`, votes for itself, and returns the new term. Happens
    /// when a randomized election timeout fires with no leader heartbeat
    /// observed.
    pub fn start_election(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.term += 1;
        state.role = RaftRole::Candidate;
        state.voted_for = Some(self.node_id);
        state.votes_received = HashSet::from([self.node_id]);
        state.term
    }

    /// Advances to a new term without contesting an election, as used by
    /// the plain term-convergence surrogate in scenario S5.
    pub fn advance_term(&self) -> u64 {
        self.start_election()
    }

    /// Steps down to `Follower` on observing a higher term from another
    /// node, clearing any vote cast in the now-stale term. Returns
    /// whether the local term advanced.
    pub fn observe_term(&self, remote_term: u64) -> bool {
        let mut state = self.state.lock().unwrap();
        if remote_term > state.term {
            state.term = remote_term;
            state.role = RaftRole::Follower;
            state.voted_for = None;
            state.votes_received.clear();
            true
        } else {
            false
        }
    }

    /// `RequestVote` RPC handling: grants a vote if the candidate's term
    /// is at least as current, the voter hasn't already voted for someone
    /// else this term, and the candidate's log is at least as
    /// up-to-date. Stepping down to a higher observed term happens as a
    /// side effect, per the Raft paper.
    pub fn request_vote(&self, candidate: AgentId, candidate_term: u64, candidate_log_index: u64) -> bool {
        let mut state = self.state.lock().unwrap();
        if candidate_term < state.term {
            return false;
        }
        if candidate_term > state.term {
            state.term = candidate_term;
            state.role = RaftRole::Follower;
            state.voted_for = None;
            state.votes_received.clear();
        }
        let already_voted_elsewhere = state.voted_for.is_some_and(|id| id != candidate);
        if already_voted_elsewhere || candidate_log_index < state.log_index {
            return false;
        }
        state.voted_for = Some(candidate);
        true
    }

    /// Records a vote granted by `voter` while this node is a candidate.
    /// Returns whether the node just crossed the majority threshold and
    /// became `Leader` (idempotent once leadership is reached).
    pub fn receive_vote(&self, voter: AgentId, cluster_size: usize) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.role != RaftRole::Candidate {
            return state.role == RaftRole::Leader;
        }
        state.votes_received.insert(voter);
        if state.votes_received.len() > cluster_size / 2 {
            state.role = RaftRole::Leader;
            true
        } else {
            false
        }
    }

    /// Builds the `RaftExtra` for the next log entry, advancing the
    /// local log index.
    pub fn next_extra(&self) -> RaftExtra {
        let mut state = self.state.lock().unwrap();
        state.log_index += 1;
        RaftExtra {
            log_index: state.log_index,
            prev_log_term: state.term,
        }
    }

    #[must_use]
    pub fn node_id(&self) -> AgentId {
        self.node_id
    }
}
