//! Consensus model: the shared proposal/vote shape plus per-algorithm extras.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{AgentId, ProposalId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Committed,
    Aborted,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub voter: AgentId,
    pub approve: bool,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PbftPhase {
    PrePrepare,
    Prepare,
    Commit,
}

/// Raft-specific proposal fields: the proposal plays the role of a
/// replicated log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaftExtra {
    pub log_index: u64,
    pub prev_log_term: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PbftExtra {
    pub view: u64,
    pub sequence: u64,
    pub digest: String,
    pub phase: PbftPhase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipExtra {
    pub version: u64,
    pub hop_count: u32,
    pub seen_by: Vec<AgentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProposalExtra {
    Raft(RaftExtra),
    Pbft(PbftExtra),
    Gossip(GossipExtra),
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub proposal_id: ProposalId,
    pub proposer: AgentId,
    pub term_or_view: u64,
    pub value: serde_json::Value,
    pub votes: HashMap<AgentId, Vote>,
    pub status: ProposalStatus,
    pub deadline: DateTime<Utc>,
    pub extra: ProposalExtra,
}

impl Proposal {
    #[must_use]
    pub fn new(proposer: AgentId, term_or_view: u64, value: serde_json::Value, deadline: DateTime<Utc>) -> Self {
        Self {
            proposal_id: ProposalId::new(),
            proposer,
            term_or_view,
            value,
            votes: HashMap::new(),
            status: ProposalStatus::Pending,
            deadline,
            extra: ProposalExtra::None,
        }
    }

    #[must_use]
    pub fn approvals(&self) -> usize {
        self.votes.values().filter(|v| v.approve).count()
    }

    #[must_use]
    pub fn has_quorum(&self, required: usize) -> bool {
        self.approvals() >= required
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_counts_only_approvals() {
        let mut proposal = Proposal::new(
            AgentId::new(),
            1,
            serde_json::json!({"op": "noop"}),
            Utc::now() + chrono::Duration::seconds(1),
        );
        for _ in 0..3 {
            let voter = AgentId::new();
            proposal.votes.insert(
                voter,
                Vote {
                    voter,
                    approve: true,
                    confidence: 1.0,
                },
            );
        }
        let rejecter = AgentId::new();
        proposal.votes.insert(
            rejecter,
            Vote {
                voter: rejecter,
                approve: false,
                confidence: 1.0,
            },
        );
        assert_eq!(proposal.approvals(), 3);
        assert!(proposal.has_quorum(3));
        assert!(!proposal.has_quorum(4));
    }
}
