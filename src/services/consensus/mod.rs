//! Consensus core (C5): three interchangeable protocols sharing the
//! `Proposal`/`Vote` model from `domain::models::consensus`.
//!
//! Each protocol module exposes its own entry point (`propose`/`vote` or
//! equivalent); `ConsensusCore` picks one at construction time per
//! `ConsensusConfig::algorithm` and never mixes protocols within a run.

pub mod gossip;
pub mod pbft;
pub mod raft;

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::error::ConsensusError;
use crate::domain::ids::{AgentId, ProposalId};
use crate::domain::models::consensus::{Proposal, ProposalExtra, ProposalStatus, Vote};

pub use gossip::GossipProtocol;
pub use pbft::PbftProtocol;
pub use raft::{RaftProtocol, RaftRole};

/// Algorithm selection, resolved from `ConsensusConfig::algorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Raft,
    Pbft,
    Gossip,
}

impl Algorithm {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "byzantine" | "pbft" => Self::Pbft,
            "gossip" => Self::Gossip,
            _ => Self::Raft,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsensusCoreConfig {
    pub algorithm: Algorithm,
    pub threshold: f64,
    pub max_faulty_nodes: usize,
    pub timeout_ms: u64,
}

impl Default for ConsensusCoreConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Raft,
            threshold: 0.5,
            max_faulty_nodes: 1,
            timeout_ms: 1_000,
        }
    }
}

/// Shared proposal store plus quorum bookkeeping, used by all three
/// protocol modules. Each protocol decides how a proposal's `extra`
/// field is populated and how a quorum requirement translates into a
/// vote count; the store itself is protocol-agnostic.
pub struct ConsensusCore {
    proposals: RwLock<HashMap<ProposalId, Proposal>>,
    config: ConsensusCoreConfig,
    cluster_size: RwLock<usize>,
}

impl ConsensusCore {
    #[must_use]
    pub fn new(config: ConsensusCoreConfig, cluster_size: usize) -> Self {
        Self {
            proposals: RwLock::new(HashMap::new()),
            config,
            cluster_size: RwLock::new(cluster_size.max(1)),
        }
    }

    pub async fn set_cluster_size(&self, size: usize) {
        *self.cluster_size.write().await = size.max(1);
    }

    fn quorum_for(&self, cluster_size: usize) -> usize {
        match self.config.algorithm {
            Algorithm::Pbft => 2 * self.config.max_faulty_nodes + 1,
            _ => ((cluster_size as f64 * self.config.threshold).ceil() as usize).max(1),
        }
    }

    pub async fn propose(
        &self,
        proposer: AgentId,
        term_or_view: u64,
        value: serde_json::Value,
        extra: ProposalExtra,
    ) -> ProposalId {
        let deadline = chrono::Utc::now() + chrono::Duration::milliseconds(self.config.timeout_ms as i64);
        let mut proposal = Proposal::new(proposer, term_or_view, value, deadline);
        proposal.extra = extra;
        let id = proposal.proposal_id;
        self.proposals.write().await.insert(id, proposal);
        id
    }

    pub async fn vote(&self, proposal_id: ProposalId, vote: Vote) -> Result<ProposalStatus, ConsensusError> {
        let cluster_size = *self.cluster_size.read().await;
        let mut proposals = self.proposals.write().await;
        let proposal = proposals
            .get_mut(&proposal_id)
            .ok_or(ConsensusError::ProposalNotFound(proposal_id))?;

        if proposal.status != ProposalStatus::Pending {
            return Err(ConsensusError::AlreadyDecided(proposal_id));
        }
        if proposal.is_expired(chrono::Utc::now()) {
            proposal.status = ProposalStatus::Expired;
            return Err(ConsensusError::Expired(proposal_id));
        }

        proposal.votes.insert(vote.voter, vote);
        let required = self.quorum_for(cluster_size);
        if proposal.has_quorum(required) {
            proposal.status = ProposalStatus::Committed;
        }
        Ok(proposal.status)
    }

    pub async fn get(&self, proposal_id: ProposalId) -> Result<Proposal, ConsensusError> {
        self.proposals
            .read()
            .await
            .get(&proposal_id)
            .cloned()
            .ok_or(ConsensusError::ProposalNotFound(proposal_id))
    }

    /// Sweeps expired, still-pending proposals; called by a periodic
    /// background loop.
    pub async fn expire_overdue(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<ProposalId> {
        let mut proposals = self.proposals.write().await;
        let mut expired = Vec::new();
        for proposal in proposals.values_mut() {
            if proposal.status == ProposalStatus::Pending && proposal.is_expired(now) {
                proposal.status = ProposalStatus::Expired;
                expired.push(proposal.proposal_id);
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn raft_style_majority_quorum_commits() {
        let core = ConsensusCore::new(ConsensusCoreConfig::default(), 3);
        let proposer = AgentId::new();
        let id = core
            .propose(proposer, 1, serde_json::json!({"op": "noop"}), ProposalExtra::None)
            .await;
        let v1 = AgentId::new();
        let v2 = AgentId::new();
        core.vote(id, Vote { voter: v1, approve: true, confidence: 1.0 }).await.unwrap();
        let status = core
            .vote(id, Vote { voter: v2, approve: true, confidence: 1.0 })
            .await
            .unwrap();
        assert_eq!(status, ProposalStatus::Committed);
    }

    #[tokio::test]
    async fn pbft_style_quorum_needs_two_f_plus_one() {
        let config = ConsensusCoreConfig {
            algorithm: Algorithm::Pbft,
            max_faulty_nodes: 1,
            ..Default::default()
        };
        let core = ConsensusCore::new(config, 4);
        let id = core
            .propose(AgentId::new(), 1, serde_json::json!({}), ProposalExtra::None)
            .await;
        let voters: Vec<AgentId> = (0..2).map(|_| AgentId::new()).collect();
        let mut status = ProposalStatus::Pending;
        for voter in &voters {
            status = core
                .vote(id, Vote { voter: *voter, approve: true, confidence: 1.0 })
                .await
                .unwrap();
        }
        assert_ne!(status, ProposalStatus::Committed);
        let third = AgentId::new();
        status = core
            .vote(id, Vote { voter: third, approve: true, confidence: 1.0 })
            .await
            .unwrap();
        assert_eq!(status, ProposalStatus::Committed);
    }

    #[tokio::test]
    async fn voting_on_decided_proposal_errors() {
        let core = ConsensusCore::new(ConsensusCoreConfig::default(), 1);
        let id = core
            .propose(AgentId::new(), 1, serde_json::json!({}), ProposalExtra::None)
            .await;
        core.vote(id, Vote { voter: AgentId::new(), approve: true, confidence: 1.0 })
            .await
            .unwrap();
        let err = core
            .vote(id, Vote { voter: AgentId::new(), approve: true, confidence: 1.0 })
            .await
            .unwrap_err();
        assert!(matches!(err, ConsensusError::AlreadyDecided(_)));
    }
}
