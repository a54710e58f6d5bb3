//! Gossip protocol overlay: version-vector propagation with hop-count and
//! seen-by tracking on top of the shared `ConsensusCore` proposal store.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::ids::AgentId;
use crate::domain::models::consensus::GossipExtra;

pub struct GossipProtocol {
    version: AtomicU64,
    max_hops: u32,
    fanout: usize,
}

impl GossipProtocol {
    #[must_use]
    pub fn new(max_hops: u32, fanout: usize) -> Self {
        Self {
            version: AtomicU64::new(0),
            max_hops,
            fanout,
        }
    }

    pub fn originate(&self, self_id: AgentId) -> GossipExtra {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        GossipExtra {
            version,
            hop_count: 0,
            seen_by: vec![self_id],
        }
    }

    /// Propagates the extra one hop further, marking `self_id` as having
    /// seen it. Returns `None` once `max_hops` is reached or the node
    /// has already seen this gossip.
    #[must_use]
    pub fn propagate(&self, extra: &GossipExtra, self_id: AgentId) -> Option<GossipExtra> {
        if extra.hop_count >= self.max_hops || extra.seen_by.contains(&self_id) {
            return None;
        }
        let mut seen_by = extra.seen_by.clone();
        seen_by.push(self_id);
        Some(GossipExtra {
            version: extra.version,
            hop_count: extra.hop_count + 1,
            seen_by,
        })
    }

    /// Selects up to `fanout` peers to forward to, excluding those who
    /// have already seen this gossip round.
    #[must_use]
    pub fn select_targets(&self, extra: &GossipExtra, peers: &[AgentId]) -> Vec<AgentId> {
        peers
            .iter()
            .filter(|peer| !extra.seen_by.contains(peer))
            .take(self.fanout)
            .copied()
            .collect()
    }

    /// Fraction of the cluster that has seen this gossip round, used to
    /// check against `convergence_threshold`.
    #[must_use]
    pub fn convergence(&self, extra: &GossipExtra, cluster_size: usize) -> f64 {
        if cluster_size == 0 {
            return 1.0;
        }
        extra.seen_by.len() as f64 / cluster_size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagate_stops_at_max_hops() {
        let protocol = GossipProtocol::new(1, 3);
        let origin = AgentId::new();
        let extra = protocol.originate(origin);
        let hop1 = protocol.propagate(&extra, AgentId::new()).unwrap();
        assert_eq!(hop1.hop_count, 1);
        assert!(protocol.propagate(&hop1, AgentId::new()).is_none());
    }

    #[test]
    fn propagate_rejects_repeat_visitor() {
        let protocol = GossipProtocol::new(5, 3);
        let origin = AgentId::new();
        let extra = protocol.originate(origin);
        assert!(protocol.propagate(&extra, origin).is_none());
    }

    #[test]
    fn convergence_reaches_one_when_all_seen() {
        let protocol = GossipProtocol::new(5, 3);
        let a = AgentId::new();
        let extra = protocol.originate(a);
        assert!((protocol.convergence(&extra, 1) - 1.0).abs() < f64::EPSILON);
    }
}
