//! PBFT protocol overlay: view/sequence tracking and the three-phase
//! digest handshake (pre-prepare, prepare, commit) on top of the shared
//! `ConsensusCore` proposal store.

use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest as _, Sha256};

use crate::domain::models::consensus::{PbftExtra, PbftPhase};

/// Per-node PBFT state: current view and next sequence number.
pub struct PbftProtocol {
    view: AtomicU64,
    sequence: AtomicU64,
}

impl PbftProtocol {
    #[must_use]
    pub fn new() -> Self {
        Self {
            view: AtomicU64::new(0),
            sequence: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn current_view(&self) -> u64 {
        self.view.load(Ordering::SeqCst)
    }

    /// Triggers a view change, as happens when the primary is suspected
    /// faulty.
    pub fn advance_view(&self) -> u64 {
        self.view.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Computes the request digest and builds the pre-prepare extra,
    /// advancing the local sequence number.
    pub fn pre_prepare(&self, value: &serde_json::Value) -> PbftExtra {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        PbftExtra {
            view: self.current_view(),
            sequence,
            digest: Self::digest(value),
            phase: PbftPhase::PrePrepare,
        }
    }

    #[must_use]
    pub fn advance_phase(extra: &PbftExtra) -> PbftExtra {
        let phase = match extra.phase {
            PbftPhase::PrePrepare => PbftPhase::Prepare,
            PbftPhase::Prepare | PbftPhase::Commit => PbftPhase::Commit,
        };
        PbftExtra {
            view: extra.view,
            sequence: extra.sequence,
            digest: extra.digest.clone(),
            phase,
        }
    }

    fn digest(value: &serde_json::Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl Default for PbftProtocol {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_for_equal_values() {
        let value = serde_json::json!({"op": "commit", "n": 1});
        let extra_a = PbftProtocol::new().pre_prepare(&value);
        let extra_b = PbftProtocol::new().pre_prepare(&value);
        assert_eq!(extra_a.digest, extra_b.digest);
    }

    #[test]
    fn phase_advances_pre_prepare_to_prepare_to_commit() {
        let protocol = PbftProtocol::new();
        let pre_prepare = protocol.pre_prepare(&serde_json::json!({}));
        let prepare = PbftProtocol::advance_phase(&pre_prepare);
        assert_eq!(prepare.phase, PbftPhase::Prepare);
        let commit = PbftProtocol::advance_phase(&prepare);
        assert_eq!(commit.phase, PbftPhase::Commit);
    }

    #[test]
    fn view_change_increments_view() {
        let protocol = PbftProtocol::new();
        assert_eq!(protocol.advance_view(), 1);
        assert_eq!(protocol.current_view(), 1);
    }
}
