//! RPC session model (C8): one per connected client.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::SessionId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSession {
    pub session_id: SessionId,
    pub client_info: Option<ClientInfo>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub initialized: bool,
    pub subscriptions: HashSet<String>,
}

impl RpcSession {
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            client_info: None,
            created_at: now,
            last_activity: now,
            initialized: false,
            subscriptions: HashSet::new(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    #[must_use]
    pub fn is_timed_out(&self, timeout_ms: u64) -> bool {
        let elapsed = Utc::now() - self.last_activity;
        elapsed.num_milliseconds() as u64 >= timeout_ms
    }
}

impl Default for RpcSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_not_initialized() {
        let session = RpcSession::new();
        assert!(!session.initialized);
        assert!(session.subscriptions.is_empty());
    }

    #[test]
    fn touch_updates_last_activity() {
        let mut session = RpcSession::new();
        let before = session.last_activity;
        std::thread::sleep(std::time::Duration::from_millis(5));
        session.touch();
        assert!(session.last_activity >= before);
    }
}
