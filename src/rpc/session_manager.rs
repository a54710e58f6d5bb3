//! Session and subscription manager (C8). Grounded in the teacher's
//! single-writer-registry pattern (`AgentRegistry`/`TopologyManager`):
//! one `RwLock<HashMap>` owns every session, mutated only through this
//! service.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::domain::error::SessionError;
use crate::domain::ids::SessionId;
use crate::domain::models::rpc::JsonRpcNotification;
use crate::domain::models::session::{ClientInfo, RpcSession};

/// Capacity of each session's notification channel. A full channel means
/// the transport is congested; delivery is at-least-once with coalescing
/// allowed under congestion, so a send that would block is dropped rather
/// than applying back-pressure.
const NOTIFICATION_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    pub max_sessions: usize,
    pub timeout_ms: u64,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            max_sessions: 256,
            timeout_ms: 300_000,
        }
    }
}

struct SessionEntry {
    session: RpcSession,
    notifications: mpsc::Sender<JsonRpcNotification>,
}

/// Owns every `RpcSession`, created on first `initialize` per transport
/// connection and capped at `max_sessions`.
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    config: SessionManagerConfig,
}

impl SessionManager {
    #[must_use]
    pub fn new(config: SessionManagerConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Creates a new session and its notification channel, rejecting the
    /// attempt once `max_sessions` is reached.
    pub async fn create(
        &self,
        client_info: Option<ClientInfo>,
    ) -> Result<(SessionId, mpsc::Receiver<JsonRpcNotification>), SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.config.max_sessions {
            return Err(SessionError::LimitReached {
                current: sessions.len(),
                max: self.config.max_sessions,
            });
        }
        let mut session = RpcSession::new();
        session.client_info = client_info;
        session.initialized = true;
        let id = session.session_id;
        let (tx, rx) = mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY);
        sessions.insert(
            id,
            SessionEntry {
                session,
                notifications: tx,
            },
        );
        debug!(session_id = %id, "session created");
        Ok((id, rx))
    }

    pub async fn touch(&self, session_id: SessionId) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&session_id).ok_or(SessionError::NotFound(session_id))?;
        entry.session.touch();
        Ok(())
    }

    pub async fn get(&self, session_id: SessionId) -> Result<RpcSession, SessionError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|entry| entry.session.clone())
            .ok_or(SessionError::NotFound(session_id))
    }

    pub async fn subscribe(&self, session_id: SessionId, uri: impl Into<String>) -> Result<(), SessionError> {
        let uri = uri.into();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&session_id).ok_or(SessionError::NotFound(session_id))?;
        if !entry.session.subscriptions.insert(uri.clone()) {
            return Err(SessionError::AlreadySubscribed(session_id, uri));
        }
        Ok(())
    }

    pub async fn unsubscribe(&self, session_id: SessionId, uri: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&session_id).ok_or(SessionError::NotFound(session_id))?;
        if !entry.session.subscriptions.remove(uri) {
            return Err(SessionError::NotSubscribed(session_id, uri.to_string()));
        }
        Ok(())
    }

    pub async fn close(&self, session_id: SessionId) {
        self.sessions.write().await.remove(&session_id);
    }

    /// Delivers `notification` to every session currently subscribed to
    /// `uri`. A full channel is treated as congestion: the notification is
    /// coalesced away for that session rather than blocking the publisher.
    pub async fn notify_subscribers(&self, uri: &str, notification: &JsonRpcNotification) {
        let sessions = self.sessions.read().await;
        for entry in sessions.values() {
            if entry.session.subscriptions.contains(uri) {
                if entry.notifications.try_send(notification.clone()).is_err() {
                    warn!(uri, "subscriber notification channel congested, coalescing");
                }
            }
        }
    }

    /// Sweeps sessions past `timeout_ms` of inactivity.
    pub async fn sweep_timeouts(&self) -> Vec<SessionId> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<SessionId> = sessions
            .values()
            .filter(|entry| entry.session.is_timed_out(self.config.timeout_ms))
            .map(|entry| entry.session.session_id)
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_rejects_past_max_sessions() {
        let manager = SessionManager::new(SessionManagerConfig {
            max_sessions: 1,
            timeout_ms: 300_000,
        });
        manager.create(None).await.unwrap();
        let err = manager.create(None).await.unwrap_err();
        assert!(matches!(err, SessionError::LimitReached { .. }));
    }

    #[tokio::test]
    async fn subscribe_then_unsubscribe_round_trips() {
        let manager = SessionManager::new(SessionManagerConfig::default());
        let (id, _rx) = manager.create(None).await.unwrap();
        manager.subscribe(id, "usc://metrics/snapshot").await.unwrap();
        let err = manager.subscribe(id, "usc://metrics/snapshot").await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadySubscribed(..)));
        manager.unsubscribe(id, "usc://metrics/snapshot").await.unwrap();
        let err = manager.unsubscribe(id, "usc://metrics/snapshot").await.unwrap_err();
        assert!(matches!(err, SessionError::NotSubscribed(..)));
    }

    #[tokio::test]
    async fn subscribed_session_receives_notification() {
        let manager = SessionManager::new(SessionManagerConfig::default());
        let (id, mut rx) = manager.create(None).await.unwrap();
        manager.subscribe(id, "usc://metrics/snapshot").await.unwrap();
        let notification = JsonRpcNotification::new(
            "notifications/resources/updated",
            serde_json::json!({"uri": "usc://metrics/snapshot"}),
        );
        manager.notify_subscribers("usc://metrics/snapshot", &notification).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.method, "notifications/resources/updated");
    }
}
