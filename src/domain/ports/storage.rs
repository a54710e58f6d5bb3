//! Storage port: the key-value + vector-search interface. No concrete
//! adapter ships in this crate — persistence is an external collaborator.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::error::SchedulerError;

/// A single nearest-neighbor hit from `Storage::search`.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub key: String,
    pub score: f64,
    pub value: Value,
}

/// Key-value plus vector-search storage, grounded in the teacher's
/// `AgentRepository`/`Substrate` port style: an `#[async_trait]` trait
/// with no concrete implementation shipped alongside the coordinator.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, SchedulerError>;
    async fn put(&self, key: &str, value: Value) -> Result<(), SchedulerError>;
    async fn delete(&self, key: &str) -> Result<(), SchedulerError>;
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<VectorHit>, SchedulerError>;
}
