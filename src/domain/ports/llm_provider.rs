//! LLM provider port: the out-of-scope collaborator behind
//! `sampling/createMessage`. Grounded in the teacher's `Substrate` port.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::error::RpcError;

#[derive(Debug, Clone)]
pub struct SamplingRequest {
    pub messages: Vec<Value>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct SamplingResponse {
    pub content: Value,
    pub model: String,
}

/// No implementation ships with this crate; `sampling/createMessage`
/// returns `RpcError::Internal` when no provider is injected, per
/// SPEC_FULL.md's Non-goals section.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn create_message(&self, request: SamplingRequest) -> Result<SamplingResponse, RpcError>;
}
