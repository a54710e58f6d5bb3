//! Transport port: the framed-message abstraction shared by the stdio
//! and HTTP/WebSocket adapters under `infrastructure::transport`.

use async_trait::async_trait;

use crate::domain::error::RpcError;

/// One inbound frame paired with the session it arrived on, if the
/// transport exposes session identity at this layer (HTTP does not;
/// stdio sessions are assigned by the RPC server on first `initialize`).
#[async_trait]
pub trait FramedTransport: Send + Sync {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, RpcError>;
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), RpcError>;
}
