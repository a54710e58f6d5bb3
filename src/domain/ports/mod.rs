//! Domain ports (interfaces) for external collaborators.

pub mod llm_provider;
pub mod storage;
pub mod transport;

pub use llm_provider::{LlmProvider, SamplingRequest, SamplingResponse};
pub use storage::{Storage, VectorHit};
pub use transport::FramedTransport;
