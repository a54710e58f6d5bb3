//! Unified Swarm Coordinator
//!
//! A distributed multi-agent orchestration core: agent registry, topology
//! management, a dependency-aware task scheduler, pluggable consensus
//! protocols (Raft, PBFT, gossip), rate limiting, connection pooling, and
//! a JSON-RPC 2.0 control plane exposed over stdio or HTTP.

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod rpc;
pub mod services;

pub use domain::models::config::Config;
pub use rpc::Coordinator;
