//! Infrastructure layer
//!
//! Adapters for external dependencies the domain/services layers don't
//! know about directly:
//! - Configuration loading (figment)
//! - Structured logging (tracing)

pub mod config;
pub mod logging;
