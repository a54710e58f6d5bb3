//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides (`USC_` prefix)
//! - Configuration validation
//! - Type-safe config structs, owned by `crate::domain::models::config`

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
