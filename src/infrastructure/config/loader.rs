use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_agents: {0}. Must be between 1 and 10000")]
    InvalidMaxAgents(usize),

    #[error("Invalid max_tasks: {0}. Must be at least 1")]
    InvalidMaxTasks(usize),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid consensus algorithm: {0}. Must be one of: raft, byzantine, gossip")]
    InvalidConsensusAlgorithm(String),

    #[error("Invalid consensus threshold: {0}. Must be in (0, 1]")]
    InvalidConsensusThreshold(f64),

    #[error("Invalid topology kind: {0}. Must be one of: mesh, hierarchical, centralized, hybrid")]
    InvalidTopologyKind(String),

    #[error("Invalid pool bounds: min ({0}) must be <= max ({1})")]
    InvalidPoolBounds(u32, u32),
}

/// Configuration loader with hierarchical merging, grounded in the
/// teacher's `Figment`-based `ConfigLoader`.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (`Config::default`)
    /// 2. `usc.yaml` (project config)
    /// 3. `usc.local.yaml` (project local overrides, optional)
    /// 4. Environment variables (`USC_` prefix, `__` nested separator)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("usc.yaml"))
            .merge(Yaml::file("usc.local.yaml"))
            .merge(Env::prefixed("USC_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.max_agents == 0 {
            return Err(ConfigError::InvalidMaxAgents(config.max_agents));
        }
        if config.max_tasks == 0 {
            return Err(ConfigError::InvalidMaxTasks(config.max_tasks));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.rate_limit.requests_per_second <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(config.rate_limit.requests_per_second));
        }
        if config.rate_limit.burst_size == 0 {
            return Err(ConfigError::InvalidBurstSize(config.rate_limit.burst_size));
        }

        let valid_algorithms = ["raft", "byzantine", "pbft", "gossip"];
        if !valid_algorithms.contains(&config.consensus.algorithm.as_str()) {
            return Err(ConfigError::InvalidConsensusAlgorithm(config.consensus.algorithm.clone()));
        }
        if !(0.0..=1.0).contains(&config.consensus.threshold) || config.consensus.threshold <= 0.0 {
            return Err(ConfigError::InvalidConsensusThreshold(config.consensus.threshold));
        }

        let valid_topologies = ["mesh", "hierarchical", "centralized", "hybrid"];
        if !valid_topologies.contains(&config.topology.kind.as_str()) {
            return Err(ConfigError::InvalidTopologyKind(config.topology.kind.clone()));
        }

        if config.pool.min > config.pool.max {
            return Err(ConfigError::InvalidPoolBounds(config.pool.min, config.pool.max));
        }

        Ok(())
    }
}
