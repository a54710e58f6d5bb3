//! Typed configuration tree covering the full configuration surface.
//! Loaded and validated by `crate::infrastructure::config::ConfigLoader`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub max_agents: usize,
    pub max_tasks: usize,
    pub heartbeat_interval_ms: u64,
    pub health_check_interval_ms: u64,
    pub dead_after_ms: u64,

    pub topology: TopologyConfig,
    pub consensus: ConsensusConfig,
    pub rate_limit: RateLimitConfig,
    pub pool: PoolConfig,
    pub session: SessionConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_agents: 50,
            max_tasks: 10_000,
            heartbeat_interval_ms: 5_000,
            health_check_interval_ms: 10_000,
            dead_after_ms: 60_000,
            topology: TopologyConfig::default(),
            consensus: ConsensusConfig::default(),
            rate_limit: RateLimitConfig::default(),
            pool: PoolConfig::default(),
            session: SessionConfig::default(),
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub kind: String,
    pub mesh_fanout: usize,
    pub max_agents: usize,
    pub mesh_target_degree: f64,
    pub replication_factor: u32,
    /// "first_available" | "round_robin" | "least_loaded"
    pub partition_strategy: String,
    pub auto_rebalance: bool,
    pub failover_enabled: bool,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            kind: "hierarchical".to_string(),
            mesh_fanout: 4,
            max_agents: 1_000,
            mesh_target_degree: 2.0,
            replication_factor: 2,
            partition_strategy: "least_loaded".to_string(),
            auto_rebalance: true,
            failover_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// "raft" | "byzantine" (resolves to PBFT) | "gossip"
    pub algorithm: String,
    pub threshold: f64,
    pub timeout_ms: u64,
    pub election_timeout_min_ms: u64,
    pub election_timeout_max_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub fanout: usize,
    pub max_hops: u32,
    pub convergence_threshold: f64,
    pub max_faulty_nodes: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            algorithm: "raft".to_string(),
            threshold: 0.5,
            timeout_ms: 1_000,
            election_timeout_min_ms: 150,
            election_timeout_max_ms: 300,
            heartbeat_interval_ms: 50,
            fanout: 3,
            max_hops: 10,
            convergence_threshold: 0.99,
            max_faulty_nodes: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,
    pub burst_size: u32,
    pub per_session_limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 100.0,
            burst_size: 200,
            per_session_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub min: u32,
    pub max: u32,
    pub idle_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
    pub max_waiting_clients: u32,
    pub drain_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min: 1,
            max: 16,
            idle_timeout_ms: 30_000,
            acquire_timeout_ms: 5_000,
            max_waiting_clients: 64,
            drain_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub max: usize,
    pub timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max: 256,
            timeout_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub assignment_strategy: String,
    pub preemption_enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            assignment_strategy: "capability_match".to_string(),
            preemption_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub log_dir: Option<std::path::PathBuf>,
    pub retention_days: i64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
            log_dir: None,
            retention_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_rate_limit_values() {
        let config = Config::default();
        assert!((config.rate_limit.requests_per_second - 100.0).abs() < f64::EPSILON);
        assert_eq!(config.rate_limit.burst_size, 200);
        assert_eq!(config.rate_limit.per_session_limit, 50);
    }

    #[test]
    fn default_retry_and_consensus_values_match_open_question_resolutions() {
        let config = Config::default();
        assert_eq!(config.consensus.algorithm, "raft");
        assert!(!config.scheduler.preemption_enabled);
    }
}
