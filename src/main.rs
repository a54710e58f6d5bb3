//! Unified Swarm Coordinator CLI entry point

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use usc::cli::{Cli, Commands, Transport};
use usc::infrastructure::config::ConfigLoader;
use usc::infrastructure::logging::{LogConfig, LogFormat, LoggerImpl, RotationPolicy};
use usc::rpc::server::{run_http, run_stdio};
use usc::Coordinator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::ConfigCheck) {
        let config = ConfigLoader::load().context("failed to load configuration")?;
        println!("{}", serde_yaml::to_string(&config).context("failed to render configuration")?);
        return Ok(());
    }

    let config = ConfigLoader::load().context("failed to load configuration")?;
    let log_config = to_log_config(&config.logging);
    let logger = LoggerImpl::init(&log_config).context("failed to initialize logger")?;

    let coordinator = Arc::new(Coordinator::new(&config, None, None, Some(logger.reload_handle())));
    coordinator.spawn_background_loops(config.health_check_interval_ms);

    match cli.command {
        Commands::ConfigCheck => unreachable!("handled above"),
        Commands::Serve { transport, port } => match transport {
            Transport::Stdio => run_stdio(coordinator).await,
            Transport::Http => run_http(coordinator, port).await,
        },
    }
}

fn to_log_config(logging: &usc::domain::models::config::LoggingConfig) -> LogConfig {
    LogConfig {
        level: logging.level.clone(),
        format: if logging.format == "pretty" { LogFormat::Pretty } else { LogFormat::Json },
        log_dir: logging.log_dir.clone(),
        enable_stdout: true,
        rotation: RotationPolicy::Daily,
        retention_days: logging.retention_days,
    }
}
