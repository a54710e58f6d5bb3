//! CLI interface module
//!
//! Command definitions for starting the coordinator over either JSON-RPC
//! transport and for validating a configuration file without starting it.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "usc")]
#[command(about = "Unified Swarm Coordinator", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the coordinator and serve the JSON-RPC control plane
    Serve {
        /// Transport to serve the JSON-RPC control plane over
        #[arg(short, long, value_enum, default_value_t = Transport::Stdio)]
        transport: Transport,

        /// Port to bind when `--transport http` is selected
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },

    /// Load and validate configuration, printing the resolved values
    ConfigCheck,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
    Http,
}
