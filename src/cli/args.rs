//! Command line argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "hubtest")]
#[command(about = "🔌 Hub-mediated test bench: port power control, port discovery and watchdog tests")]
pub struct Cli {
    /// Configuration file (defaults to ./hubtest.toml when present)
    #[arg(short = 'c', long = "config", global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Decrease logging verbosity (only errors)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Append logs to this file instead of writing them to stderr
    #[arg(long = "log-file", global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// List attached hub controllers
    Hubs,
    /// Switch or query downstream port power
    Power {
        /// Serial number of the hub to control
        #[arg(short, long)]
        serial: Option<String>,
        /// Power on a port (1-8, or 'a' for all)
        #[arg(short = 'u', long = "up", value_name = "PORT")]
        up: Option<String>,
        /// Power off a port (1-8, or 'a' for all)
        #[arg(short = 'd', long = "down", value_name = "PORT")]
        down: Option<String>,
        /// Set all ports at once, 8 characters of '1' (on), '0' (off) or 'x' (unchanged)
        #[arg(short = 'p', long = "port-set", value_name = "PORT_SET")]
        port_set: Option<String>,
        /// Report the power state of a port (1-8, or 'a' for all)
        #[arg(short = 'g', long = "get-state", value_name = "PORT")]
        get_state: Option<String>,
    },
    /// List attached serial devices with serial numbers
    Boards,
    /// Map hub ports to boards and write the discovered port map
    Discover {
        /// Serial number of the hub to use
        #[arg(short, long)]
        serial: Option<String>,
    },
    /// Run the watchdog test on every mapped board
    Watchdog {
        /// Serial number of the hub to use
        #[arg(short, long)]
        serial: Option<String>,
        /// Run port discovery first and test the discovered map
        #[arg(short = 'd', long = "discover")]
        discover: bool,
    },
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Print the default configuration as TOML
    Init,
    /// Print the effective configuration
    Show,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
