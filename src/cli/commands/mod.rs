//! CLI command implementations

pub mod boards;
pub mod config;
pub mod discover;
pub mod hubs;
pub mod power;
pub mod watchdog;

use crate::cli::args::Commands;
use crate::config::HarnessConfig;
use anyhow::Result;

/// Execute a CLI command
pub async fn execute_command(command: Commands, config: &HarnessConfig) -> Result<()> {
    match command {
        Commands::Hubs => hubs::execute_hubs_command(config),
        Commands::Power {
            serial,
            up,
            down,
            port_set,
            get_state,
        } => power::execute_power_command(
            config,
            power::PowerRequest {
                serial,
                up,
                down,
                port_set,
                get_state,
            },
        ),
        Commands::Boards => boards::execute_boards_command(),
        Commands::Discover { serial } => {
            discover::execute_discover_command(config, serial.as_deref()).await
        }
        Commands::Watchdog { serial, discover } => {
            watchdog::execute_watchdog_command(config, serial.as_deref(), discover).await
        }
        Commands::Config { action } => config::execute_config_command(config, action),
    }
}
