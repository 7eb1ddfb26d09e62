//! Power command implementation - Switch and query hub port power

use anyhow::{Context, Result, bail};

use crate::config::HarnessConfig;
use crate::hub::{HubController, HubState, PortCommand, PortSelector, PortState, UsbHubBackend};

/// Port arguments as given on the command line
#[derive(Debug, Clone, Default)]
pub struct PowerRequest {
    pub serial: Option<String>,
    pub up: Option<String>,
    pub down: Option<String>,
    pub port_set: Option<String>,
    pub get_state: Option<String>,
}

/// Combine `-p`, `-u` and `-d` into one command, applied in that order
pub fn build_command(request: &PowerRequest) -> Result<Option<PortCommand>> {
    if request.port_set.is_none() && request.up.is_none() && request.down.is_none() {
        return Ok(None);
    }

    let mut command = match &request.port_set {
        Some(port_set) => PortCommand::parse_port_set(port_set)?,
        None => PortCommand::unchanged(),
    };
    if let Some(port) = &request.up {
        command = command.with(port.parse::<PortSelector>()?, PortState::On)?;
    }
    if let Some(port) = &request.down {
        command = command.with(port.parse::<PortSelector>()?, PortState::Off)?;
    }
    Ok(Some(command))
}

/// One status line per selected port
pub fn format_state(hub_serial: &str, state: &HubState, selector: PortSelector) -> Vec<String> {
    state
        .iter()
        .filter(|(port, _)| selector.includes(*port))
        .map(|(port, status)| {
            format!("Downstream port {} on hub {} is {}.", port, hub_serial, status)
        })
        .collect()
}

pub fn execute_power_command(config: &HarnessConfig, request: PowerRequest) -> Result<()> {
    let command = build_command(&request)?;
    let query = request
        .get_state
        .as_deref()
        .map(str::parse::<PortSelector>)
        .transpose()?;

    if command.is_none() && query.is_none() {
        bail!("No power operation requested, use --up, --down, --port-set or --get-state");
    }

    let backend = UsbHubBackend::new(config.hub.transfer_timeout())
        .context("Failed to initialize USB access")?;
    let hub = HubController::connect(Box::new(backend), &config.hub, request.serial.as_deref())?;

    if let Some(command) = command {
        hub.apply(&command).with_context(|| {
            format!("Failed to apply port set {} on hub {}", command, hub.serial())
        })?;
    }

    if let Some(selector) = query {
        let state = hub.get_state()?;
        for line in format_state(hub.serial(), &state, selector) {
            println!("{}", line);
        }
    }
    Ok(())
}
