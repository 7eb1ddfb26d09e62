//! Discover command implementation - Map hub ports to boards

use anyhow::{Context, Result};
use log::info;

use crate::config::HarnessConfig;
use crate::hub::{HubController, UsbHubBackend};
use crate::models::port_map::PortMap;
use crate::services::name_table::{DeviceIdentifier, NameTable, UnknownDeviceLog};
use crate::services::port_mapper::PortMapper;
use crate::services::snapshot::{DeviceEnumerator, SystemDeviceEnumerator};

/// Discover the boards behind `hub` and write the discovered port map
pub async fn run_discovery(
    config: &HarnessConfig,
    hub: &HubController,
    enumerator: &dyn DeviceEnumerator,
) -> Result<PortMap> {
    let table = NameTable::load(&config.device_list_path())?;
    let identifier =
        DeviceIdentifier::new(table, UnknownDeviceLog::new(config.unknown_devices_path()));

    let mapper = PortMapper::new(
        hub,
        enumerator,
        config.hub.port_count,
        config.hub.settle_delay(),
    );
    let port_map = mapper
        .map_ports(&identifier)
        .await
        .with_context(|| format!("Port discovery on hub {} failed", hub.serial()))?;

    let path = config.discovered_map_path();
    port_map
        .save(&path)
        .with_context(|| format!("Failed to write port map {}", path.display()))?;
    Ok(port_map)
}

pub async fn execute_discover_command(config: &HarnessConfig, serial: Option<&str>) -> Result<()> {
    let backend = UsbHubBackend::new(config.hub.transfer_timeout())
        .context("Failed to initialize USB access")?;
    let hub = HubController::connect(Box::new(backend), &config.hub, serial)?;

    let port_map = run_discovery(config, &hub, &SystemDeviceEnumerator).await?;
    info!(
        "Discovered {} device(s) on hub {}",
        port_map.ports.len(),
        port_map.hub_serial
    );
    println!("{}", config.discovered_map_path().display());
    Ok(())
}
