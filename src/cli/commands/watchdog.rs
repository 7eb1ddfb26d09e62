//! Watchdog command implementation - Test every mapped board

use anyhow::{Context, Result};
use log::{info, warn};
use std::time::Instant;

use crate::cli::commands::discover::run_discovery;
use crate::config::HarnessConfig;
use crate::hub::{HubController, UsbHubBackend};
use crate::models::port_map::PortMap;
use crate::services::console::TokioSerialConnector;
use crate::services::firmware::NewtTool;
use crate::services::orchestrator::WatchdogOrchestrator;
use crate::services::snapshot::SystemDeviceEnumerator;
use crate::services::watchdog_monitor::WatchdogMonitor;

/// Hub serial to resolve: the explicit filter, else the one recorded in the map
fn hub_serial_for<'a>(serial: Option<&'a str>, port_map: &'a PortMap) -> Option<&'a str> {
    serial.or_else(|| Some(port_map.hub_serial.as_str()).filter(|serial| !serial.is_empty()))
}

pub async fn execute_watchdog_command(
    config: &HarnessConfig,
    serial: Option<&str>,
    discover: bool,
) -> Result<()> {
    let program_start = Instant::now();
    let enumerator = SystemDeviceEnumerator;
    let backend = UsbHubBackend::new(config.hub.transfer_timeout())
        .context("Failed to initialize USB access")?;

    let (hub, port_map) = if discover {
        let discover_start = Instant::now();
        let hub = HubController::connect(Box::new(backend), &config.hub, serial)?;
        let port_map = run_discovery(config, &hub, &enumerator).await?;
        info!("Discover time: {:.2} s", discover_start.elapsed().as_secs_f64());
        (hub, port_map)
    } else {
        let path = config.manual_map_path();
        let port_map = PortMap::load(&path)
            .with_context(|| format!("Failed to read port map {}", path.display()))?;
        let hub = HubController::connect(
            Box::new(backend),
            &config.hub,
            hub_serial_for(serial, &port_map),
        )?;
        (hub, port_map)
    };

    let builder = NewtTool::new(&config.firmware);
    if let Err(e) = builder.check_available() {
        warn!("{}, flashing will fail", e);
    }

    let connector = TokioSerialConnector;
    let monitor = WatchdogMonitor::new(
        &enumerator,
        &connector,
        &builder,
        &config.firmware,
        &config.monitor,
    );
    let orchestrator = WatchdogOrchestrator::new(&hub, &monitor, config.hub.settle_delay());

    let watchdog_start = Instant::now();
    let artifact = orchestrator
        .run_to_artifact(&port_map, &config.data_dir)
        .await
        .context("Watchdog run aborted")?;
    info!("Watchdog time: {:.2} s", watchdog_start.elapsed().as_secs_f64());
    info!("Program time: {:.2} s", program_start.elapsed().as_secs_f64());

    println!("{}", artifact.display());
    Ok(())
}
