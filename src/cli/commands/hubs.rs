//! Hubs command implementation - List attached hub controllers

use anyhow::{Context, Result};
use log::info;

use crate::config::HarnessConfig;
use crate::hub::{HubLocator, UsbHubBackend};

pub fn execute_hubs_command(config: &HarnessConfig) -> Result<()> {
    info!(
        "Scanning for hub controllers {:04x}:{:04x}...",
        config.hub.vendor_id, config.hub.product_id
    );

    let backend = UsbHubBackend::new(config.hub.transfer_timeout())
        .context("Failed to initialize USB access")?;
    let hubs = HubLocator::new(&backend, config.hub.vendor_id, config.hub.product_id).list()?;

    if hubs.is_empty() {
        println!("No attached hub controllers found.");
        return Ok(());
    }

    println!("Attached hub controllers:");
    for hub in &hubs {
        println!("  Serial: {}  ({})", hub.serial_number, hub.path);
    }
    Ok(())
}
