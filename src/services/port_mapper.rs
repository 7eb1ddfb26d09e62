//! Port discovery: power each hub port in turn and see what appears

use log::{info, warn};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::errors::Result;
use crate::hub::{HubController, PortSelector};
use crate::models::device::DeviceSnapshot;
use crate::models::port_map::{PortEntry, PortMap};
use crate::services::name_table::DeviceIdentifier;
use crate::services::snapshot::{self, DeviceEnumerator};

/// Newly appeared devices per probed port
pub type DiscoveredPorts = BTreeMap<u8, DeviceSnapshot>;

/// Drives the hub and the snapshot engine to map ports to devices
pub struct PortMapper<'a> {
    hub: &'a HubController,
    enumerator: &'a dyn DeviceEnumerator,
    port_count: u8,
    settle_delay: Duration,
}

impl<'a> PortMapper<'a> {
    pub fn new(
        hub: &'a HubController,
        enumerator: &'a dyn DeviceEnumerator,
        port_count: u8,
        settle_delay: Duration,
    ) -> Self {
        Self {
            hub,
            enumerator,
            port_count,
            settle_delay,
        }
    }

    /// Power one port on, collect what appeared, and power it off again.
    ///
    /// The power-off is attempted even when the snapshot fails.
    pub async fn probe_port(&self, port: u8) -> Result<DeviceSnapshot> {
        let selector = PortSelector::port(port)?;
        info!("Probing port {}", port);

        let before = snapshot::snapshot(self.enumerator)?;
        self.hub.set_power(selector, true)?;
        tokio::time::sleep(self.settle_delay).await;

        let probed =
            snapshot::snapshot(self.enumerator).map(|after| snapshot::diff(&before, &after));
        let powered_off = self.hub.set_power(selector, false);

        let new_devices = probed?;
        powered_off?;

        if new_devices.is_empty() {
            info!("No new device found on port {}", port);
        }
        for (serial, attributes) in &new_devices {
            info!(
                "Detected new device on port {}: serial {} vid {} pid {} ({} / {})",
                port,
                serial,
                attributes.vendor_id,
                attributes.product_id,
                attributes.manufacturer.as_deref().unwrap_or("unknown manufacturer"),
                attributes.product.as_deref().unwrap_or("unknown product"),
            );
        }
        Ok(new_devices)
    }

    /// Probe every port from an all-off baseline
    pub async fn discover(&self) -> Result<DiscoveredPorts> {
        self.hub.set_power(PortSelector::All, false)?;
        tokio::time::sleep(self.settle_delay).await;

        let mut discovered = DiscoveredPorts::new();
        for port in 1..=self.port_count {
            let new_devices = self.probe_port(port).await?;
            if !new_devices.is_empty() {
                discovered.insert(port, new_devices);
            }
        }
        Ok(discovered)
    }

    /// Discover and name every device, producing the port map
    pub async fn map_ports(&self, identifier: &DeviceIdentifier) -> Result<PortMap> {
        let discovered = self.discover().await?;
        let port_map = build_port_map(self.hub.serial(), &discovered, identifier)?;

        info!("--- Port mapping result ---");
        for entry in &port_map.ports {
            info!("Port {}: {} - {}", entry.port, entry.serial_number, entry.name);
        }
        for port in port_map.ambiguous_ports() {
            warn!("Port {} yielded more than one new device, all are kept", port);
        }
        Ok(port_map)
    }
}

/// Name every discovered device; a port with several devices keeps them all
pub fn build_port_map(
    hub_serial: &str,
    discovered: &DiscoveredPorts,
    identifier: &DeviceIdentifier,
) -> Result<PortMap> {
    let mut ports = Vec::new();
    for (port, devices) in discovered {
        for serial in devices.keys() {
            ports.push(PortEntry {
                port: *port,
                serial_number: serial.clone(),
                name: identifier.identify(serial)?,
            });
        }
    }
    Ok(PortMap {
        hub_serial: hub_serial.to_string(),
        ports,
    })
}
