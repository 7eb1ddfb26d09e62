//! Boards command implementation - List attached serial devices

use anyhow::Result;
use log::{debug, info};

use crate::services::snapshot::{self, DeviceEnumerator, SystemDeviceEnumerator};

/// List the serial devices a snapshot would track, to help fill the name table
pub fn execute_boards_command() -> Result<()> {
    info!("Scanning for attached serial devices...");

    let enumerator = SystemDeviceEnumerator;
    let devices = enumerator.serial_devices()?;
    let tracked = snapshot::snapshot(&enumerator)?;

    if devices.is_empty() {
        println!("⚠️  No USB serial devices detected");
        return Ok(());
    }

    println!("🔍 Detected USB serial devices:");
    println!("===============================\n");

    for device in &devices {
        println!("Port: {}", device.port_name);
        println!("  VID:  0x{:04X}", device.vendor_id);
        println!("  PID:  0x{:04X}", device.product_id);
        if let Some(ref manufacturer) = device.manufacturer {
            println!("  Manufacturer: {}", manufacturer);
        }
        if let Some(ref product) = device.product {
            println!("  Product: {}", product);
        }
        match device.serial_number.as_deref() {
            Some(serial) if tracked.contains_key(serial) => println!("  Serial: {}", serial),
            _ => {
                debug!("{} has no serial number", device.port_name);
                println!("  Serial: (none, cannot be mapped)");
            }
        }
        println!();
    }

    println!(
        "Total devices detected: {} ({} with serial numbers)",
        devices.len(),
        tracked.len()
    );
    Ok(())
}
