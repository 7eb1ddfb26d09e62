//! Device snapshot engine
//!
//! Snapshots capture every serial-capable USB device that reports a serial
//! number. Diffing two snapshots yields the devices that appeared in between.

use log::{debug, trace};
use serialport::SerialPortType;

use crate::errors::Result;
use crate::models::device::{DeviceAttributes, DeviceSnapshot, SerialDevice};

/// Source of the currently attached serial devices
pub trait DeviceEnumerator: Send + Sync {
    fn serial_devices(&self) -> Result<Vec<SerialDevice>>;
}

/// Enumerates the host's serial ports through `serialport`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDeviceEnumerator;

impl DeviceEnumerator for SystemDeviceEnumerator {
    fn serial_devices(&self) -> Result<Vec<SerialDevice>> {
        let ports = serialport::available_ports()?;

        let devices = ports
            .into_iter()
            .filter_map(|port_info| match port_info.port_type {
                SerialPortType::UsbPort(usb) => Some(SerialDevice {
                    port_name: port_info.port_name,
                    serial_number: usb.serial_number,
                    vendor_id: usb.vid,
                    product_id: usb.pid,
                    manufacturer: usb.manufacturer,
                    product: usb.product,
                }),
                _ => {
                    trace!("Ignoring non-USB port {}", port_info.port_name);
                    None
                }
            })
            .collect();

        Ok(devices)
    }
}

/// Take a snapshot of attached devices keyed by serial number.
///
/// Devices without a serial number cannot be tracked and are left out.
pub fn snapshot(enumerator: &dyn DeviceEnumerator) -> Result<DeviceSnapshot> {
    let mut snapshot = DeviceSnapshot::new();
    for device in enumerator.serial_devices()? {
        match device.serial_number.as_deref() {
            Some(serial) if !serial.is_empty() => {
                snapshot.insert(serial.to_string(), DeviceAttributes::from(&device));
            }
            _ => debug!("Skipping {} without serial number", device.port_name),
        }
    }
    Ok(snapshot)
}

/// Devices present in `after` whose serial is absent from `before`
pub fn diff(before: &DeviceSnapshot, after: &DeviceSnapshot) -> DeviceSnapshot {
    after
        .iter()
        .filter(|(serial, _)| !before.contains_key(*serial))
        .map(|(serial, attributes)| (serial.clone(), attributes.clone()))
        .collect()
}
