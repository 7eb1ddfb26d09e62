//! Attached-device data models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One serial-capable device as reported by host enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialDevice {
    /// Host-assigned port name, e.g. `/dev/ttyACM0` or `COM3`
    pub port_name: String,
    /// USB serial number, when the device reports one
    pub serial_number: Option<String>,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// Identifying attributes of a device in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAttributes {
    /// Host-assigned name
    pub name: String,
    /// Vendor id as four lowercase hex digits
    pub vendor_id: String,
    /// Product id as four lowercase hex digits
    pub product_id: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<&SerialDevice> for DeviceAttributes {
    fn from(device: &SerialDevice) -> Self {
        Self {
            name: device.port_name.clone(),
            vendor_id: format!("{:04x}", device.vendor_id),
            product_id: format!("{:04x}", device.product_id),
            manufacturer: device.manufacturer.clone(),
            product: device.product.clone(),
        }
    }
}

/// Devices keyed by serial number
pub type DeviceSnapshot = BTreeMap<String, DeviceAttributes>;
