//! libusb transport for the hub control interface
//!
//! Feature reports travel as HID class control transfers (SET_REPORT /
//! GET_REPORT) addressed to the control interface. Paths have the form
//! `BBB-AAA:I` (bus, address, interface number). A boot-keyboard interface
//! gets the keyboard suffix so the locator can drop it, unless it is the only
//! HID interface of the hub.

use log::{debug, warn};
use rusb::{Context, DeviceHandle, Direction, Recipient, RequestType, UsbContext};
use std::time::Duration;

use crate::errors::{HarnessError, Result};
use crate::hub::driver::{HubBackend, HubCandidate, HubChannel};
use crate::hub::locator::KEYBOARD_INTERFACE_SUFFIX;

const HID_CLASS: u8 = 0x03;
const HID_PROTOCOL_KEYBOARD: u8 = 0x01;
const HID_GET_REPORT: u8 = 0x01;
const HID_SET_REPORT: u8 = 0x09;
const HID_REPORT_TYPE_FEATURE: u16 = 0x03;

/// Parsed `BBB-AAA:I` channel path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UsbPath {
    bus: u8,
    address: u8,
    interface: u8,
}

impl UsbPath {
    fn format(&self, keyboard: bool) -> String {
        let suffix = if keyboard { KEYBOARD_INTERFACE_SUFFIX } else { "" };
        format!(
            "{:03}-{:03}:{}{}",
            self.bus, self.address, self.interface, suffix
        )
    }

    fn parse(path: &str) -> Option<Self> {
        let path = path.strip_suffix(KEYBOARD_INTERFACE_SUFFIX).unwrap_or(path);
        let (device, interface) = path.split_once(':')?;
        let (bus, address) = device.split_once('-')?;
        Some(Self {
            bus: bus.parse().ok()?,
            address: address.parse().ok()?,
            interface: interface.parse().ok()?,
        })
    }
}

/// One HID interface of a hub, as read from its configuration descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HidInterface {
    number: u8,
    protocol: u8,
}

impl HidInterface {
    fn is_boot_keyboard(&self) -> bool {
        self.protocol == HID_PROTOCOL_KEYBOARD
    }
}

/// Pair each interface with its keyboard flag. Keyboard interfaces are only
/// flagged while another HID interface of the device remains to control.
fn flag_keyboard_interfaces(interfaces: &[HidInterface]) -> Vec<(HidInterface, bool)> {
    let has_control = interfaces.iter().any(|interface| !interface.is_boot_keyboard());
    interfaces
        .iter()
        .map(|interface| (*interface, has_control && interface.is_boot_keyboard()))
        .collect()
}

/// Hub backend talking to the hardware through libusb
pub struct UsbHubBackend {
    context: Context,
    timeout: Duration,
}

impl UsbHubBackend {
    pub fn new(timeout: Duration) -> Result<Self> {
        let context = Context::new()?;
        Ok(Self { context, timeout })
    }
}

impl HubBackend for UsbHubBackend {
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<HubCandidate>> {
        let mut candidates = Vec::new();

        for device in self.context.devices()?.iter() {
            // Unreadable descriptors belong to unrelated devices
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };
            if descriptor.vendor_id() != vendor_id || descriptor.product_id() != product_id {
                continue;
            }

            let serial_number = match device.open() {
                Ok(handle) => handle
                    .read_serial_number_string_ascii(&descriptor)
                    .unwrap_or_default(),
                Err(e) => {
                    warn!(
                        "Cannot open hub at bus {} address {}: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    String::new()
                }
            };

            let Ok(config) = device.active_config_descriptor() else {
                continue;
            };
            let interfaces: Vec<HidInterface> = config
                .interfaces()
                .flat_map(|interface| interface.descriptors())
                .filter(|setting| {
                    setting.class_code() == HID_CLASS && setting.setting_number() == 0
                })
                .map(|setting| HidInterface {
                    number: setting.interface_number(),
                    protocol: setting.protocol_code(),
                })
                .collect();

            for (interface, keyboard) in flag_keyboard_interfaces(&interfaces) {
                let path = UsbPath {
                    bus: device.bus_number(),
                    address: device.address(),
                    interface: interface.number,
                };
                candidates.push(HubCandidate {
                    serial_number: serial_number.clone(),
                    path: path.format(keyboard),
                });
            }
        }

        debug!("Enumerated {} hub interface(s)", candidates.len());
        Ok(candidates)
    }

    fn open(&self, path: &str) -> Result<Box<dyn HubChannel>> {
        let open_failure = |reason: String| HarnessError::ChannelOpenFailure {
            path: path.to_string(),
            reason,
        };
        let target = UsbPath::parse(path).ok_or_else(|| open_failure("malformed path".into()))?;

        let device = self
            .context
            .devices()?
            .iter()
            .find(|device| device.bus_number() == target.bus && device.address() == target.address)
            .ok_or_else(|| open_failure("device no longer attached".into()))?;

        let mut handle = device.open().map_err(|e| open_failure(e.to_string()))?;
        // Not supported on every platform; claiming still works where the
        // kernel does not bind a driver.
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            debug!("Kernel driver auto-detach unavailable: {}", e);
        }
        handle
            .claim_interface(target.interface)
            .map_err(|e| open_failure(e.to_string()))?;

        Ok(Box::new(UsbHubChannel {
            handle,
            interface: target.interface,
            timeout: self.timeout,
        }))
    }
}

struct UsbHubChannel {
    handle: DeviceHandle<Context>,
    interface: u8,
    timeout: Duration,
}

impl HubChannel for UsbHubChannel {
    fn send_feature_report(&mut self, report: &[u8]) -> Result<()> {
        let report_id = report.first().copied().unwrap_or_default();
        let request_type =
            rusb::request_type(Direction::Out, RequestType::Class, Recipient::Interface);
        self.handle.write_control(
            request_type,
            HID_SET_REPORT,
            (HID_REPORT_TYPE_FEATURE << 8) | u16::from(report_id),
            u16::from(self.interface),
            report,
            self.timeout,
        )?;
        Ok(())
    }

    fn get_feature_report(&mut self, report_id: u8, len: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        let request_type =
            rusb::request_type(Direction::In, RequestType::Class, Recipient::Interface);
        let read = self.handle.read_control(
            request_type,
            HID_GET_REPORT,
            (HID_REPORT_TYPE_FEATURE << 8) | u16::from(report_id),
            u16::from(self.interface),
            &mut buffer,
            self.timeout,
        )?;
        buffer.truncate(read);
        Ok(buffer)
    }
}

impl Drop for UsbHubChannel {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            debug!("Failed to release hub interface {}: {}", self.interface, e);
        }
    }
}
