//! Programmable USB hub: power-control protocol, transport and hub resolution

pub mod controller;
pub mod driver;
pub mod locator;
pub mod protocol;
pub mod usb;

pub use controller::HubController;
pub use driver::{HubBackend, HubCandidate, HubChannel};
pub use locator::{HubIdentity, HubLocator, is_control_interface};
pub use protocol::{HubState, PortCommand, PortSelector, PortState, PortStatus};
pub use usb::UsbHubBackend;
