//! Services driving the test bench
//!
//! Snapshotting, naming, port discovery, firmware loading, serial monitoring
//! and the watchdog run itself. Hardware access goes through the traits
//! defined here so the flows can run against a simulated bench.

pub mod console;
pub mod firmware;
pub mod name_table;
pub mod orchestrator;
pub mod port_mapper;
pub mod snapshot;
pub mod watchdog_monitor;

pub use console::{
    BufferedLineSource, LineSource, SerialConnector, TokioSerialConnector, decode_permissive,
};
pub use firmware::{FirmwareApp, FirmwareBuilder, NewtTool, TargetSpec, ToolOutput, build_and_load};
pub use name_table::{DeviceIdentifier, DeviceName, NameTable, UNKNOWN_DEVICE, UnknownDeviceLog};
pub use orchestrator::WatchdogOrchestrator;
pub use port_mapper::{DiscoveredPorts, PortMapper, build_port_map};
pub use snapshot::{DeviceEnumerator, SystemDeviceEnumerator};
pub use watchdog_monitor::{MonitorSignals, WatchdogMonitor};
