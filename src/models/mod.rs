//! Data models and types used throughout hubtest

pub mod device;
pub mod port_map;
pub mod watchdog;

// Re-export commonly used types
pub use device::*;
pub use port_map::*;
pub use watchdog::*;
