//! hubtest - Hub-mediated embedded test bench
//!
//! hubtest drives a programmable USB hub to switch power on individual
//! downstream ports, maps hub ports to the boards attached to them, and runs
//! a watchdog acceptance test on every mapped board: flash a test firmware,
//! watch the serial console for a watchdog-triggered reset, and record the
//! timed result.

pub mod cli;
pub mod config;
pub mod errors;
pub mod hub;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use errors::*;
pub use models::*;

/// hubtest version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// hubtest application name
pub const APP_NAME: &str = "hubtest";
