//! Utility functions and helpers used throughout hubtest

pub mod logging;
