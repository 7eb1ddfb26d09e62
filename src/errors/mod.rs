//! Error handling for hubtest

pub mod types;

pub use types::*;
