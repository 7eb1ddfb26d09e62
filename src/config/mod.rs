//! Configuration management for hubtest

pub mod app_config;

pub use app_config::*;
