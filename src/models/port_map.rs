//! Port map produced by discovery and consumed by the watchdog run

use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::Result;

/// One identified device on one hub port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEntry {
    #[serde(rename = "Port")]
    pub port: u8,
    #[serde(rename = "Serial_number")]
    pub serial_number: String,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Hub serial plus every identified port entry.
///
/// A port may appear more than once when several devices showed up on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMap {
    #[serde(rename = "Hub serial")]
    pub hub_serial: String,
    #[serde(rename = "Ports")]
    pub ports: Vec<PortEntry>,
}

impl PortMap {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the map as indented JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Port map written to {}", path.display());
        Ok(())
    }

    /// Entries sorted by port number, keeping discovery order within a port
    pub fn entries_by_port(&self) -> Vec<&PortEntry> {
        let mut entries: Vec<&PortEntry> = self.ports.iter().collect();
        entries.sort_by_key(|entry| entry.port);
        entries
    }

    /// Ports that carry more than one device
    pub fn ambiguous_ports(&self) -> Vec<u8> {
        let mut ports: Vec<u8> = self
            .entries_by_port()
            .windows(2)
            .filter(|pair| pair[0].port == pair[1].port)
            .map(|pair| pair[0].port)
            .collect();
        ports.dedup();
        ports
    }
}
