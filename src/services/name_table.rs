//! Serial number to board name lookup

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::Result;

/// Name given to serials missing from the table
pub const UNKNOWN_DEVICE: &str = "unknown_device";

/// Descriptive record of a known device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceName {
    pub name: String,
}

/// Read-only serial → name table
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    entries: HashMap<String, DeviceName>,
}

impl NameTable {
    pub fn new(entries: HashMap<String, DeviceName>) -> Self {
        Self { entries }
    }

    /// Load the table; a missing file yields an empty table
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Could not find device list {}, all devices will be unknown", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let entries: HashMap<String, DeviceName> = serde_json::from_str(&content)?;
        info!("Loaded {} device name(s) from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn lookup(&self, serial: &str) -> Option<&DeviceName> {
        self.entries.get(serial)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Append-only record of serials missing from the name table
#[derive(Debug, Clone)]
pub struct UnknownDeviceLog {
    path: PathBuf,
}

impl UnknownDeviceLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, serial: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "Unknown device with serial number: {}", serial)?;
        Ok(())
    }
}

/// Resolves serials to names, logging the ones it cannot resolve
pub struct DeviceIdentifier {
    table: NameTable,
    unknown_log: UnknownDeviceLog,
}

impl DeviceIdentifier {
    pub fn new(table: NameTable, unknown_log: UnknownDeviceLog) -> Self {
        Self { table, unknown_log }
    }

    /// Name for `serial`, or `unknown_device` after appending it to the log
    pub fn identify(&self, serial: &str) -> Result<String> {
        match self.table.lookup(serial) {
            Some(device) => Ok(device.name.clone()),
            None => {
                warn!("Unknown device with serial number {}", serial);
                self.unknown_log.record(serial)?;
                Ok(UNKNOWN_DEVICE.to_string())
            }
        }
    }
}
