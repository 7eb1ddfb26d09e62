//! Harness configuration management

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{HarnessError, Result};
use crate::hub::protocol::PORT_SLOTS;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "hubtest.toml";

/// Main harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory holding the name table, port maps and test results
    pub data_dir: PathBuf,
    /// Artifact file names inside `data_dir`
    pub files: FileConfig,
    /// Hub controller configuration
    pub hub: HubConfig,
    /// Serial monitor configuration
    pub monitor: MonitorConfig,
    /// Firmware build tool configuration
    pub firmware: FirmwareConfig,
}

/// Names of the files kept in the data directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub device_list: String,
    pub unknown_devices: String,
    pub discovered_map: String,
    pub manual_map: String,
}

/// Hub controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// USB vendor id of the hub control interface
    pub vendor_id: u16,
    /// USB product id of the hub control interface
    pub product_id: u16,
    /// Number of downstream ports probed during discovery
    pub port_count: u8,
    /// Wait after every power transition, in milliseconds
    pub settle_delay_ms: u64,
    /// Control transfer timeout, in milliseconds
    pub transfer_timeout_ms: u64,
}

/// Watchdog serial monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub baud_rate: u32,
    /// Wall-clock limit for observing the marker
    pub timeout_secs: u64,
    /// Liveness polling interval of the controlling loop
    pub poll_interval_ms: u64,
    /// Console substring signalling a watchdog-triggered reset
    pub marker: String,
}

/// Firmware build tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    /// Build tool executable
    pub tool: String,
    /// Project directory the tool runs in (current directory if unset)
    pub project_dir: Option<PathBuf>,
    /// Prefix prepended to the board name to form the BSP path
    pub bsp_prefix: String,
    /// Application path of the boot-loader image
    pub boot_app: String,
    /// Directory prefix for regular applications
    pub app_prefix: String,
    pub boot_build_profile: String,
    pub build_profile: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hubtest");

        Self {
            data_dir,
            files: FileConfig::default(),
            hub: HubConfig::default(),
            monitor: MonitorConfig::default(),
            firmware: FirmwareConfig::default(),
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            device_list: "device_list.json".to_string(),
            unknown_devices: "unknown_devices".to_string(),
            discovered_map: "device_map_discover.json".to_string(),
            manual_map: "device_map.json".to_string(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0xC0CA,
            product_id: 0xC001,
            port_count: 7,
            settle_delay_ms: 3000,
            transfer_timeout_ms: 500,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            timeout_secs: 60,
            poll_interval_ms: 200,
            marker: "Reset reason: Watchdog".to_string(),
        }
    }
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            tool: "newt".to_string(),
            project_dir: None,
            bsp_prefix: "@apache-mynewt-core/hw/bsp/".to_string(),
            boot_app: "@mcuboot/boot/mynewt".to_string(),
            app_prefix: "apps/".to_string(),
            boot_build_profile: "optimized".to_string(),
            build_profile: "debug".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from an explicit file, or from `hubtest.toml` when present.
    ///
    /// An explicit path that does not exist is an error; a missing default file
    /// falls back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(HarnessError::Config(format!(
                        "configuration file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    debug!("No {} found, using default configuration", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config: HarnessConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if usize::from(self.hub.port_count) > PORT_SLOTS {
            return Err(HarnessError::Config(format!(
                "hub.port_count must be at most {}, got {}",
                PORT_SLOTS, self.hub.port_count
            )));
        }
        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| HarnessError::Serialization(e.to_string()))
    }

    pub fn device_list_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.device_list)
    }

    pub fn unknown_devices_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.unknown_devices)
    }

    pub fn discovered_map_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.discovered_map)
    }

    pub fn manual_map_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.manual_map)
    }
}

impl HubConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }
}

impl MonitorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
