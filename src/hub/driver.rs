//! Transport seam for the hub control channel
//!
//! `HubBackend` enumerates hub control interfaces and opens channels to them;
//! `HubChannel` moves feature reports. The free functions below are the
//! driver contract used by the rest of the crate.

use log::{debug, trace};

use crate::errors::{HarnessError, Result};
use crate::hub::protocol::{HubState, PortCommand, REPORT_ID, REPORT_LEN};

/// One enumerated hub control interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubCandidate {
    /// Serial number reported by the hub (empty when unreadable)
    pub serial_number: String,
    /// Opaque transport path used to open the channel
    pub path: String,
}

/// Open control channel to one hub
pub trait HubChannel: Send {
    /// Write a complete feature report, report id first
    fn send_feature_report(&mut self, report: &[u8]) -> Result<()>;

    /// Read a feature report of up to `len` bytes, report id first
    fn get_feature_report(&mut self, report_id: u8, len: usize) -> Result<Vec<u8>>;
}

/// Access to the hub controllers attached to this host
pub trait HubBackend: Send + Sync {
    /// Enumerate every interface matching the vendor/product pair
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<HubCandidate>>;

    /// Open a control channel to the interface at `path`
    fn open(&self, path: &str) -> Result<Box<dyn HubChannel>>;
}

/// Open a control channel, reporting every failure as `ChannelOpenFailure`
pub fn open(backend: &dyn HubBackend, path: &str) -> Result<Box<dyn HubChannel>> {
    debug!("Opening hub control channel {}", path);
    backend.open(path).map_err(|e| match e {
        HarnessError::ChannelOpenFailure { .. } => e,
        other => HarnessError::ChannelOpenFailure {
            path: path.to_string(),
            reason: other.to_string(),
        },
    })
}

/// Write the full nine-byte power command
pub fn set_ports(channel: &mut dyn HubChannel, command: &PortCommand) -> Result<()> {
    let report = command.encode();
    trace!("Sending feature report {:?}", report);
    channel.send_feature_report(&report)
}

/// Read back and decode the per-port power status
pub fn get_state(channel: &mut dyn HubChannel) -> Result<HubState> {
    let report = channel.get_feature_report(REPORT_ID, REPORT_LEN)?;
    trace!("Received feature report {:?}", report);
    Ok(HubState::decode(&report))
}

/// Release the channel
pub fn close(channel: Box<dyn HubChannel>) {
    drop(channel);
}
