//! Hub controller resolution

use log::{debug, info};

use crate::errors::{HarnessError, Result};
use crate::hub::driver::{HubBackend, HubCandidate};

/// Path suffix marking the keyboard interface a hub exposes next to its
/// control interface
pub const KEYBOARD_INTERFACE_SUFFIX: &str = "\\KBD";

/// Predicate deciding whether an enumerated path is a control interface
pub type ControlInterfaceFilter = fn(&str) -> bool;

/// Default predicate: everything except the keyboard interface
pub fn is_control_interface(path: &str) -> bool {
    !path.ends_with(KEYBOARD_INTERFACE_SUFFIX)
}

/// Resolved hub controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubIdentity {
    pub serial_number: String,
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Pick the target hub out of the enumerated control interfaces.
///
/// With a serial filter the first candidate carrying that serial wins. Without
/// one, exactly one candidate must remain.
pub fn resolve(candidates: &[HubCandidate], serial_filter: Option<&str>) -> Result<HubCandidate> {
    if candidates.is_empty() {
        return Err(HarnessError::HubNotFound);
    }

    match serial_filter {
        Some(serial) => candidates
            .iter()
            .find(|candidate| candidate.serial_number == serial)
            .cloned()
            .ok_or_else(|| HarnessError::HubSerialMismatch(serial.to_string())),
        None if candidates.len() > 1 => Err(HarnessError::HubAmbiguous(
            candidates
                .iter()
                .map(|candidate| candidate.serial_number.clone())
                .collect(),
        )),
        None => Ok(candidates[0].clone()),
    }
}

/// Enumerates hub controllers through a backend and resolves the target one
pub struct HubLocator<'a> {
    backend: &'a dyn HubBackend,
    vendor_id: u16,
    product_id: u16,
    filter: ControlInterfaceFilter,
}

impl<'a> HubLocator<'a> {
    pub fn new(backend: &'a dyn HubBackend, vendor_id: u16, product_id: u16) -> Self {
        Self {
            backend,
            vendor_id,
            product_id,
            filter: is_control_interface,
        }
    }

    /// Replace the control-interface predicate
    pub fn with_filter(mut self, filter: ControlInterfaceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Enumerate control interfaces, one per physical hub
    pub fn list(&self) -> Result<Vec<HubCandidate>> {
        let candidates: Vec<HubCandidate> = self
            .backend
            .enumerate(self.vendor_id, self.product_id)?
            .into_iter()
            .filter(|candidate| {
                let keep = (self.filter)(&candidate.path);
                if !keep {
                    debug!("Skipping non-control interface {}", candidate.path);
                }
                keep
            })
            .collect();
        Ok(candidates)
    }

    /// Resolve the hub to control, optionally by serial number
    pub fn find(&self, serial_filter: Option<&str>) -> Result<HubIdentity> {
        let candidates = self.list()?;
        let selected = resolve(&candidates, serial_filter)?;
        info!(
            "Using hub controller {} at {}",
            selected.serial_number, selected.path
        );
        Ok(HubIdentity {
            serial_number: selected.serial_number,
            path: selected.path,
            vendor_id: self.vendor_id,
            product_id: self.product_id,
        })
    }
}
