//! High-level power control of one resolved hub

use log::{debug, info};

use crate::config::HubConfig;
use crate::errors::Result;
use crate::hub::driver::{self, HubBackend};
use crate::hub::locator::{HubIdentity, HubLocator};
use crate::hub::protocol::{HubState, PortCommand, PortSelector};

/// Power controller bound to a single hub.
///
/// Every operation opens the control channel, transfers one report and closes
/// the channel again, so the hub can be unplugged between operations.
pub struct HubController {
    backend: Box<dyn HubBackend>,
    identity: HubIdentity,
}

impl HubController {
    /// Resolve the hub through `backend` and bind to it
    pub fn connect(
        backend: Box<dyn HubBackend>,
        config: &HubConfig,
        serial_filter: Option<&str>,
    ) -> Result<Self> {
        let locator = HubLocator::new(backend.as_ref(), config.vendor_id, config.product_id);
        let identity = locator.find(serial_filter)?;
        Ok(Self { backend, identity })
    }

    pub fn identity(&self) -> &HubIdentity {
        &self.identity
    }

    pub fn serial(&self) -> &str {
        &self.identity.serial_number
    }

    /// Send a complete power command
    pub fn apply(&self, command: &PortCommand) -> Result<()> {
        debug!("Hub {}: applying port set {}", self.serial(), command);
        let mut channel = driver::open(self.backend.as_ref(), &self.identity.path)?;
        let result = driver::set_ports(channel.as_mut(), command);
        driver::close(channel);
        result
    }

    /// Switch the selected port(s) on or off, leaving the rest unchanged
    pub fn set_power(&self, selector: PortSelector, on: bool) -> Result<()> {
        info!(
            "Hub {}: powering {} {}",
            self.serial(),
            if on { "on" } else { "off" },
            selector
        );
        self.apply(&PortCommand::switch(selector, on)?)
    }

    /// Read back the power status of every port
    pub fn get_state(&self) -> Result<HubState> {
        let mut channel = driver::open(self.backend.as_ref(), &self.identity.path)?;
        let result = driver::get_state(channel.as_mut());
        driver::close(channel);
        result
    }
}
