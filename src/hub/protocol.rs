//! Hub power-control feature report encoding and decoding
//!
//! The hub exposes a single feature report (id 5) carrying one state byte per
//! downstream port. Writing the report applies ON/OFF to every port whose byte
//! is `'1'`/`'0'` and leaves ports marked `'x'` untouched. Reading the report
//! returns `'1'`/`'0'` for each port.

use std::fmt;
use std::str::FromStr;

use crate::errors::{HarnessError, Result};

/// Feature report identifier of the power-control report
pub const REPORT_ID: u8 = 5;
/// Number of port slots carried by the report
pub const PORT_SLOTS: usize = 8;
/// Report length including the identifier byte
pub const REPORT_LEN: usize = PORT_SLOTS + 1;

pub const BYTE_ON: u8 = b'1';
pub const BYTE_OFF: u8 = b'0';
pub const BYTE_UNCHANGED: u8 = b'x';

/// Requested state of a single port in a power command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortState {
    On,
    Off,
    #[default]
    Unchanged,
}

impl PortState {
    pub fn from_switch(on: bool) -> Self {
        if on { PortState::On } else { PortState::Off }
    }

    fn to_byte(self) -> u8 {
        match self {
            PortState::On => BYTE_ON,
            PortState::Off => BYTE_OFF,
            PortState::Unchanged => BYTE_UNCHANGED,
        }
    }

    /// Any character other than `'1'` or `'0'` leaves the port unchanged
    fn from_char(c: char) -> Self {
        match c {
            '1' => PortState::On,
            '0' => PortState::Off,
            _ => PortState::Unchanged,
        }
    }
}

/// Port selector accepted by power commands: a single port or all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSelector {
    All,
    Port(u8),
}

impl PortSelector {
    pub fn port(port: u8) -> Result<Self> {
        slot_index(port).map(|_| PortSelector::Port(port))
    }

    pub fn includes(&self, port: u8) -> bool {
        match self {
            PortSelector::All => true,
            PortSelector::Port(selected) => *selected == port,
        }
    }
}

/// Zero-based slot of a one-based port number
fn slot_index(port: u8) -> Result<usize> {
    usize::from(port)
        .checked_sub(1)
        .filter(|index| *index < PORT_SLOTS)
        .ok_or_else(|| {
            HarnessError::InvalidPortArgument(format!(
                "expected a port number 1-{} or 'a', got {}",
                PORT_SLOTS, port
            ))
        })
}

impl FromStr for PortSelector {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "a" {
            return Ok(PortSelector::All);
        }
        match s.parse::<u8>() {
            Ok(port) => PortSelector::port(port),
            Err(_) => Err(HarnessError::InvalidPortArgument(format!(
                "expected a port number 1-{} or 'a', got '{}'",
                PORT_SLOTS, s
            ))),
        }
    }
}

impl fmt::Display for PortSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSelector::All => write!(f, "all ports"),
            PortSelector::Port(port) => write!(f, "port {}", port),
        }
    }
}

/// Immutable eight-slot power command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortCommand {
    slots: [PortState; PORT_SLOTS],
}

impl PortCommand {
    /// Command that leaves every port as it is
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// Command switching the selected port(s), everything else unchanged
    pub fn switch(selector: PortSelector, on: bool) -> Result<Self> {
        Self::unchanged().with(selector, PortState::from_switch(on))
    }

    /// Copy of this command with the selected port(s) set to `state`
    pub fn with(mut self, selector: PortSelector, state: PortState) -> Result<Self> {
        match selector {
            PortSelector::All => self.slots = [state; PORT_SLOTS],
            PortSelector::Port(port) => self.slots[slot_index(port)?] = state,
        }
        Ok(self)
    }

    /// Parse an eight-character port set such as `"10xxxxxx"`
    pub fn parse_port_set(port_set: &str) -> Result<Self> {
        let chars: Vec<char> = port_set.chars().collect();
        if chars.len() != PORT_SLOTS {
            return Err(HarnessError::InvalidPortArgument(format!(
                "expected {}-character port set, got '{}'",
                PORT_SLOTS, port_set
            )));
        }
        let mut slots = [PortState::Unchanged; PORT_SLOTS];
        for (slot, c) in slots.iter_mut().zip(chars) {
            *slot = PortState::from_char(c);
        }
        Ok(Self { slots })
    }

    /// Overlay this command on `previous`: explicit slots win, unchanged slots
    /// inherit from `previous`.
    pub fn merge(self, previous: PortCommand) -> Self {
        let mut slots = previous.slots;
        for (slot, state) in slots.iter_mut().zip(self.slots) {
            if state != PortState::Unchanged {
                *slot = state;
            }
        }
        Self { slots }
    }

    pub fn state(&self, port: u8) -> Result<PortState> {
        Ok(self.slots[slot_index(port)?])
    }

    pub fn slots(&self) -> &[PortState; PORT_SLOTS] {
        &self.slots
    }

    /// Encode as the full nine-byte feature report
    pub fn encode(&self) -> [u8; REPORT_LEN] {
        let mut report = [0u8; REPORT_LEN];
        report[0] = REPORT_ID;
        for (byte, state) in report[1..].iter_mut().zip(self.slots) {
            *byte = state.to_byte();
        }
        report
    }
}

impl fmt::Display for PortCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for state in self.slots {
            write!(f, "{}", state.to_byte() as char)?;
        }
        Ok(())
    }
}

/// Reported power status of one port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    On,
    Off,
    Undefined(u8),
}

impl PortStatus {
    fn from_byte(byte: u8) -> Self {
        match byte {
            BYTE_ON => PortStatus::On,
            BYTE_OFF => PortStatus::Off,
            other => PortStatus::Undefined(other),
        }
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortStatus::On => write!(f, "ON"),
            PortStatus::Off => write!(f, "OFF"),
            PortStatus::Undefined(_) => write!(f, "Undefined"),
        }
    }
}

/// Decoded state report for all port slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubState {
    ports: [PortStatus; PORT_SLOTS],
}

impl HubState {
    /// Decode a feature report read back from the hub.
    ///
    /// Slots missing from a short report decode as undefined.
    pub fn decode(report: &[u8]) -> Self {
        let mut ports = [PortStatus::Undefined(0); PORT_SLOTS];
        for (index, status) in ports.iter_mut().enumerate() {
            if let Some(byte) = report.get(index + 1) {
                *status = PortStatus::from_byte(*byte);
            }
        }
        Self { ports }
    }

    pub fn port(&self, port: u8) -> Result<PortStatus> {
        Ok(self.ports[slot_index(port)?])
    }

    /// Iterate `(port number, status)` pairs starting at port 1
    pub fn iter(&self) -> impl Iterator<Item = (u8, PortStatus)> + '_ {
        self.ports
            .iter()
            .enumerate()
            .map(|(index, status)| (index as u8 + 1, *status))
    }
}
