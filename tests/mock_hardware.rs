//! Mock Hardware Simulation Framework
//!
//! A simulated bench: hub controllers whose port power decides which boards
//! appear on the USB bus, a scripted serial console per board, and a firmware
//! builder that records every call.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use hubtest::config::{FirmwareConfig, HubConfig, MonitorConfig};
use hubtest::errors::{HarnessError, Result};
use hubtest::hub::protocol::{PORT_SLOTS, REPORT_ID};
use hubtest::hub::{HubBackend, HubCandidate, HubChannel};
use hubtest::models::SerialDevice;
use hubtest::services::{
    DeviceEnumerator, FirmwareBuilder, LineSource, SerialConnector, TargetSpec, ToolOutput,
};

pub const HUB_VID: u16 = 0xC0CA;
pub const HUB_PID: u16 = 0xC001;

/// One line the simulated console emits, `at` after the console is opened
#[derive(Debug, Clone)]
pub struct ConsoleLine {
    pub at: Duration,
    pub bytes: Vec<u8>,
}

/// What the console does once its scripted lines are used up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleEnd {
    /// Stay silent forever
    Silent,
    /// Report end of stream
    Close,
    /// Fail with an I/O error
    Fail,
}

/// Board plugged into a hub port
#[derive(Debug, Clone)]
pub struct MockBoard {
    pub port: u8,
    pub serial: String,
    pub port_name: String,
    pub console: Vec<ConsoleLine>,
    pub console_end: ConsoleEnd,
}

impl MockBoard {
    pub fn new(port: u8, serial: &str) -> Self {
        Self {
            port,
            serial: serial.to_string(),
            port_name: format!("/dev/ttyACM{}", port),
            console: Vec::new(),
            console_end: ConsoleEnd::Silent,
        }
    }

    /// Emit `line` after `at`
    pub fn line_at(mut self, at: Duration, line: &str) -> Self {
        self.console.push(ConsoleLine {
            at,
            bytes: line.as_bytes().to_vec(),
        });
        self
    }

    /// Emit the watchdog reset banner after `at`
    pub fn resets_after(self, at: Duration) -> Self {
        self.line_at(at, "Reset reason: Watchdog")
    }

    pub fn ending_with(mut self, end: ConsoleEnd) -> Self {
        self.console_end = end;
        self
    }
}

#[derive(Debug, Default)]
struct BenchState {
    hubs: Vec<HubCandidate>,
    power: [bool; PORT_SLOTS],
    boards: Vec<MockBoard>,
    fixed_devices: Vec<SerialDevice>,
    reports: Vec<Vec<u8>>,
    opened_channels: usize,
    fail_open: bool,
    enumerations: usize,
    fail_enumeration_on: Option<usize>,
}

/// Shared state of the simulated bench
#[derive(Debug, Clone, Default)]
pub struct MockBench {
    state: Arc<Mutex<BenchState>>,
}

impl MockBench {
    /// Bench with a single hub controller with serial `hub_serial`
    pub fn with_hub(hub_serial: &str) -> Self {
        let bench = Self::default();
        bench.add_hub(hub_serial, "001-004:0");
        bench
    }

    pub fn add_hub(&self, serial: &str, path: &str) {
        self.state.lock().unwrap().hubs.push(HubCandidate {
            serial_number: serial.to_string(),
            path: path.to_string(),
        });
    }

    pub fn add_board(&self, board: MockBoard) {
        self.state.lock().unwrap().boards.push(board);
    }

    /// Device attached directly to the host, present regardless of hub power
    pub fn add_fixed_device(&self, port_name: &str, serial: Option<&str>) {
        self.state
            .lock()
            .unwrap()
            .fixed_devices
            .push(serial_device(port_name, serial));
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().unwrap().fail_open = fail;
    }

    /// Make the `nth` serial enumeration from now on fail (1 is the next one)
    pub fn fail_enumeration_on(&self, nth: usize) {
        let mut state = self.state.lock().unwrap();
        state.fail_enumeration_on = Some(state.enumerations + nth);
    }

    pub fn is_powered(&self, port: u8) -> bool {
        self.state.lock().unwrap().power[usize::from(port) - 1]
    }

    pub fn powered_ports(&self) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        (1..=PORT_SLOTS as u8)
            .filter(|port| state.power[usize::from(*port) - 1])
            .collect()
    }

    /// Every feature report written to the hub, in order
    pub fn reports(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().reports.clone()
    }

    pub fn opened_channels(&self) -> usize {
        self.state.lock().unwrap().opened_channels
    }

    pub fn backend(&self) -> Box<dyn HubBackend> {
        Box::new(MockHubBackend {
            bench: self.clone(),
        })
    }

    pub fn enumerator(&self) -> MockEnumerator {
        MockEnumerator {
            bench: self.clone(),
        }
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector {
            bench: self.clone(),
        }
    }

    fn attached_boards(&self) -> Vec<MockBoard> {
        let state = self.state.lock().unwrap();
        state
            .boards
            .iter()
            .filter(|board| state.power[usize::from(board.port) - 1])
            .cloned()
            .collect()
    }
}

fn serial_device(port_name: &str, serial: Option<&str>) -> SerialDevice {
    SerialDevice {
        port_name: port_name.to_string(),
        serial_number: serial.map(str::to_string),
        vendor_id: 0x1366,
        product_id: 0x1015,
        manufacturer: Some("SEGGER".to_string()),
        product: Some("J-Link".to_string()),
    }
}

pub struct MockHubBackend {
    bench: MockBench,
}

impl HubBackend for MockHubBackend {
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<HubCandidate>> {
        if vendor_id != HUB_VID || product_id != HUB_PID {
            return Ok(Vec::new());
        }
        Ok(self.bench.state.lock().unwrap().hubs.clone())
    }

    fn open(&self, path: &str) -> Result<Box<dyn HubChannel>> {
        let mut state = self.bench.state.lock().unwrap();
        if state.fail_open || !state.hubs.iter().any(|hub| hub.path == path) {
            return Err(HarnessError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "no such device",
            )));
        }
        state.opened_channels += 1;
        Ok(Box::new(MockHubChannel {
            bench: self.bench.clone(),
        }))
    }
}

/// Control channel applying reports the way the hub firmware does
pub struct MockHubChannel {
    bench: MockBench,
}

impl HubChannel for MockHubChannel {
    fn send_feature_report(&mut self, report: &[u8]) -> Result<()> {
        let mut state = self.bench.state.lock().unwrap();
        state.reports.push(report.to_vec());
        for (slot, byte) in state.power.iter_mut().zip(report.iter().skip(1)) {
            match byte {
                b'1' => *slot = true,
                b'0' => *slot = false,
                _ => {}
            }
        }
        Ok(())
    }

    fn get_feature_report(&mut self, report_id: u8, len: usize) -> Result<Vec<u8>> {
        let state = self.bench.state.lock().unwrap();
        let mut report = vec![report_id];
        report.extend(state.power.iter().map(|on| if *on { b'1' } else { b'0' }));
        report.truncate(len);
        assert_eq!(report_id, REPORT_ID);
        Ok(report)
    }
}

/// USB bus view: fixed devices plus boards on powered ports
pub struct MockEnumerator {
    bench: MockBench,
}

impl DeviceEnumerator for MockEnumerator {
    fn serial_devices(&self) -> Result<Vec<SerialDevice>> {
        let mut devices = {
            let mut state = self.bench.state.lock().unwrap();
            state.enumerations += 1;
            if state.fail_enumeration_on == Some(state.enumerations) {
                return Err(HarnessError::Enumeration(
                    "USB bus enumeration failed".to_string(),
                ));
            }
            state.fixed_devices.clone()
        };
        devices.extend(
            self.bench
                .attached_boards()
                .iter()
                .map(|board| serial_device(&board.port_name, Some(&board.serial))),
        );
        Ok(devices)
    }
}

pub struct MockConnector {
    bench: MockBench,
}

#[async_trait]
impl SerialConnector for MockConnector {
    async fn open(&self, port_name: &str, _baud_rate: u32) -> Result<Box<dyn LineSource>> {
        let board = self
            .bench
            .attached_boards()
            .into_iter()
            .find(|board| board.port_name == port_name)
            .ok_or_else(|| HarnessError::ChannelOpenFailure {
                path: port_name.to_string(),
                reason: "no such device".to_string(),
            })?;
        Ok(Box::new(ScriptedConsole {
            opened: Instant::now(),
            lines: board.console.into(),
            end: board.console_end,
        }))
    }
}

/// Console replaying scripted lines on the tokio clock
pub struct ScriptedConsole {
    opened: Instant,
    lines: VecDeque<ConsoleLine>,
    end: ConsoleEnd,
}

#[async_trait]
impl LineSource for ScriptedConsole {
    async fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let deadline = match self.lines.front() {
            Some(next) => self.opened + next.at,
            None => {
                return match self.end {
                    ConsoleEnd::Silent => std::future::pending().await,
                    ConsoleEnd::Close => Ok(None),
                    ConsoleEnd::Fail => Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "device disconnected",
                    )),
                };
            }
        };
        // Sleeping before popping keeps a cancelled read from losing the line
        tokio::time::sleep_until(deadline).await;
        Ok(self.lines.pop_front().map(|line| line.bytes))
    }
}

/// Firmware builder recording every call
#[derive(Debug, Clone, Default)]
pub struct MockBuilder {
    calls: Arc<Mutex<Vec<String>>>,
    existing_targets: Arc<Mutex<HashSet<String>>>,
    fail_builds: bool,
}

impl MockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder whose `build` step always fails
    pub fn failing() -> Self {
        Self {
            fail_builds: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(call);
        Ok(ToolOutput::default())
    }
}

#[async_trait]
impl FirmwareBuilder for MockBuilder {
    async fn target_exists(&self, name: &str) -> bool {
        self.existing_targets.lock().unwrap().contains(name)
    }

    async fn create_target(&self, name: &str) -> Result<ToolOutput> {
        self.existing_targets.lock().unwrap().insert(name.to_string());
        self.record(format!("create {}", name))
    }

    async fn configure_target(&self, target: &TargetSpec) -> Result<ToolOutput> {
        self.record(format!(
            "set {} app={} bsp={} build_profile={}",
            target.name, target.app, target.bsp, target.build_profile
        ))
    }

    async fn build(&self, name: &str) -> Result<ToolOutput> {
        if self.fail_builds {
            self.calls.lock().unwrap().push(format!("build {}", name));
            return Err(HarnessError::FlashFailure {
                target: name.to_string(),
                message: "compilation failed".to_string(),
            });
        }
        self.record(format!("build {}", name))
    }

    async fn create_image(&self, name: &str) -> Result<ToolOutput> {
        self.record(format!("create-image {}", name))
    }

    async fn load_image(&self, name: &str) -> Result<ToolOutput> {
        self.record(format!("load {}", name))
    }
}

pub fn hub_config() -> HubConfig {
    HubConfig::default()
}

pub fn monitor_config() -> MonitorConfig {
    MonitorConfig::default()
}

pub fn firmware_config() -> FirmwareConfig {
    FirmwareConfig::default()
}
