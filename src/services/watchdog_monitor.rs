//! Watchdog monitor: flash one board and wait for a watchdog-triggered reset
//!
//! One invocation walks `Idle → Matching → Flashing → Monitoring` and ends in
//! exactly one of `Passed`, `Failed` or `TimedOut`. The console is read by a
//! spawned task that shares only the `found`/`stop` signals with the
//! controlling loop.

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{FirmwareConfig, MonitorConfig};
use crate::errors::Result;
use crate::models::watchdog::{FailureReason, MonitorOutcome, MonitorState};
use crate::services::console::{LineSource, SerialConnector, decode_permissive};
use crate::services::firmware::{self, FirmwareApp, FirmwareBuilder};
use crate::services::snapshot::DeviceEnumerator;

/// Poll intervals granted to the reader to acknowledge `stop`
const READER_GRACE_POLLS: u32 = 5;

/// Signals shared by the controller and the console reader of one board test
#[derive(Debug, Clone, Default)]
pub struct MonitorSignals {
    found: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl MonitorSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn found(&self) -> bool {
        self.found.load(Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn mark_found(&self) {
        self.found.store(true, Ordering::SeqCst);
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn reset(&self) {
        self.found.store(false, Ordering::SeqCst);
        self.stop.store(false, Ordering::SeqCst);
    }
}

/// How the console reader finished
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReaderExit {
    Found,
    Stopped,
    Ended,
    Transport(String),
}

/// First condition observed by the controlling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observed {
    Found,
    Stopped,
    ReaderEnded,
    TimedOut,
}

pub struct WatchdogMonitor<'a> {
    enumerator: &'a dyn DeviceEnumerator,
    connector: &'a dyn SerialConnector,
    builder: &'a dyn FirmwareBuilder,
    firmware: &'a FirmwareConfig,
    config: &'a MonitorConfig,
}

impl<'a> WatchdogMonitor<'a> {
    pub fn new(
        enumerator: &'a dyn DeviceEnumerator,
        connector: &'a dyn SerialConnector,
        builder: &'a dyn FirmwareBuilder,
        firmware: &'a FirmwareConfig,
        config: &'a MonitorConfig,
    ) -> Self {
        Self {
            enumerator,
            connector,
            builder,
            firmware,
            config,
        }
    }

    /// Test one board with freshly created signals
    pub async fn run(&self, board_name: &str, board_serial: &str) -> MonitorOutcome {
        self.run_with_signals(board_name, board_serial, &MonitorSignals::new())
            .await
    }

    /// Test one board; `signals` are reset on entry and left stopped on return
    pub async fn run_with_signals(
        &self,
        board_name: &str,
        board_serial: &str,
        signals: &MonitorSignals,
    ) -> MonitorOutcome {
        signals.reset();
        let mut tracker = StateTracker::new(board_serial, self.config.timeout_secs);

        tracker.enter(MonitorState::Matching);
        let port_name = match self.find_board(board_serial) {
            Ok(Some(port_name)) => port_name,
            Ok(None) => {
                warn!(
                    "Board {} ({}) not found among attached serial devices, different serial numbers",
                    board_name, board_serial
                );
                return tracker.finish(MonitorOutcome::Failed(FailureReason::SerialMismatch));
            }
            Err(e) => {
                error!("Could not enumerate serial devices: {}", e);
                return tracker.finish(MonitorOutcome::Failed(FailureReason::Transport(
                    e.to_string(),
                )));
            }
        };
        info!("Board {} ({}) found on {}", board_name, board_serial, port_name);

        tracker.enter(MonitorState::Flashing);
        self.flash(board_name).await;

        tracker.enter(MonitorState::Monitoring);
        let outcome = self.monitor_console(&port_name, signals).await;
        tracker.finish(outcome)
    }

    fn find_board(&self, board_serial: &str) -> Result<Option<String>> {
        let devices = self.enumerator.serial_devices()?;
        Ok(devices
            .into_iter()
            .find(|device| device.serial_number.as_deref() == Some(board_serial))
            .map(|device| device.port_name))
    }

    async fn flash(&self, board_name: &str) {
        for app in [FirmwareApp::Boot, FirmwareApp::Watchdog] {
            let loaded =
                firmware::build_and_load(self.builder, self.firmware, board_name, &app).await;
            if let Err(e) = loaded {
                warn!("{}", e);
            }
        }
    }

    async fn monitor_console(&self, port_name: &str, signals: &MonitorSignals) -> MonitorOutcome {
        let source = match self.connector.open(port_name, self.config.baud_rate).await {
            Ok(source) => source,
            Err(e) => {
                error!("{}", e);
                signals.request_stop();
                return MonitorOutcome::Failed(FailureReason::ChannelOpen(e.to_string()));
            }
        };

        let poll_interval = self.config.poll_interval();
        let mut reader = tokio::spawn(read_console(
            source,
            signals.clone(),
            self.config.marker.clone(),
            poll_interval,
        ));

        let observed = watch(signals, &reader, self.config.timeout(), poll_interval).await;

        signals.request_stop();
        let exit = reap(&mut reader, poll_interval * READER_GRACE_POLLS).await;

        match observed {
            Observed::Found => MonitorOutcome::Passed,
            Observed::Stopped => {
                let message = match exit {
                    Some(ReaderExit::Transport(message)) => message,
                    _ => "console reader stopped".to_string(),
                };
                MonitorOutcome::Failed(FailureReason::Transport(message))
            }
            Observed::ReaderEnded => MonitorOutcome::Failed(FailureReason::ReaderEnded),
            Observed::TimedOut => {
                warn!(
                    "Marker '{}' not seen within {} seconds",
                    self.config.marker, self.config.timeout_secs
                );
                MonitorOutcome::Failed(FailureReason::Timeout)
            }
        }
    }
}

/// Poll until one termination condition holds; found wins over stop, stop
/// over a finished reader, and a finished reader over the timeout.
async fn watch(
    signals: &MonitorSignals,
    reader: &JoinHandle<ReaderExit>,
    timeout: Duration,
    poll_interval: Duration,
) -> Observed {
    let deadline = Instant::now() + timeout;
    loop {
        // Sample liveness first: the reader sets its flag before it returns
        let finished = reader.is_finished();
        if signals.found() {
            return Observed::Found;
        }
        if signals.stop_requested() {
            return Observed::Stopped;
        }
        if finished {
            return Observed::ReaderEnded;
        }
        if Instant::now() >= deadline {
            return Observed::TimedOut;
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Wait for the reader to acknowledge `stop`; abort it once the grace period is over
async fn reap(reader: &mut JoinHandle<ReaderExit>, grace: Duration) -> Option<ReaderExit> {
    match tokio::time::timeout(grace, &mut *reader).await {
        Ok(Ok(exit)) => {
            debug!("Console reader finished: {:?}", exit);
            Some(exit)
        }
        Ok(Err(e)) => {
            error!("Console reader task failed: {}", e);
            None
        }
        Err(_) => {
            warn!("Console reader did not stop within {:?}, aborting it", grace);
            reader.abort();
            None
        }
    }
}

/// Read console lines until the marker shows up, the source ends or `stop` is set.
///
/// Each read is bounded by `poll_interval` so a silent console cannot keep the
/// reader from seeing `stop`.
async fn read_console(
    mut source: Box<dyn LineSource>,
    signals: MonitorSignals,
    marker: String,
    poll_interval: Duration,
) -> ReaderExit {
    loop {
        if signals.stop_requested() {
            return ReaderExit::Stopped;
        }
        match tokio::time::timeout(poll_interval, source.read_line()).await {
            Err(_) => continue,
            Ok(Ok(Some(bytes))) => {
                let line = decode_permissive(&bytes);
                info!(target: "serial", "{}", line);
                if line.contains(&marker) {
                    signals.mark_found();
                    return ReaderExit::Found;
                }
            }
            Ok(Ok(None)) => return ReaderExit::Ended,
            Ok(Err(e)) => {
                error!("Serial console read failed: {}", e);
                signals.request_stop();
                return ReaderExit::Transport(e.to_string());
            }
        }
    }
}

/// Logs the state transitions of one board test
struct StateTracker<'s> {
    board_serial: &'s str,
    timeout_secs: u64,
    state: MonitorState,
}

impl<'s> StateTracker<'s> {
    fn new(board_serial: &'s str, timeout_secs: u64) -> Self {
        Self {
            board_serial,
            timeout_secs,
            state: MonitorState::Idle,
        }
    }

    fn enter(&mut self, next: MonitorState) {
        debug!("Board {}: {} -> {}", self.board_serial, self.state, next);
        self.state = next;
    }

    fn finish(mut self, outcome: MonitorOutcome) -> MonitorOutcome {
        self.enter(outcome.terminal_state());
        match outcome.to_error(self.board_serial, self.timeout_secs) {
            None => info!("Board {}: watchdog test passed", self.board_serial),
            Some(e) => warn!("Board {}: watchdog test failed. {}", self.board_serial, e),
        }
        outcome
    }
}
