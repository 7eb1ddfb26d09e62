//! Watchdog test data models

use chrono::{DateTime, Local};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{HarnessError, Result};

/// Stage of a single board test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Matching,
    Flashing,
    Monitoring,
    Passed,
    Failed,
    TimedOut,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorState::Idle => write!(f, "Idle"),
            MonitorState::Matching => write!(f, "Matching"),
            MonitorState::Flashing => write!(f, "Flashing"),
            MonitorState::Monitoring => write!(f, "Monitoring"),
            MonitorState::Passed => write!(f, "Passed"),
            MonitorState::Failed => write!(f, "Failed"),
            MonitorState::TimedOut => write!(f, "TimedOut"),
        }
    }
}

/// Why a board test did not pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No attached serial device carries the expected board serial
    SerialMismatch,
    /// The serial channel could not be opened
    ChannelOpen(String),
    /// Reading the console failed
    Transport(String),
    /// The reader finished without seeing the marker
    ReaderEnded,
    /// The marker did not appear within the time limit
    Timeout,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::SerialMismatch => write!(f, "serial mismatch"),
            FailureReason::ChannelOpen(msg) => write!(f, "serial channel open failed: {}", msg),
            FailureReason::Transport(msg) => write!(f, "transport error: {}", msg),
            FailureReason::ReaderEnded => write!(f, "reader ended"),
            FailureReason::Timeout => write!(f, "timeout"),
        }
    }
}

/// Terminal result of one board test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    Passed,
    Failed(FailureReason),
}

impl MonitorOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, MonitorOutcome::Passed)
    }

    pub fn terminal_state(&self) -> MonitorState {
        match self {
            MonitorOutcome::Passed => MonitorState::Passed,
            MonitorOutcome::Failed(FailureReason::Timeout) => MonitorState::TimedOut,
            MonitorOutcome::Failed(_) => MonitorState::Failed,
        }
    }

    /// Error equivalent of a failed outcome, for diagnostics
    pub fn to_error(&self, board_serial: &str, timeout_secs: u64) -> Option<HarnessError> {
        match self {
            MonitorOutcome::Passed => None,
            MonitorOutcome::Failed(reason) => Some(match reason {
                FailureReason::SerialMismatch => HarnessError::SerialMismatch {
                    expected: board_serial.to_string(),
                },
                FailureReason::Timeout => HarnessError::MonitorTimeout {
                    seconds: timeout_secs,
                },
                FailureReason::ChannelOpen(msg) | FailureReason::Transport(msg) => {
                    HarnessError::MonitorTransportError(msg.clone())
                }
                FailureReason::ReaderEnded => {
                    HarnessError::MonitorTransportError("console closed".to_string())
                }
            }),
        }
    }
}

/// Result record for one tested port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchdogTestResult {
    #[serde(rename = "Port")]
    pub port: u8,
    #[serde(rename = "Board name")]
    pub board_name: String,
    #[serde(rename = "Board serial")]
    pub board_serial: String,
    #[serde(rename = "Test passed")]
    pub test_passed: bool,
    #[serde(rename = "Test time [s]")]
    pub test_time: f64,
}

/// Aggregated results of one watchdog run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchdogReport {
    #[serde(rename = "Hub serial")]
    pub hub_serial: String,
    #[serde(rename = "Watchdog tests")]
    pub tests: Vec<WatchdogTestResult>,
}

impl WatchdogReport {
    /// File name stamped with the run time, minute resolution
    pub fn file_name(timestamp: &DateTime<Local>) -> String {
        format!("watchdog_test_{}.json", timestamp.format("%Y-%m-%d_%H-%M"))
    }

    /// Write the report into `dir` and return the artifact path
    pub fn write(&self, dir: &Path, timestamp: &DateTime<Local>) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name(timestamp));
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("Watchdog results written to {}", path.display());
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn passed_count(&self) -> usize {
        self.tests.iter().filter(|test| test.test_passed).count()
    }
}
