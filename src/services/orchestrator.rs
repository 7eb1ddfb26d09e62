//! Watchdog run across every mapped port

use chrono::Local;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::Result;
use crate::hub::{HubController, PortSelector};
use crate::models::port_map::PortMap;
use crate::models::watchdog::{WatchdogReport, WatchdogTestResult};
use crate::services::watchdog_monitor::{MonitorSignals, WatchdogMonitor};

/// Powers one port at a time and runs the watchdog monitor on its board
pub struct WatchdogOrchestrator<'a> {
    hub: &'a HubController,
    monitor: &'a WatchdogMonitor<'a>,
    settle_delay: Duration,
}

impl<'a> WatchdogOrchestrator<'a> {
    pub fn new(
        hub: &'a HubController,
        monitor: &'a WatchdogMonitor<'a>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            hub,
            monitor,
            settle_delay,
        }
    }

    /// Test every entry of `port_map` in port order.
    ///
    /// A failed board test is recorded and the run continues. Hub errors,
    /// including a failed power-off, abort the run.
    pub async fn run(&self, port_map: &PortMap) -> Result<WatchdogReport> {
        if !port_map.hub_serial.is_empty() && port_map.hub_serial != self.hub.serial() {
            warn!(
                "Port map was recorded on hub {}, testing on hub {}",
                port_map.hub_serial,
                self.hub.serial()
            );
        }

        self.hub.set_power(PortSelector::All, false)?;
        tokio::time::sleep(self.settle_delay).await;

        let mut tests = Vec::with_capacity(port_map.ports.len());
        for entry in port_map.entries_by_port() {
            let selector = PortSelector::port(entry.port)?;
            info!(
                "Testing {} ({}) on port {}",
                entry.name, entry.serial_number, entry.port
            );

            self.hub.set_power(selector, true)?;
            tokio::time::sleep(self.settle_delay).await;

            let started = Instant::now();
            let outcome = self
                .monitor
                .run_with_signals(&entry.name, &entry.serial_number, &MonitorSignals::new())
                .await;
            let elapsed = started.elapsed();

            tests.push(WatchdogTestResult {
                port: entry.port,
                board_name: entry.name.clone(),
                board_serial: entry.serial_number.clone(),
                test_passed: outcome.passed(),
                test_time: elapsed.as_secs_f64(),
            });

            self.hub.set_power(selector, false)?;
            tokio::time::sleep(self.settle_delay).await;
        }

        let report = WatchdogReport {
            hub_serial: self.hub.serial().to_string(),
            tests,
        };
        info!(
            "Watchdog run finished: {}/{} boards passed",
            report.passed_count(),
            report.tests.len()
        );
        Ok(report)
    }

    /// Run the tests and write the timestamped result file into `dir`
    pub async fn run_to_artifact(&self, port_map: &PortMap, dir: &Path) -> Result<PathBuf> {
        let started_at = Local::now();
        let report = self.run(port_map).await?;
        report.write(dir, &started_at)
    }
}
