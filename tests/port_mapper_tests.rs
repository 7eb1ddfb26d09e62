//! Port discovery against the simulated bench

mod mock_hardware;

use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

use hubtest::hub::HubController;
use hubtest::services::{
    DeviceIdentifier, DeviceName, NameTable, PortMapper, UNKNOWN_DEVICE, UnknownDeviceLog,
};
use mock_hardware::{MockBench, MockBoard, hub_config};

const SETTLE: Duration = Duration::from_secs(3);

fn identifier(dir: &TempDir, known: &[(&str, &str)]) -> DeviceIdentifier {
    let entries: HashMap<String, DeviceName> = known
        .iter()
        .map(|(serial, name)| {
            (
                serial.to_string(),
                DeviceName {
                    name: name.to_string(),
                },
            )
        })
        .collect();
    DeviceIdentifier::new(
        NameTable::new(entries),
        UnknownDeviceLog::new(dir.path().join("unknown_devices")),
    )
}

#[tokio::test(start_paused = true)]
async fn test_single_board_on_port_three() {
    let temp_dir = TempDir::new().unwrap();
    let bench = MockBench::with_hub("2");
    bench.add_board(MockBoard::new(3, "SN123"));
    let hub = HubController::connect(bench.backend(), &hub_config(), None).unwrap();
    hub.set_power(hubtest::hub::PortSelector::Port(3), true).unwrap();

    let enumerator = bench.enumerator();
    let mapper = PortMapper::new(&hub, &enumerator, 7, SETTLE);
    let port_map = mapper
        .map_ports(&identifier(&temp_dir, &[("SN123", "nordic_pca10056")]))
        .await
        .unwrap();

    assert_eq!(port_map.hub_serial, "2");
    assert_eq!(port_map.ports.len(), 1);
    let entry = &port_map.ports[0];
    assert_eq!(entry.port, 3);
    assert_eq!(entry.serial_number, "SN123");
    assert_eq!(entry.name, "nordic_pca10056");
    assert!(bench.powered_ports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_board_is_logged() {
    let temp_dir = TempDir::new().unwrap();
    let bench = MockBench::with_hub("2");
    bench.add_board(MockBoard::new(3, "SN123"));
    let hub = HubController::connect(bench.backend(), &hub_config(), None).unwrap();

    let enumerator = bench.enumerator();
    let mapper = PortMapper::new(&hub, &enumerator, 7, SETTLE);
    let port_map = mapper.map_ports(&identifier(&temp_dir, &[])).await.unwrap();

    assert_eq!(port_map.ports[0].name, UNKNOWN_DEVICE);
    let log = std::fs::read_to_string(temp_dir.path().join("unknown_devices")).unwrap();
    assert_eq!(log, "Unknown device with serial number: SN123\n");
}

#[tokio::test(start_paused = true)]
async fn test_host_devices_are_not_attributed_to_ports() {
    let temp_dir = TempDir::new().unwrap();
    let bench = MockBench::with_hub("2");
    bench.add_fixed_device("/dev/ttyUSB0", Some("HOSTDEV"));
    bench.add_fixed_device("/dev/ttyS0", None);
    bench.add_board(MockBoard::new(1, "A1"));
    bench.add_board(MockBoard::new(7, "A7"));
    let hub = HubController::connect(bench.backend(), &hub_config(), None).unwrap();

    let enumerator = bench.enumerator();
    let mapper = PortMapper::new(&hub, &enumerator, 7, SETTLE);
    let port_map = mapper.map_ports(&identifier(&temp_dir, &[])).await.unwrap();

    let found: Vec<(u8, &str)> = port_map
        .ports
        .iter()
        .map(|entry| (entry.port, entry.serial_number.as_str()))
        .collect();
    assert_eq!(found, vec![(1, "A1"), (7, "A7")]);
}

#[tokio::test(start_paused = true)]
async fn test_port_with_two_devices_keeps_both() {
    let temp_dir = TempDir::new().unwrap();
    let bench = MockBench::with_hub("2");
    bench.add_board(MockBoard::new(2, "B2"));
    let mut second = MockBoard::new(2, "A2");
    second.port_name = "/dev/ttyACM9".to_string();
    bench.add_board(second);
    let hub = HubController::connect(bench.backend(), &hub_config(), None).unwrap();

    let enumerator = bench.enumerator();
    let mapper = PortMapper::new(&hub, &enumerator, 7, SETTLE);
    let port_map = mapper.map_ports(&identifier(&temp_dir, &[])).await.unwrap();

    let serials: Vec<&str> = port_map
        .ports
        .iter()
        .map(|entry| entry.serial_number.as_str())
        .collect();
    assert_eq!(serials, vec!["A2", "B2"]);
    assert_eq!(port_map.ambiguous_ports(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn test_probe_waits_settle_delay_and_powers_off() {
    let bench = MockBench::with_hub("2");
    bench.add_board(MockBoard::new(5, "C5"));
    let hub = HubController::connect(bench.backend(), &hub_config(), None).unwrap();

    let enumerator = bench.enumerator();
    let mapper = PortMapper::new(&hub, &enumerator, 7, SETTLE);
    let started = tokio::time::Instant::now();
    let new_devices = mapper.probe_port(5).await.unwrap();

    assert!(started.elapsed() >= SETTLE);
    assert_eq!(new_devices.keys().collect::<Vec<_>>(), vec!["C5"]);
    assert_eq!(new_devices["C5"].name, "/dev/ttyACM5");
    assert!(!bench.is_powered(5));

    assert!(mapper.probe_port(9).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_port_is_powered_off_when_after_snapshot_fails() {
    let bench = MockBench::with_hub("2");
    bench.add_board(MockBoard::new(4, "C4"));
    let hub = HubController::connect(bench.backend(), &hub_config(), None).unwrap();

    let enumerator = bench.enumerator();
    let mapper = PortMapper::new(&hub, &enumerator, 7, SETTLE);
    // The before-snapshot succeeds, the one taken after power-on fails
    bench.fail_enumeration_on(2);

    assert!(mapper.probe_port(4).await.is_err());
    assert!(bench.powered_ports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rediscovery_follows_rewiring() {
    let temp_dir = TempDir::new().unwrap();
    let bench = MockBench::with_hub("2");
    bench.add_board(MockBoard::new(4, "MOVED"));
    let hub = HubController::connect(bench.backend(), &hub_config(), None).unwrap();
    let enumerator = bench.enumerator();
    let mapper = PortMapper::new(&hub, &enumerator, 7, SETTLE);
    let first = mapper.map_ports(&identifier(&temp_dir, &[])).await.unwrap();
    assert_eq!(first.ports[0].port, 4);

    let rewired = MockBench::with_hub("2");
    rewired.add_board(MockBoard::new(6, "MOVED"));
    let hub = HubController::connect(rewired.backend(), &hub_config(), None).unwrap();
    let enumerator = rewired.enumerator();
    let mapper = PortMapper::new(&hub, &enumerator, 7, SETTLE);
    let second = mapper.map_ports(&identifier(&temp_dir, &[])).await.unwrap();
    assert_eq!(second.ports[0].port, 6);
}
