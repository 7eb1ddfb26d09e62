//! Command line parsing

use clap::Parser;
use std::path::PathBuf;

use hubtest::cli::args::{Cli, Commands, ConfigAction};

#[test]
fn test_power_flags() {
    let cli = Cli::try_parse_from(["hubtest", "power", "-s", "2", "-u", "3", "-d", "a", "-g", "a"])
        .unwrap();
    match cli.command {
        Commands::Power {
            serial,
            up,
            down,
            port_set,
            get_state,
        } => {
            assert_eq!(serial.as_deref(), Some("2"));
            assert_eq!(up.as_deref(), Some("3"));
            assert_eq!(down.as_deref(), Some("a"));
            assert_eq!(port_set, None);
            assert_eq!(get_state.as_deref(), Some("a"));
        }
        other => panic!("Expected power command, got: {:?}", other),
    }
}

#[test]
fn test_watchdog_with_discovery() {
    let cli = Cli::try_parse_from(["hubtest", "watchdog", "-d", "-s", "2"]).unwrap();
    match cli.command {
        Commands::Watchdog { serial, discover } => {
            assert!(discover);
            assert_eq!(serial.as_deref(), Some("2"));
        }
        other => panic!("Expected watchdog command, got: {:?}", other),
    }

    let cli = Cli::try_parse_from(["hubtest", "watchdog"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Watchdog {
            serial: None,
            discover: false
        }
    ));
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "hubtest",
        "discover",
        "-vv",
        "--config",
        "bench.toml",
        "--log-file",
        "run.log",
    ])
    .unwrap();
    assert_eq!(cli.verbose, 2);
    assert!(!cli.quiet);
    assert_eq!(cli.config, Some(PathBuf::from("bench.toml")));
    assert_eq!(cli.log_file, Some(PathBuf::from("run.log")));
    assert!(matches!(cli.command, Commands::Discover { serial: None }));
}

#[test]
fn test_config_subcommands() {
    let cli = Cli::try_parse_from(["hubtest", "config", "init"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            action: ConfigAction::Init
        }
    ));
}

#[test]
fn test_subcommand_is_required() {
    assert!(Cli::try_parse_from(["hubtest"]).is_err());
    assert!(Cli::try_parse_from(["hubtest", "hubs", "--bogus"]).is_err());
}
