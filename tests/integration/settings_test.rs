use std::fs;
use std::time::Duration;

use clap::{Arg, Command};
use sysmon::commands::config::apply_set_args;
use sysmon::core::config::Settings;
use sysmon::core::system_monitor::AlertPolicy;
use tempfile::TempDir;

fn set_command() -> Command {
    Command::new("set")
        .arg(
            Arg::new("interval")
                .long("interval")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(Arg::new("disk").long("disk"))
        .arg(
            Arg::new("history")
                .long("history")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("alert-threshold")
                .long("alert-threshold")
                .value_parser(clap::value_parser!(f32)),
        )
        .arg(Arg::new("alert-policy").long("alert-policy"))
}

#[test]
fn test_settings_roundtrip_through_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sysmon").join("settings.json");

    let settings = Settings {
        refresh_interval_secs: 0.5,
        selected_disk: Some("/mnt/backup".to_string()),
        alert_policy: AlertPolicy::OnCrossing,
        error_log: Some(temp_dir.path().join("errors.log")),
        ..Default::default()
    };
    settings.save_to(&path).unwrap();

    let loaded = Settings::load_from(&path).unwrap();
    assert_eq!(loaded, settings);

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"alert_policy\": \"on_crossing\""));
}

#[test]
fn test_invalid_settings_are_not_saved() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");

    let settings = Settings {
        refresh_interval_secs: -1.0,
        ..Default::default()
    };
    assert!(settings.save_to(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_settings_drive_collector() {
    let settings = Settings {
        refresh_interval_secs: 2.0,
        history_len: 10,
        warning_threshold: 60.0,
        critical_threshold: 85.0,
        adapter_timeout_ms: 750,
        ..Default::default()
    };

    let options = settings.collector_options();
    assert_eq!(options.history_len, 10);
    assert_eq!(options.thresholds.warning, 60.0);
    assert_eq!(options.thresholds.critical, 85.0);
    assert_eq!(options.adapter_timeout, Duration::from_millis(750));

    let config = settings.collector_config(|| "C:\\".to_string()).unwrap();
    assert_eq!(config.refresh_interval_secs, 2.0);
    assert_eq!(config.selected_disk, "C:\\");
}

#[test]
fn test_config_set_args() {
    let matches = set_command().get_matches_from([
        "set",
        "--interval",
        "5",
        "--disk",
        "/data",
        "--alert-policy",
        "on-crossing",
    ]);

    let mut settings = Settings::default();
    apply_set_args(&mut settings, &matches).unwrap();

    assert_eq!(settings.refresh_interval_secs, 5.0);
    assert_eq!(settings.selected_disk.as_deref(), Some("/data"));
    assert_eq!(settings.alert_policy, AlertPolicy::OnCrossing);
    assert_eq!(settings.history_len, Settings::default().history_len);
}

#[test]
fn test_config_set_rejects_unknown_policy() {
    let matches = set_command().get_matches_from(["set", "--alert-policy", "never"]);

    let mut settings = Settings::default();
    assert!(apply_set_args(&mut settings, &matches).is_err());
}
