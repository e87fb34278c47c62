//! System monitor command handler.
//!
//! Runs the collector in the background and prints each new snapshot.
//! While it runs, stdin lines `interval <secs>` and `disk <id>` change the
//! shared collector config.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;

use crate::core::config::Settings;
use crate::core::system_monitor::{
    default_disk, AlertSink, Collector, ErrorSink, Fanout, FileErrorLog, HostSource, LogSink,
    MonitorRuntime, SharedConfig, Snapshot, SnapshotStore,
};
use crate::ui::formatters::{format_snapshot_line, sparkline};

/// How often the printer checks the store for a new round
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Execute the monitor command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let mut settings = Settings::load().context("Failed to load settings")?;

    if let Some(interval) = matches.get_one::<f64>("interval") {
        settings.refresh_interval_secs = *interval;
    }
    if let Some(disk) = matches.get_one::<String>("disk") {
        settings.selected_disk = Some(disk.clone());
    }
    if let Some(path) = matches.get_one::<PathBuf>("error-log") {
        settings.error_log = Some(path.clone());
    }
    settings.validate().context("Invalid monitor settings")?;

    let json_output = matches.get_flag("json");
    let show_history = matches.get_flag("history");
    let max_rounds = matches.get_one::<u64>("rounds").copied();

    let runtime = start_runtime(&settings)?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_handler = stop.clone();
    ctrlc::set_handler(move || stop_for_handler.store(true, Ordering::Relaxed))
        .context("Failed to install Ctrl-C handler")?;

    if !matches.get_flag("no-input") {
        spawn_controller(runtime.config());
    }

    let result = print_snapshots(&runtime.store(), &stop, max_rounds, |snapshot| {
        if json_output {
            println!("{}", serde_json::to_string(snapshot)?);
        } else {
            println!("{}", format_snapshot_line(snapshot));
            if show_history {
                println!("  CPU {}", sparkline(&snapshot.cpu_history));
                println!("  RAM {}", sparkline(&snapshot.memory_history));
            }
        }
        Ok(())
    });

    let state = runtime.shutdown().context("Failed to stop collector")?;
    log::info!("Collector state at exit: {:?}", state);

    result
}

fn start_runtime(settings: &Settings) -> Result<MonitorRuntime> {
    let source = HostSource::new();
    let config = settings.collector_config(|| default_disk(&source))?;
    let shared = SharedConfig::new(config.clone())?;

    let store = Arc::new(SnapshotStore::new(Snapshot::initial(
        settings.history_len,
        config.refresh_interval_secs,
        config.selected_disk.clone(),
    )));

    let error_sink: Arc<dyn ErrorSink> = match &settings.error_log {
        Some(path) => {
            let file_log = FileErrorLog::new(path);
            log::info!("Appending metric errors to {}", file_log.path().display());
            let sinks = vec![
                Arc::new(LogSink) as Arc<dyn ErrorSink>,
                Arc::new(file_log) as Arc<dyn ErrorSink>,
            ];
            Arc::new(Fanout::new(sinks))
        }
        None => Arc::new(LogSink),
    };
    let alert_sink: Arc<dyn AlertSink> = Arc::new(LogSink);

    let collector = Collector::new(source, shared, store)
        .with_options(settings.collector_options())
        .with_alert_sink(alert_sink)
        .with_error_sink(error_sink);

    MonitorRuntime::start(collector).context("Failed to start collector runtime")
}

/// Pull snapshots at our own cadence and hand every new round to `emit`.
fn print_snapshots<F>(
    store: &SnapshotStore,
    stop: &AtomicBool,
    max_rounds: Option<u64>,
    mut emit: F,
) -> Result<()>
where
    F: FnMut(&Snapshot) -> Result<()>,
{
    let mut last_round = 0;
    let mut printed = 0;

    while !stop.load(Ordering::Relaxed) {
        let snapshot = store.read();
        if snapshot.round != last_round {
            last_round = snapshot.round;
            emit(&snapshot)?;
            printed += 1;

            if max_rounds.is_some_and(|max| printed >= max) {
                break;
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    Ok(())
}

/// A config change typed on stdin while monitoring
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Interval(f64),
    Disk(String),
}

pub fn parse_control_line(line: &str) -> Result<Option<ControlCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (command, arg) = line
        .split_once(char::is_whitespace)
        .map(|(c, a)| (c, a.trim()))
        .unwrap_or((line, ""));

    match command {
        "interval" | "i" => {
            let secs: f64 = arg
                .parse()
                .with_context(|| format!("Invalid interval: {:?}", arg))?;
            Ok(Some(ControlCommand::Interval(secs)))
        }
        "disk" | "d" if !arg.is_empty() => Ok(Some(ControlCommand::Disk(arg.to_string()))),
        "disk" | "d" => Err(anyhow!("Usage: disk <mount point or device>")),
        other => Err(anyhow!(
            "Unknown command {:?} (expected 'interval <secs>' or 'disk <id>')",
            other
        )),
    }
}

pub fn apply_control(config: &SharedConfig, command: ControlCommand) -> Result<()> {
    match command {
        ControlCommand::Interval(secs) => {
            config.set_refresh_interval(secs)?;
            log::info!("Refresh interval set to {}s", secs);
        }
        ControlCommand::Disk(disk) => {
            log::info!("Selected disk set to {}", disk);
            config.set_selected_disk(disk);
        }
    }
    Ok(())
}

fn spawn_controller(config: SharedConfig) {
    std::thread::Builder::new()
        .name("monitor-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_control_line(&line) {
                    Ok(Some(command)) => {
                        if let Err(e) = apply_control(&config, command) {
                            eprintln!("{:#}", e);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{:#}", e),
                }
            }
        })
        .map(|_| ())
        .unwrap_or_else(|e| log::warn!("Could not read commands from stdin: {}", e));
}
