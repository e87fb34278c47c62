use anyhow::Result;
use clap::ArgMatches;
use colored::*;

use crate::core::config::Settings;
use crate::core::system_monitor::{HostSource, MetricSource, REFRESH_INTERVAL_CHOICES};

pub mod monitor;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("monitor", sub_matches)) => monitor::execute(sub_matches),
        Some(("disks", _)) => execute_disks(),
        _ => {
            println!("Use 'sysmon --help' for more information.");
            Ok(())
        }
    }
}

/// List disk identifiers accepted by `monitor --disk`
fn execute_disks() -> Result<()> {
    let source = HostSource::new();
    let disks = source.disk_identifiers();
    let selected = Settings::load()?.selected_disk;

    if disks.is_empty() {
        println!("{}", "No disks found".yellow());
        return Ok(());
    }

    println!("\n{}", "Available disks".bold().green());
    for disk in disks {
        if selected.as_deref() == Some(disk.as_str()) {
            println!("  {} {}", disk, "(selected)".cyan());
        } else {
            println!("  {}", disk);
        }
    }

    let choices: Vec<String> = REFRESH_INTERVAL_CHOICES
        .iter()
        .map(|c| c.to_string())
        .collect();
    println!("\nRefresh interval presets (seconds): {}", choices.join(", "));

    Ok(())
}
