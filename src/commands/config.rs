use anyhow::{Context, Result};
use colored::Colorize;

use crate::core::config::Settings;
use crate::core::system_monitor::AlertPolicy;

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("set", sub_matches)) => set(sub_matches),
        Some(("reset", _)) => reset(),
        _ => {
            println!("Use 'sysmon config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let settings = Settings::load()?;
    let path = Settings::get_config_path()?;

    println!("{} {}", "Settings file:".bold(), path.display());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn set(matches: &clap::ArgMatches) -> Result<()> {
    let mut settings = Settings::load()?;
    apply_set_args(&mut settings, matches)?;
    settings.validate().context("Refusing to save invalid settings")?;
    settings.save()?;

    println!("{}", "✓ Settings saved".green());
    Ok(())
}

fn reset() -> Result<()> {
    Settings::default().save()?;
    println!("{}", "✓ Settings reset to defaults".green());
    Ok(())
}

/// Copy the `config set` flags that were given into `settings`
pub fn apply_set_args(settings: &mut Settings, matches: &clap::ArgMatches) -> Result<()> {
    if let Some(interval) = matches.get_one::<f64>("interval") {
        settings.refresh_interval_secs = *interval;
    }
    if let Some(disk) = matches.get_one::<String>("disk") {
        settings.selected_disk = Some(disk.clone());
    }
    if let Some(history) = matches.get_one::<usize>("history") {
        settings.history_len = *history;
    }
    if let Some(threshold) = matches.get_one::<f32>("alert-threshold") {
        settings.alert_threshold = *threshold;
    }
    if let Some(policy) = matches.get_one::<String>("alert-policy") {
        settings.alert_policy = parse_alert_policy(policy)?;
    }
    Ok(())
}

pub fn parse_alert_policy(value: &str) -> Result<AlertPolicy> {
    match value {
        "every-round" => Ok(AlertPolicy::EveryRound),
        "on-crossing" => Ok(AlertPolicy::OnCrossing),
        other => anyhow::bail!(
            "Unknown alert policy {:?} (expected 'every-round' or 'on-crossing')",
            other
        ),
    }
}
