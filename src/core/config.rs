use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::system_monitor::{
    validate_interval, AlertPolicy, CollectorConfig, CollectorOptions, SeverityThresholds,
    DEFAULT_ADAPTER_TIMEOUT, DEFAULT_ALERT_THRESHOLD, DEFAULT_HISTORY_SIZE,
    DEFAULT_REFRESH_INTERVAL,
};

/// Persisted user settings for the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub refresh_interval_secs: f64,
    /// Disk to watch; the first present disk when unset
    pub selected_disk: Option<String>,
    pub history_len: usize,
    pub warning_threshold: f32,
    pub critical_threshold: f32,
    pub alert_threshold: f32,
    pub alert_policy: AlertPolicy,
    pub adapter_timeout_ms: u64,
    /// Append error records here when set
    pub error_log: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let thresholds = SeverityThresholds::default();
        Self {
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL,
            selected_disk: None,
            history_len: DEFAULT_HISTORY_SIZE,
            warning_threshold: thresholds.warning,
            critical_threshold: thresholds.critical,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            alert_policy: AlertPolicy::default(),
            adapter_timeout_ms: DEFAULT_ADAPTER_TIMEOUT.as_millis() as u64,
            error_log: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Missing, empty or unreadable files yield the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }

        let data = fs::read(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;

        if data.is_empty() {
            return Ok(Settings::default());
        }

        Ok(serde_json::from_slice(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable settings file {:?}: {}", path, e);
            Settings::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data =
            serde_json::to_vec_pretty(self).with_context(|| "Failed to serialize settings")?;

        fs::write(path, data)
            .with_context(|| format!("Failed to write settings file: {:?}", path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("sysmon").join("settings.json"))
    }

    pub fn validate(&self) -> Result<()> {
        validate_interval(self.refresh_interval_secs)?;

        if self.history_len == 0 {
            bail!("history length must be at least 1");
        }
        if !(0.0..=100.0).contains(&self.warning_threshold)
            || !(0.0..=100.0).contains(&self.critical_threshold)
            || self.warning_threshold > self.critical_threshold
        {
            bail!(
                "thresholds must satisfy 0 <= warning ({}) <= critical ({}) <= 100",
                self.warning_threshold,
                self.critical_threshold
            );
        }
        if !(0.0..=100.0).contains(&self.alert_threshold) {
            bail!("alert threshold must be within 0..=100, got {}", self.alert_threshold);
        }
        if self.adapter_timeout_ms == 0 {
            bail!("adapter timeout must be positive");
        }

        Ok(())
    }

    pub fn collector_options(&self) -> CollectorOptions {
        CollectorOptions {
            history_len: self.history_len,
            thresholds: SeverityThresholds {
                warning: self.warning_threshold,
                critical: self.critical_threshold,
            },
            alert_threshold: self.alert_threshold,
            alert_policy: self.alert_policy,
            adapter_timeout: Duration::from_millis(self.adapter_timeout_ms),
        }
    }

    /// Collector config, with `fallback_disk` used when no disk is selected
    pub fn collector_config(&self, fallback_disk: impl FnOnce() -> String) -> Result<CollectorConfig> {
        let disk = match &self.selected_disk {
            Some(disk) => disk.clone(),
            None => fallback_disk(),
        };
        Ok(CollectorConfig::new(self.refresh_interval_secs, disk)?)
    }
}
