use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Preset refresh intervals offered to users, in seconds. Any positive value works.
pub const REFRESH_INTERVAL_CHOICES: [f64; 4] = [0.5, 1.0, 2.0, 5.0];

pub const DEFAULT_REFRESH_INTERVAL: f64 = 1.0;

/// Values the collector reads at the start of every round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub refresh_interval_secs: f64,
    pub selected_disk: String,
}

impl CollectorConfig {
    pub fn new<S: Into<String>>(refresh_interval_secs: f64, selected_disk: S) -> Result<Self> {
        Ok(Self {
            refresh_interval_secs: validate_interval(refresh_interval_secs)?,
            selected_disk: selected_disk.into(),
        })
    }
}

pub fn validate_interval(secs: f64) -> Result<f64> {
    if secs.is_finite() && secs > 0.0 {
        Ok(secs)
    } else {
        Err(MonitorError::config(format!(
            "refresh interval must be a positive number of seconds, got {}",
            secs
        )))
    }
}

/// Collector config shared with an external controller.
///
/// The lock is only held to copy or replace a field, never across a round.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<CollectorConfig>>,
}

impl SharedConfig {
    pub fn new(config: CollectorConfig) -> Result<Self> {
        validate_interval(config.refresh_interval_secs)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(config)),
        })
    }

    /// Copy of the current values
    pub fn current(&self) -> CollectorConfig {
        self.inner.read().clone()
    }

    pub fn refresh_interval(&self) -> f64 {
        self.inner.read().refresh_interval_secs
    }

    pub fn set_refresh_interval(&self, secs: f64) -> Result<()> {
        let secs = validate_interval(secs)?;
        self.inner.write().refresh_interval_secs = secs;
        Ok(())
    }

    pub fn set_selected_disk<S: Into<String>>(&self, disk: S) {
        self.inner.write().selected_disk = disk.into();
    }
}
