//! Severity bands for percentage readings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBand {
    Normal,
    Warning,
    Critical,
}

/// Band boundaries, both inclusive on the upper band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub warning: f32,
    pub critical: f32,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            warning: 50.0,
            critical: 80.0,
        }
    }
}

impl SeverityThresholds {
    pub fn classify(&self, percent: f32) -> SeverityBand {
        let percent = clamp_percent(percent);
        if percent >= self.critical {
            SeverityBand::Critical
        } else if percent >= self.warning {
            SeverityBand::Warning
        } else {
            SeverityBand::Normal
        }
    }
}

/// Classify with the default 50/80 thresholds
pub fn classify(percent: f32) -> SeverityBand {
    SeverityThresholds::default().classify(percent)
}

/// Clamp to [0, 100]; NaN counts as 0.
pub fn clamp_percent(percent: f32) -> f32 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}
