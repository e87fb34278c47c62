use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::severity::SeverityBand;
use crate::error::MetricError;

/// A single value produced by a metric adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricReading {
    Percentage { value: f32, label: String },
    Frequency { mhz: u64 },
    ByteCount { used: u64, total: u64 },
    Rate { kb_per_sec: f64 },
    BatteryState { percent: f32, charging: bool },
    Duration { secs: u64 },
}

impl MetricReading {
    pub fn percentage<S: Into<String>>(value: f32, label: S) -> Self {
        MetricReading::Percentage {
            value,
            label: label.into(),
        }
    }

    /// Percentage value, if this reading is one
    pub fn as_percent(&self) -> Option<f32> {
        match self {
            MetricReading::Percentage { value, .. } => Some(*value),
            _ => None,
        }
    }
}

/// Content of one snapshot slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Sample {
    Reading(MetricReading),
    /// The query succeeded but there is nothing to report (e.g. no battery)
    Absent,
    Failure(MetricError),
}

impl Sample {
    pub fn reading(&self) -> Option<&MetricReading> {
        match self {
            Sample::Reading(reading) => Some(reading),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&MetricError> {
        match self {
            Sample::Failure(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Sample::Failure(_))
    }
}

/// Snapshot slots. An adapter may own several (CPU fills usage and frequency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CpuUsage,
    CpuFrequency,
    MemoryUsage,
    MemoryBytes,
    DiskUsage,
    DiskBytes,
    Battery,
    Upload,
    Download,
    Uptime,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::CpuUsage,
        Metric::CpuFrequency,
        Metric::MemoryUsage,
        Metric::MemoryBytes,
        Metric::DiskUsage,
        Metric::DiskBytes,
        Metric::Battery,
        Metric::Upload,
        Metric::Download,
        Metric::Uptime,
    ];

    /// Short human label, also used as the alert resource name
    pub fn label(&self) -> &'static str {
        match self {
            Metric::CpuUsage => "CPU",
            Metric::CpuFrequency => "CPU frequency",
            Metric::MemoryUsage => "RAM",
            Metric::MemoryBytes => "RAM used",
            Metric::DiskUsage => "Disk",
            Metric::DiskBytes => "Disk used",
            Metric::Battery => "Battery",
            Metric::Upload => "Upload",
            Metric::Download => "Download",
            Metric::Uptime => "Uptime",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub sample: Sample,
    /// Only set for percentage readings
    pub severity: Option<SeverityBand>,
}

impl MetricEntry {
    pub fn new(sample: Sample) -> Self {
        Self {
            sample,
            severity: None,
        }
    }
}

/// Immutable result of one sampling round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 0 for the placeholder published before the first round
    pub round: u64,
    pub timestamp: DateTime<Utc>,
    pub interval_secs: f64,
    pub selected_disk: String,
    pub metrics: BTreeMap<Metric, MetricEntry>,
    pub cpu_history: Vec<f32>,
    pub memory_history: Vec<f32>,
}

impl Snapshot {
    /// Placeholder visible to readers until the collector finishes a round.
    pub fn initial(history_len: usize, interval_secs: f64, selected_disk: String) -> Self {
        Self {
            round: 0,
            timestamp: Utc::now(),
            interval_secs,
            selected_disk,
            metrics: BTreeMap::new(),
            cpu_history: vec![0.0; history_len],
            memory_history: vec![0.0; history_len],
        }
    }

    pub fn entry(&self, metric: Metric) -> Option<&MetricEntry> {
        self.metrics.get(&metric)
    }

    pub fn sample(&self, metric: Metric) -> Option<&Sample> {
        self.entry(metric).map(|e| &e.sample)
    }

    pub fn reading(&self, metric: Metric) -> Option<&MetricReading> {
        self.sample(metric).and_then(Sample::reading)
    }

    pub fn failure(&self, metric: Metric) -> Option<&MetricError> {
        self.sample(metric).and_then(Sample::failure)
    }

    pub fn severity(&self, metric: Metric) -> Option<SeverityBand> {
        self.entry(metric).and_then(|e| e.severity)
    }

    /// Slots that failed this round
    pub fn failures(&self) -> impl Iterator<Item = (Metric, &MetricError)> {
        self.metrics
            .iter()
            .filter_map(|(metric, entry)| entry.sample.failure().map(|err| (*metric, err)))
    }
}
