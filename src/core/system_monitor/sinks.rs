//! Consumers of alert events and error records.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::alerts::AlertEvent;
use super::metrics::Metric;
use crate::error::MetricError;

pub const DEFAULT_ERROR_LOG: &str = "system_monitor_errors.log";

/// Which adapter (or collector phase) produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    Init,
    Cpu,
    Memory,
    Disk,
    Battery,
    Network,
    Uptime,
}

impl ErrorScope {
    /// Scopes that belong to a metric adapter
    pub const ADAPTERS: [ErrorScope; 6] = [
        ErrorScope::Cpu,
        ErrorScope::Memory,
        ErrorScope::Disk,
        ErrorScope::Battery,
        ErrorScope::Network,
        ErrorScope::Uptime,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ErrorScope::Init => "Init",
            ErrorScope::Cpu => "CPU",
            ErrorScope::Memory => "RAM",
            ErrorScope::Disk => "Disk",
            ErrorScope::Battery => "Battery",
            ErrorScope::Network => "Network",
            ErrorScope::Uptime => "Uptime",
        }
    }

    /// Snapshot slots filled by this adapter
    pub fn metrics(&self) -> &'static [Metric] {
        match self {
            ErrorScope::Init => &[],
            ErrorScope::Cpu => &[Metric::CpuUsage, Metric::CpuFrequency],
            ErrorScope::Memory => &[Metric::MemoryUsage, Metric::MemoryBytes],
            ErrorScope::Disk => &[Metric::DiskUsage, Metric::DiskBytes],
            ErrorScope::Battery => &[Metric::Battery],
            ErrorScope::Network => &[Metric::Upload, Metric::Download],
            ErrorScope::Uptime => &[Metric::Uptime],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A metric query failed or timed out
    Adapter,
    /// The configured disk no longer resolves
    Config,
    /// Baseline readings were unavailable at startup
    Init,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub scope: ErrorScope,
    pub kind: FailureKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn init(scope: ErrorScope, err: &MetricError, timestamp: DateTime<Utc>) -> Self {
        Self {
            scope,
            kind: FailureKind::Init,
            message: err.to_string(),
            timestamp,
        }
    }

    /// Record for a failure inside a round
    pub fn round(scope: ErrorScope, err: &MetricError, timestamp: DateTime<Utc>) -> Self {
        let kind = match (scope, err) {
            (ErrorScope::Disk, MetricError::NotFound(_)) => FailureKind::Config,
            _ => FailureKind::Adapter,
        };
        Self {
            scope,
            kind,
            message: err.to_string(),
            timestamp,
        }
    }

    /// One line for the diagnostic log, e.g. `2024-01-01 10:00:00: Disk error: /mnt not found`
    pub fn log_line(&self) -> String {
        let local: DateTime<Local> = self.timestamp.into();
        format!(
            "{}: {} error: {}",
            local.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.scope.label(),
            self.message
        )
    }
}

pub trait AlertSink: Send + Sync {
    fn alert(&self, event: &AlertEvent);
}

pub trait ErrorSink: Send + Sync {
    fn record(&self, record: &ErrorRecord);
}

/// Forwards everything to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn alert(&self, event: &AlertEvent) {
        log::warn!("High usage alert: {}", event.message());
    }
}

impl ErrorSink for LogSink {
    fn record(&self, record: &ErrorRecord) {
        log::warn!("{} error: {}", record.scope.label(), record.message);
    }
}

/// Appends error records to a plain-text diagnostic log.
#[derive(Debug)]
pub struct FileErrorLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileErrorLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl ErrorSink for FileErrorLog {
    fn record(&self, record: &ErrorRecord) {
        // write failures are logged, never propagated
        if let Err(e) = self.append(&record.log_line()) {
            log::error!("Failed to write error log {:?}: {}", self.path, e);
        }
    }
}

/// Sends every event to several sinks.
pub struct Fanout<T: ?Sized> {
    sinks: Vec<std::sync::Arc<T>>,
}

impl<T: ?Sized> Fanout<T> {
    pub fn new(sinks: Vec<std::sync::Arc<T>>) -> Self {
        Self { sinks }
    }
}

impl AlertSink for Fanout<dyn AlertSink> {
    fn alert(&self, event: &AlertEvent) {
        for sink in &self.sinks {
            sink.alert(event);
        }
    }
}

impl ErrorSink for Fanout<dyn ErrorSink> {
    fn record(&self, record: &ErrorRecord) {
        for sink in &self.sinks {
            sink.record(record);
        }
    }
}

/// Keeps every event in memory; handy for tests and for embedding consumers
/// that poll.
#[derive(Debug, Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<AlertEvent>>,
    errors: Mutex<Vec<ErrorRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<AlertEvent> {
        self.alerts.lock().clone()
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.errors.lock().clone()
    }

    pub fn clear(&self) {
        self.alerts.lock().clear();
        self.errors.lock().clear();
    }
}

impl AlertSink for RecordingSink {
    fn alert(&self, event: &AlertEvent) {
        self.alerts.lock().push(event.clone());
    }
}

impl ErrorSink for RecordingSink {
    fn record(&self, record: &ErrorRecord) {
        self.errors.lock().push(record.clone());
    }
}
