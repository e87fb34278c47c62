//! System monitoring core functionality.
//!
//! This module provides the sampling engine: metric adapters, rate
//! conversion, rolling histories, severity classification, the collector
//! loop and the snapshot store it publishes into.

pub mod alerts;
mod clock;
mod collector;
mod collector_config;
mod history;
mod metrics;
pub mod rate;
mod runtime;
pub mod severity;
pub mod sinks;
pub mod sources;
mod store;

pub use alerts::{AlertEvaluator, AlertEvent, AlertPolicy, DEFAULT_ALERT_THRESHOLD};
pub use clock::{elapsed_secs, Clock, ManualClock, SystemClock};
pub use collector::{Collector, CollectorOptions, CollectorState, DEFAULT_ADAPTER_TIMEOUT};
pub use collector_config::{
    validate_interval, CollectorConfig, SharedConfig, DEFAULT_REFRESH_INTERVAL,
    REFRESH_INTERVAL_CHOICES,
};
pub use history::{RollingHistory, DEFAULT_HISTORY_SIZE};
pub use metrics::{Metric, MetricEntry, MetricReading, Sample, Snapshot};
pub use rate::{rate, throughput, NetCounters};
pub use runtime::MonitorRuntime;
pub use severity::{classify, SeverityBand, SeverityThresholds};
pub use sinks::{
    AlertSink, ErrorRecord, ErrorScope, ErrorSink, Fanout, FailureKind, FileErrorLog, LogSink,
    RecordingSink, DEFAULT_ERROR_LOG,
};
pub use sources::{
    default_disk, resolve_disk, root_path, BatterySample, CpuSample, DiskInfo, HostSource,
    MetricSource, UsageSample,
};
pub use store::SnapshotStore;
