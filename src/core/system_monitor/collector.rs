//! The sampling loop.
//!
//! One round queries every adapter, derives rates, severities and history
//! entries, publishes a snapshot and forwards alerts. Rounds repeat with a
//! fixed delay until shutdown is signalled.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::alerts::{AlertEvaluator, AlertPolicy, DEFAULT_ALERT_THRESHOLD};
use super::clock::{elapsed_secs, Clock, SystemClock};
use super::collector_config::{SharedConfig, DEFAULT_REFRESH_INTERVAL};
use super::history::{RollingHistory, DEFAULT_HISTORY_SIZE};
use super::metrics::{Metric, MetricEntry, MetricReading, Sample, Snapshot};
use super::rate::{throughput, NetCounters};
use super::severity::{clamp_percent, SeverityThresholds};
use super::sinks::{AlertSink, ErrorRecord, ErrorScope, ErrorSink, LogSink};
use super::sources::MetricSource;
use super::store::SnapshotStore;
use crate::error::MetricError;

pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(2);

/// Tuning knobs that stay fixed for the collector's lifetime
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub history_len: usize,
    pub thresholds: SeverityThresholds,
    pub alert_threshold: f32,
    pub alert_policy: AlertPolicy,
    pub adapter_timeout: Duration,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            history_len: DEFAULT_HISTORY_SIZE,
            thresholds: SeverityThresholds::default(),
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            alert_policy: AlertPolicy::default(),
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Initializing,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
struct CounterBaseline {
    counters: NetCounters,
    at: DateTime<Utc>,
}

pub struct Collector<S: MetricSource> {
    source: Arc<S>,
    /// One per adapter; held while that adapter's query runs
    gates: HashMap<ErrorScope, Arc<Mutex<()>>>,
    clock: Arc<dyn Clock>,
    config: SharedConfig,
    store: Arc<SnapshotStore>,
    alert_sink: Arc<dyn AlertSink>,
    error_sink: Arc<dyn ErrorSink>,
    options: CollectorOptions,
    evaluator: AlertEvaluator,
    cpu_history: RollingHistory<f32>,
    memory_history: RollingHistory<f32>,
    /// None until a real counter reading exists; the first rate is then 0
    baseline: Option<CounterBaseline>,
    boot_time: DateTime<Utc>,
    round: u64,
    state: CollectorState,
}

impl<S: MetricSource> Collector<S> {
    /// Collector with default options, the system clock and log-backed sinks
    pub fn new(source: S, config: SharedConfig, store: Arc<SnapshotStore>) -> Self {
        let options = CollectorOptions::default();
        Self {
            source: Arc::new(source),
            gates: ErrorScope::ADAPTERS
                .iter()
                .map(|scope| (*scope, Arc::new(Mutex::new(()))))
                .collect(),
            clock: Arc::new(SystemClock),
            config,
            store,
            alert_sink: Arc::new(LogSink),
            error_sink: Arc::new(LogSink),
            evaluator: AlertEvaluator::new(options.alert_threshold, options.alert_policy),
            cpu_history: RollingHistory::new(options.history_len),
            memory_history: RollingHistory::new(options.history_len),
            options,
            baseline: None,
            boot_time: Utc::now(),
            round: 0,
            state: CollectorState::Initializing,
        }
    }

    /// Replaces the options; histories and alert state start over.
    pub fn with_options(mut self, options: CollectorOptions) -> Self {
        self.evaluator = AlertEvaluator::new(options.alert_threshold, options.alert_policy);
        self.cpu_history = RollingHistory::new(options.history_len);
        self.memory_history = RollingHistory::new(options.history_len);
        self.options = options;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = sink;
        self
    }

    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sink = sink;
        self
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn rounds_completed(&self) -> u64 {
        self.round
    }

    pub fn store(&self) -> Arc<SnapshotStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> SharedConfig {
        self.config.clone()
    }

    /// Take the network baseline and the boot time. Never fails: missing
    /// values are logged and replaced so the loop can start.
    pub async fn initialize(&mut self) {
        let now = self.clock.now();

        match self.query(ErrorScope::Network, |s| s.network_counters()).await {
            Ok(counters) => {
                self.baseline = Some(CounterBaseline {
                    counters,
                    at: self.clock.now(),
                })
            }
            Err(err) => {
                self.error_sink
                    .record(&ErrorRecord::init(ErrorScope::Network, &err, now));
                self.baseline = None;
            }
        }

        self.boot_time = match self.query(ErrorScope::Uptime, |s| s.boot_time()).await {
            Ok(boot_time) => boot_time,
            Err(err) => {
                self.error_sink
                    .record(&ErrorRecord::init(ErrorScope::Uptime, &err, now));
                now
            }
        };

        self.state = CollectorState::Running;
        log::info!("Collector initialized (boot time {})", self.boot_time);
    }

    /// Run rounds until `shutdown` fires or its sender is dropped.
    ///
    /// Shutdown is observed at the sleep between rounds, so at most one
    /// in-flight round delays it.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) {
        if self.state == CollectorState::Initializing {
            self.initialize().await;
        }
        if self.state == CollectorState::Stopped {
            return;
        }

        log::info!("Collector loop started");

        loop {
            let snapshot = self.run_round().await;
            let delay = Duration::try_from_secs_f64(snapshot.interval_secs)
                .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_REFRESH_INTERVAL));

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => break,
            }
        }

        self.state = CollectorState::Stopped;
        log::info!("Collector stopped after {} rounds", self.round);
    }

    /// One complete round. Per-adapter failures end up in the snapshot and
    /// the error sink; the round itself always completes.
    pub async fn run_round(&mut self) -> Arc<Snapshot> {
        if self.state == CollectorState::Initializing {
            self.initialize().await;
        }

        let config = self.config.current();
        let now = self.clock.now();
        self.round += 1;

        let mut metrics = BTreeMap::new();

        match self.query(ErrorScope::Cpu, |s| s.cpu()).await {
            Ok(cpu) => {
                let percent = clamp_percent(cpu.percent);
                self.cpu_history.append(percent);
                metrics.insert(Metric::CpuUsage, self.percent_entry(percent, Metric::CpuUsage));
                metrics.insert(
                    Metric::CpuFrequency,
                    MetricEntry::new(Sample::Reading(MetricReading::Frequency {
                        mhz: cpu.frequency_mhz,
                    })),
                );
            }
            Err(err) => self.fail(&mut metrics, ErrorScope::Cpu, err, now),
        }

        match self.query(ErrorScope::Memory, |s| s.memory()).await {
            Ok(memory) => {
                let percent = clamp_percent(memory.percent());
                self.memory_history.append(percent);
                metrics.insert(
                    Metric::MemoryUsage,
                    self.percent_entry(percent, Metric::MemoryUsage),
                );
                metrics.insert(
                    Metric::MemoryBytes,
                    MetricEntry::new(Sample::Reading(MetricReading::ByteCount {
                        used: memory.used,
                        total: memory.total,
                    })),
                );
            }
            Err(err) => self.fail(&mut metrics, ErrorScope::Memory, err, now),
        }

        let disk_id = config.selected_disk.clone();
        match self.query(ErrorScope::Disk, move |s| s.disk(&disk_id)).await {
            Ok(disk) => {
                let percent = clamp_percent(disk.percent());
                metrics.insert(Metric::DiskUsage, self.percent_entry(percent, Metric::DiskUsage));
                metrics.insert(
                    Metric::DiskBytes,
                    MetricEntry::new(Sample::Reading(MetricReading::ByteCount {
                        used: disk.used,
                        total: disk.total,
                    })),
                );
            }
            Err(err) => self.fail(&mut metrics, ErrorScope::Disk, err, now),
        }

        match self.query(ErrorScope::Battery, |s| s.battery()).await {
            Ok(Some(battery)) => {
                metrics.insert(
                    Metric::Battery,
                    MetricEntry::new(Sample::Reading(MetricReading::BatteryState {
                        percent: clamp_percent(battery.percent),
                        charging: battery.charging,
                    })),
                );
            }
            Ok(None) => {
                metrics.insert(Metric::Battery, MetricEntry::new(Sample::Absent));
            }
            Err(err) => self.fail(&mut metrics, ErrorScope::Battery, err, now),
        }

        match self.query(ErrorScope::Network, |s| s.network_counters()).await {
            Ok(counters) => {
                // other adapters ran since the round started
                let read_at = self.clock.now();
                let (upload, download) = match self.baseline {
                    Some(prev) => {
                        throughput(prev.counters, counters, elapsed_secs(prev.at, read_at))
                    }
                    None => (0.0, 0.0),
                };
                self.baseline = Some(CounterBaseline {
                    counters,
                    at: read_at,
                });

                metrics.insert(
                    Metric::Upload,
                    MetricEntry::new(Sample::Reading(MetricReading::Rate { kb_per_sec: upload })),
                );
                metrics.insert(
                    Metric::Download,
                    MetricEntry::new(Sample::Reading(MetricReading::Rate {
                        kb_per_sec: download,
                    })),
                );
            }
            // the previous baseline stays, so the next rate spans the real gap
            Err(err) => self.fail(&mut metrics, ErrorScope::Network, err, now),
        }

        match (now - self.boot_time).to_std() {
            Ok(uptime) => {
                metrics.insert(
                    Metric::Uptime,
                    MetricEntry::new(Sample::Reading(MetricReading::Duration {
                        secs: uptime.as_secs(),
                    })),
                );
            }
            Err(_) => {
                let err = MetricError::unavailable(format!(
                    "boot time {} is in the future",
                    self.boot_time
                ));
                self.fail(&mut metrics, ErrorScope::Uptime, err, now);
            }
        }

        let snapshot = Snapshot {
            round: self.round,
            timestamp: now,
            interval_secs: config.refresh_interval_secs,
            selected_disk: config.selected_disk,
            metrics,
            cpu_history: self.cpu_history.snapshot(),
            memory_history: self.memory_history.snapshot(),
        };

        let alerts = self.evaluator.evaluate(&snapshot);
        let published = self.store.publish(snapshot);

        for alert in alerts {
            self.alert_sink.alert(&alert);
            self.store.record_alert(alert);
        }

        log::trace!("Round {} published", self.round);
        published
    }

    fn percent_entry(&self, percent: f32, metric: Metric) -> MetricEntry {
        MetricEntry {
            sample: Sample::Reading(MetricReading::percentage(percent, metric.label())),
            severity: Some(self.options.thresholds.classify(percent)),
        }
    }

    fn fail(
        &self,
        metrics: &mut BTreeMap<Metric, MetricEntry>,
        scope: ErrorScope,
        err: MetricError,
        now: DateTime<Utc>,
    ) {
        log::debug!("{} query failed: {}", scope.label(), err);
        self.error_sink.record(&ErrorRecord::round(scope, &err, now));
        for metric in scope.metrics() {
            metrics.insert(*metric, MetricEntry::new(Sample::Failure(err.clone())));
        }
    }

    /// Run one adapter on the blocking pool, bounded by the adapter timeout.
    ///
    /// A query that times out keeps running in the background and keeps its
    /// adapter's gate, so only that adapter's next queries time out.
    async fn query<T, F>(&self, scope: ErrorScope, f: F) -> Result<T, MetricError>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T, MetricError> + Send + 'static,
    {
        let source = Arc::clone(&self.source);
        let gate = self
            .gates
            .get(&scope)
            .cloned()
            .unwrap_or_else(|| Arc::new(Mutex::new(())));
        let budget = self.options.adapter_timeout;

        let task = tokio::task::spawn_blocking(move || {
            let _busy = gate
                .try_lock_for(budget)
                .ok_or_else(|| MetricError::timeout(budget))?;
            f(&source)
        });

        match tokio::time::timeout(budget, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(MetricError::query(format!("adapter task failed: {}", join_err))),
            Err(_) => Err(MetricError::timeout(budget)),
        }
    }
}
