//! Metric source adapters.
//!
//! Each adapter performs one query against host state and returns a typed
//! raw reading. Derived values (percentages, rates, severities) are computed
//! by the collector.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

use super::rate::NetCounters;
use crate::error::MetricError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSample {
    pub percent: f32,
    pub frequency_mhz: u64,
}

/// Used and total bytes (memory or a filesystem)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSample {
    pub used: u64,
    pub total: u64,
}

impl UsageSample {
    pub fn percent(&self) -> f32 {
        if self.total > 0 {
            (self.used as f64 / self.total as f64 * 100.0) as f32
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatterySample {
    pub percent: f32,
    pub charging: bool,
}

/// Host metric queries used by the collector.
///
/// Implementations run on the blocking pool. The collector runs at most one
/// call per adapter at a time, but different adapters may run concurrently,
/// so each adapter keeps its own state.
pub trait MetricSource: Send + Sync + 'static {
    fn cpu(&self) -> Result<CpuSample, MetricError>;

    fn memory(&self) -> Result<UsageSample, MetricError>;

    /// Usage of the disk identified by a mount point, a path on it, or its
    /// device name. `NotFound` when the identifier no longer resolves.
    fn disk(&self, id: &str) -> Result<UsageSample, MetricError>;

    /// `Ok(None)` when the host has no battery
    fn battery(&self) -> Result<Option<BatterySample>, MetricError>;

    /// Cumulative byte counters summed over all interfaces
    fn network_counters(&self) -> Result<NetCounters, MetricError>;

    fn boot_time(&self) -> Result<DateTime<Utc>, MetricError>;

    /// Identifiers accepted by [`MetricSource::disk`], for selection lists
    fn disk_identifiers(&self) -> Vec<String>;
}

/// Mounted filesystem as seen by the disk adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskInfo {
    pub name: String,
    pub mount_point: PathBuf,
    pub total: u64,
    pub available: u64,
}

/// Find the disk for `id`: exact device name or mount point first, then the
/// mount containing an existing path (longest mount wins).
pub fn resolve_disk<'a>(disks: &'a [DiskInfo], id: &str) -> Result<&'a DiskInfo, MetricError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(MetricError::not_found("<no disk selected>"));
    }

    let path = Path::new(id);
    if let Some(disk) = disks
        .iter()
        .find(|d| d.name == id || d.mount_point.as_path() == path)
    {
        return Ok(disk);
    }

    if !path.exists() {
        return Err(MetricError::not_found(id));
    }

    disks
        .iter()
        .filter(|d| path.starts_with(&d.mount_point))
        .max_by_key(|d| d.mount_point.components().count())
        .ok_or_else(|| MetricError::not_found(id))
}

/// Real host adapters backed by `sysinfo` and `battery`.
///
/// Every adapter owns its own sysinfo handle, so a query stuck in one
/// cannot hold up the others.
pub struct HostSource {
    cpu: Mutex<System>,
    memory: Mutex<System>,
    disks: Mutex<Disks>,
    networks: Mutex<Networks>,
}

impl HostSource {
    pub fn new() -> Self {
        let mut cpu =
            System::new_with_specifics(RefreshKind::nothing().with_cpu(CpuRefreshKind::everything()));
        // CPU usage is a delta between two refreshes; prime the first one
        cpu.refresh_cpu_all();

        let memory = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
        );

        Self {
            cpu: Mutex::new(cpu),
            memory: Mutex::new(memory),
            disks: Mutex::new(Disks::new_with_refreshed_list()),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }

    fn disk_infos(&self) -> Vec<DiskInfo> {
        let mut disks = self.disks.lock();
        disks.refresh(true);
        disks
            .iter()
            .map(|disk| DiskInfo {
                name: disk.name().to_string_lossy().to_string(),
                mount_point: disk.mount_point().to_path_buf(),
                total: disk.total_space(),
                available: disk.available_space(),
            })
            .collect()
    }
}

impl Default for HostSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for HostSource {
    fn cpu(&self) -> Result<CpuSample, MetricError> {
        let mut system = self.cpu.lock();
        system.refresh_cpu_all();

        let cpus = system.cpus();
        if cpus.is_empty() {
            return Err(MetricError::unavailable("no CPUs reported"));
        }

        let frequency_mhz = cpus.iter().map(|cpu| cpu.frequency()).sum::<u64>() / cpus.len() as u64;

        Ok(CpuSample {
            percent: system.global_cpu_usage(),
            frequency_mhz,
        })
    }

    fn memory(&self) -> Result<UsageSample, MetricError> {
        let mut system = self.memory.lock();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(MetricError::unavailable("total memory reported as 0"));
        }

        Ok(UsageSample {
            used: system.used_memory().min(total),
            total,
        })
    }

    fn disk(&self, id: &str) -> Result<UsageSample, MetricError> {
        let disks = self.disk_infos();
        let disk = resolve_disk(&disks, id)?;

        Ok(UsageSample {
            used: disk.total.saturating_sub(disk.available),
            total: disk.total,
        })
    }

    fn battery(&self) -> Result<Option<BatterySample>, MetricError> {
        let manager = battery::Manager::new().map_err(|e| MetricError::query(e.to_string()))?;
        let mut batteries = manager
            .batteries()
            .map_err(|e| MetricError::query(e.to_string()))?;

        match batteries.next() {
            None => Ok(None),
            Some(Err(e)) => Err(MetricError::query(e.to_string())),
            Some(Ok(info)) => {
                let percent = info
                    .state_of_charge()
                    .get::<battery::units::ratio::percent>();
                let charging = matches!(
                    info.state(),
                    battery::State::Charging | battery::State::Full
                );
                Ok(Some(BatterySample { percent, charging }))
            }
        }
    }

    fn network_counters(&self) -> Result<NetCounters, MetricError> {
        let mut networks = self.networks.lock();
        networks.refresh(true);

        Ok(networks
            .values()
            .fold(NetCounters::default(), |acc, data| NetCounters {
                bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
                bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
            }))
    }

    fn boot_time(&self) -> Result<DateTime<Utc>, MetricError> {
        let secs = System::boot_time();
        if secs == 0 {
            return Err(MetricError::unavailable("boot time not reported"));
        }

        DateTime::<Utc>::from_timestamp(secs as i64, 0)
            .ok_or_else(|| MetricError::query(format!("invalid boot timestamp {}", secs)))
    }

    fn disk_identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .disk_infos()
            .into_iter()
            .filter(|d| d.mount_point.exists())
            .map(|d| d.mount_point.to_string_lossy().to_string())
            .collect();
        ids.dedup();
        ids
    }
}

/// Default disk selection: the first present disk, or the filesystem root.
pub fn default_disk(source: &dyn MetricSource) -> String {
    source
        .disk_identifiers()
        .into_iter()
        .next()
        .unwrap_or_else(root_path)
}

pub fn root_path() -> String {
    if cfg!(windows) {
        "C:\\".to_string()
    } else {
        "/".to_string()
    }
}
