// Core business logic module

pub mod config;
pub mod system_monitor;

// Re-export commonly used items
pub use config::Settings;
pub use system_monitor::{Collector, MonitorRuntime, Snapshot, SnapshotStore};
