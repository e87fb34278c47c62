//! Tokio runtime that hosts the collector.
//!
//! The collector runs as the single background task; consumers pull from the
//! store and push config changes through [`SharedConfig`].

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::collector::{Collector, CollectorState};
use super::collector_config::SharedConfig;
use super::sources::MetricSource;
use super::store::SnapshotStore;
use crate::error::{MonitorError, Result};

/// Wrapper around the Tokio runtime for metrics collection.
pub struct MonitorRuntime {
    store: Arc<SnapshotStore>,
    config: SharedConfig,

    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,

    collector_task: JoinHandle<CollectorState>,

    /// Kept alive for the lifetime of the collector
    runtime: tokio::runtime::Runtime,
}

impl MonitorRuntime {
    /// Spawn `collector` on a new runtime.
    pub fn start<S: MetricSource>(mut collector: Collector<S>) -> Result<Self> {
        log::info!("Initializing MonitorRuntime");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("metrics-worker")
            .build()?;

        let store = collector.store();
        let config = collector.config();
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

        let collector_task = runtime.spawn(async move {
            collector.run(shutdown_rx).await;
            collector.state()
        });

        Ok(Self {
            store,
            config,
            shutdown_tx,
            collector_task,
            runtime,
        })
    }

    pub fn store(&self) -> Arc<SnapshotStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> SharedConfig {
        self.config.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.collector_task.is_finished()
    }

    /// Signal shutdown and wait for the collector to leave its loop.
    pub fn shutdown(self) -> Result<CollectorState> {
        log::info!("Shutting down MonitorRuntime");

        // Err only means the collector already dropped its receiver
        let _ = self.shutdown_tx.send(());

        let state = self
            .runtime
            .block_on(self.collector_task)
            .map_err(|e| MonitorError::runtime(format!("collector task failed: {}", e)))?;

        self.runtime.shutdown_timeout(std::time::Duration::from_secs(1));
        Ok(state)
    }
}
