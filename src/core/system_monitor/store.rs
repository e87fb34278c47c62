//! Hand-off point between the collector and its readers.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use super::alerts::AlertEvent;
use super::metrics::Snapshot;

/// Latest snapshot plus the latest alert.
///
/// Snapshots are swapped as whole `Arc`s, so a reader holds either the
/// previous or the newest round, never a mix. Only the collector publishes.
#[derive(Debug)]
pub struct SnapshotStore {
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    last_alert: RwLock<Option<AlertEvent>>,
}

impl SnapshotStore {
    pub fn new(initial: Snapshot) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(initial));
        Self {
            snapshot_tx,
            last_alert: RwLock::new(None),
        }
    }

    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        // send_replace works with zero receivers
        self.snapshot_tx.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    pub fn read(&self) -> Arc<Snapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Receiver notified on every publish, for async consumers
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn record_alert(&self, event: AlertEvent) {
        *self.last_alert.write() = Some(event);
    }

    pub fn latest_alert(&self) -> Option<AlertEvent> {
        self.last_alert.read().clone()
    }
}
