use std::fs;
use std::sync::Arc;

use sysmon::core::system_monitor::{
    Collector, CollectorConfig, ErrorSink, Fanout, FileErrorLog, RecordingSink, SharedConfig,
    Snapshot, SnapshotStore,
};
use tempfile::TempDir;

use super::support::ScriptedSource;

#[tokio::test]
async fn test_missing_disk_is_written_to_error_log() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("system_monitor_errors.log");

    let recording = Arc::new(RecordingSink::new());
    let sinks = vec![
        Arc::new(FileErrorLog::new(&log_path)) as Arc<dyn ErrorSink>,
        recording.clone() as Arc<dyn ErrorSink>,
    ];

    let config = SharedConfig::new(CollectorConfig::new(1.0, "/nope").unwrap()).unwrap();
    let store = Arc::new(SnapshotStore::new(Snapshot::initial(5, 1.0, "/nope".to_string())));
    let mut collector = Collector::new(ScriptedSource::default(), config, store)
        .with_error_sink(Arc::new(Fanout::new(sinks)));

    collector.run_round().await;
    collector.run_round().await;

    let contents = fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines
        .iter()
        .all(|l| l.ends_with(": Disk error: /nope not found")));
    assert_eq!(recording.errors().len(), 2);
}

#[test]
fn test_unwritable_error_log_does_not_panic() {
    let dir = TempDir::new().unwrap();
    // a directory cannot be opened for appending
    let log = FileErrorLog::new(dir.path());
    let recording = RecordingSink::new();

    let record = sysmon::core::system_monitor::ErrorRecord::round(
        sysmon::core::system_monitor::ErrorScope::Cpu,
        &sysmon::error::MetricError::query("boom"),
        chrono::Utc::now(),
    );
    log.record(&record);
    recording.record(&record);

    assert_eq!(recording.errors(), vec![record]);
}
