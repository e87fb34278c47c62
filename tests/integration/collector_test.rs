use std::time::Duration;

use sysmon::core::system_monitor::{
    AlertPolicy, CollectorOptions, CollectorState, CpuSample, ErrorScope, FailureKind, Metric,
    MetricReading, NetCounters, Sample, SeverityBand,
};
use sysmon::error::MetricError;
use tokio::sync::broadcast;

use super::support::{start_time, Harness, Script};

fn cpu(percent: f32) -> Result<CpuSample, MetricError> {
    Ok(CpuSample {
        percent,
        frequency_mhz: 2400,
    })
}

fn counters(bytes_sent: u64, bytes_recv: u64) -> Result<NetCounters, MetricError> {
    Ok(NetCounters {
        bytes_sent,
        bytes_recv,
    })
}

fn rate_of(reading: Option<&MetricReading>) -> f64 {
    match reading {
        Some(MetricReading::Rate { kb_per_sec }) => *kb_per_sec,
        other => panic!("expected a rate, got {:?}", other),
    }
}

#[tokio::test]
async fn test_network_rate_from_baseline() {
    let mut h = Harness::new(Script {
        network: counters(1000, 2000),
        ..Default::default()
    });
    h.collector.initialize().await;
    assert_eq!(h.collector.state(), CollectorState::Running);

    h.clock.advance(chrono::Duration::seconds(1));
    h.source.edit(|s| s.network = counters(2024, 2048));
    let snapshot = h.collector.run_round().await;

    assert_eq!(rate_of(snapshot.reading(Metric::Upload)), 1.0);
    assert_eq!(rate_of(snapshot.reading(Metric::Download)), 0.046875);
    assert!(h.sink.errors().is_empty());
}

#[tokio::test]
async fn test_rate_uses_elapsed_time() {
    let mut h = Harness::new(Script {
        network: counters(0, 0),
        ..Default::default()
    });
    h.collector.initialize().await;

    h.clock.advance(chrono::Duration::seconds(4));
    h.source.edit(|s| s.network = counters(4096, 8192));
    let snapshot = h.collector.run_round().await;

    assert_eq!(rate_of(snapshot.reading(Metric::Upload)), 1.0);
    assert_eq!(rate_of(snapshot.reading(Metric::Download)), 2.0);
}

#[tokio::test]
async fn test_zero_elapsed_gives_zero_rate() {
    let mut h = Harness::new(Script {
        network: counters(0, 0),
        ..Default::default()
    });
    h.collector.initialize().await;

    h.source.edit(|s| s.network = counters(10_000, 10_000));
    let snapshot = h.collector.run_round().await;

    assert_eq!(rate_of(snapshot.reading(Metric::Upload)), 0.0);
    assert_eq!(rate_of(snapshot.reading(Metric::Download)), 0.0);
}

#[tokio::test]
async fn test_counter_reset_counts_from_zero() {
    let mut h = Harness::new(Script {
        network: counters(5000, 5000),
        ..Default::default()
    });
    h.collector.initialize().await;

    h.clock.advance(chrono::Duration::seconds(1));
    h.source.edit(|s| s.network = counters(512, 5000));
    let snapshot = h.collector.run_round().await;

    assert_eq!(rate_of(snapshot.reading(Metric::Upload)), 0.5);
    assert_eq!(rate_of(snapshot.reading(Metric::Download)), 0.0);
}

#[tokio::test]
async fn test_failed_init_baseline_starts_at_zero() {
    let mut h = Harness::new(Script {
        network: Err(MetricError::unavailable("no interfaces")),
        boot_time: Err(MetricError::query("boot time unknown")),
        ..Default::default()
    });
    h.collector.initialize().await;

    let errors = h.sink.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.kind == FailureKind::Init));
    assert!(errors.iter().any(|e| e.scope == ErrorScope::Network));
    assert!(errors.iter().any(|e| e.scope == ErrorScope::Uptime));

    // counters come back; no baseline yet, so no spike
    h.clock.advance(chrono::Duration::seconds(1));
    h.source.edit(|s| s.network = counters(1_000_000, 1_000_000));
    let first = h.collector.run_round().await;
    assert_eq!(rate_of(first.reading(Metric::Upload)), 0.0);
    assert_eq!(rate_of(first.reading(Metric::Download)), 0.0);

    h.clock.advance(chrono::Duration::seconds(1));
    h.source.edit(|s| s.network = counters(1_001_024, 1_000_000));
    let second = h.collector.run_round().await;
    assert_eq!(rate_of(second.reading(Metric::Upload)), 1.0);
}

#[tokio::test]
async fn test_network_failure_keeps_baseline() {
    let mut h = Harness::new(Script {
        network: counters(0, 0),
        ..Default::default()
    });
    h.collector.initialize().await;

    h.clock.advance(chrono::Duration::seconds(1));
    h.source.edit(|s| s.network = Err(MetricError::query("interface vanished")));
    let failed = h.collector.run_round().await;
    assert!(matches!(
        failed.failure(Metric::Upload),
        Some(MetricError::Query(_))
    ));
    assert!(failed.failure(Metric::Download).is_some());

    let errors = h.sink.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].scope, ErrorScope::Network);
    assert_eq!(errors[0].kind, FailureKind::Adapter);

    h.clock.advance(chrono::Duration::seconds(1));
    h.source.edit(|s| s.network = counters(2048, 0));
    let recovered = h.collector.run_round().await;
    assert_eq!(rate_of(recovered.reading(Metric::Upload)), 1.0);
}

#[tokio::test]
async fn test_cpu_severity_bands() {
    let mut h = Harness::new(Script {
        cpu: cpu(80.0),
        ..Default::default()
    });

    let snapshot = h.collector.run_round().await;
    assert_eq!(snapshot.severity(Metric::CpuUsage), Some(SeverityBand::Critical));

    h.source.edit(|s| s.cpu = cpu(79.9));
    let snapshot = h.collector.run_round().await;
    assert_eq!(snapshot.severity(Metric::CpuUsage), Some(SeverityBand::Warning));

    h.source.edit(|s| s.cpu = cpu(49.9));
    let snapshot = h.collector.run_round().await;
    assert_eq!(snapshot.severity(Metric::CpuUsage), Some(SeverityBand::Normal));
    assert_eq!(snapshot.severity(Metric::DiskUsage), Some(SeverityBand::Normal));
}

#[tokio::test]
async fn test_cpu_reading_is_clamped() {
    let mut h = Harness::new(Script {
        cpu: cpu(104.0),
        ..Default::default()
    });

    let snapshot = h.collector.run_round().await;
    let value = snapshot
        .reading(Metric::CpuUsage)
        .and_then(|r| r.as_percent())
        .unwrap();
    assert_eq!(value, 100.0);
    assert_eq!(
        snapshot.reading(Metric::CpuFrequency),
        Some(&MetricReading::Frequency { mhz: 2400 })
    );
}

#[tokio::test]
async fn test_missing_disk_is_isolated_failure() {
    let mut h = Harness::new(Script::default());
    h.collector.run_round().await;
    assert!(h.sink.errors().is_empty());

    h.config.set_selected_disk("/mnt/gone");
    let snapshot = h.collector.run_round().await;

    assert_eq!(snapshot.selected_disk, "/mnt/gone");
    assert_eq!(
        snapshot.failure(Metric::DiskUsage),
        Some(&MetricError::not_found("/mnt/gone"))
    );
    assert!(snapshot.failure(Metric::DiskBytes).is_some());
    assert_eq!(snapshot.severity(Metric::DiskUsage), None);

    for metric in [
        Metric::CpuUsage,
        Metric::MemoryUsage,
        Metric::Upload,
        Metric::Download,
        Metric::Uptime,
    ] {
        assert!(
            snapshot.reading(metric).is_some(),
            "{} should still have a reading",
            metric
        );
    }

    let errors = h.sink.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].scope, ErrorScope::Disk);
    assert_eq!(errors[0].kind, FailureKind::Config);
}

#[tokio::test]
async fn test_battery_absent_and_failed() {
    let mut h = Harness::new(Script::default());
    let snapshot = h.collector.run_round().await;
    assert_eq!(snapshot.sample(Metric::Battery), Some(&Sample::Absent));

    h.source
        .edit(|s| s.battery = Err(MetricError::PermissionDenied("battery".to_string())));
    let snapshot = h.collector.run_round().await;
    assert!(snapshot.failure(Metric::Battery).is_some());
    assert_eq!(h.sink.errors()[0].scope, ErrorScope::Battery);
}

#[tokio::test]
async fn test_uptime_from_boot_time() {
    let mut h = Harness::new(Script::default());
    let snapshot = h.collector.run_round().await;
    assert_eq!(
        snapshot.reading(Metric::Uptime),
        Some(&MetricReading::Duration { secs: 3600 })
    );

    h.clock.advance(chrono::Duration::seconds(61));
    let snapshot = h.collector.run_round().await;
    assert_eq!(
        snapshot.reading(Metric::Uptime),
        Some(&MetricReading::Duration { secs: 3661 })
    );
}

#[tokio::test]
async fn test_boot_time_in_future_is_failure() {
    let mut h = Harness::new(Script {
        boot_time: Ok(start_time() + chrono::Duration::minutes(5)),
        ..Default::default()
    });
    let snapshot = h.collector.run_round().await;

    assert!(snapshot.failure(Metric::Uptime).is_some());
    assert!(snapshot.reading(Metric::CpuUsage).is_some());
}

#[tokio::test]
async fn test_alert_every_round_while_high() {
    let mut h = Harness::new(Script {
        cpu: cpu(95.0),
        ..Default::default()
    });

    h.collector.run_round().await;
    h.collector.run_round().await;

    let alerts = h.sink.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.metric == Metric::CpuUsage && a.value == 95.0));

    let latest = h.store.latest_alert().expect("latest alert");
    assert_eq!(latest.metric, Metric::CpuUsage);
    assert_eq!(latest.message(), "CPU usage is very high: 95.0%");
}

#[tokio::test]
async fn test_alert_on_crossing_policy() {
    let options = CollectorOptions {
        alert_policy: AlertPolicy::OnCrossing,
        ..Default::default()
    };
    let mut h = Harness::with_options(
        Script {
            cpu: cpu(95.0),
            ..Default::default()
        },
        options,
    );

    h.collector.run_round().await;
    h.collector.run_round().await;
    assert_eq!(h.sink.alerts().len(), 1);

    h.source.edit(|s| s.cpu = cpu(40.0));
    h.collector.run_round().await;
    h.source.edit(|s| s.cpu = cpu(95.0));
    h.collector.run_round().await;
    assert_eq!(h.sink.alerts().len(), 2);
}

#[tokio::test]
async fn test_histories_roll() {
    let options = CollectorOptions {
        history_len: 3,
        ..Default::default()
    };
    let mut h = Harness::with_options(Script::default(), options);

    for percent in [10.0, 20.0, 30.0, 40.0] {
        h.source.edit(|s| s.cpu = cpu(percent));
        h.collector.run_round().await;
    }

    let snapshot = h.store.read();
    assert_eq!(snapshot.round, 4);
    assert_eq!(snapshot.cpu_history, vec![20.0, 30.0, 40.0]);
    assert_eq!(snapshot.memory_history, vec![25.0, 25.0, 25.0]);
}

#[tokio::test]
async fn test_failed_cpu_round_skips_history() {
    let options = CollectorOptions {
        history_len: 3,
        ..Default::default()
    };
    let mut h = Harness::with_options(
        Script {
            cpu: cpu(50.0),
            ..Default::default()
        },
        options,
    );
    h.collector.run_round().await;

    h.source.edit(|s| s.cpu = Err(MetricError::query("sensor offline")));
    let snapshot = h.collector.run_round().await;

    assert_eq!(snapshot.cpu_history, vec![0.0, 0.0, 50.0]);
    assert!(snapshot.failure(Metric::CpuUsage).is_some());
    assert!(snapshot.failure(Metric::CpuFrequency).is_some());
}

#[tokio::test]
async fn test_interval_change_is_published() {
    let mut h = Harness::new(Script::default());
    h.collector.run_round().await;

    h.config.set_refresh_interval(5.0).unwrap();
    let snapshot = h.collector.run_round().await;
    assert_eq!(snapshot.interval_secs, 5.0);
}

#[tokio::test]
async fn test_slow_adapter_times_out_alone() {
    let options = CollectorOptions {
        adapter_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let mut h = Harness::with_options(
        Script {
            cpu_delay: Some(Duration::from_millis(400)),
            ..Default::default()
        },
        options,
    );

    let others = [
        Metric::MemoryUsage,
        Metric::MemoryBytes,
        Metric::DiskUsage,
        Metric::DiskBytes,
        Metric::Battery,
        Metric::Upload,
        Metric::Download,
        Metric::Uptime,
    ];

    let snapshot = h.collector.run_round().await;
    assert_eq!(
        snapshot.failure(Metric::CpuUsage),
        Some(&MetricError::Timeout(50))
    );
    for metric in others {
        assert!(
            snapshot.failure(metric).is_none(),
            "{} failed after a slow CPU query",
            metric
        );
    }
    let errors = h.sink.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].scope, ErrorScope::Cpu);
    assert_eq!(errors[0].kind, FailureKind::Adapter);

    // the stuck CPU query is still running: only CPU times out again
    let snapshot = h.collector.run_round().await;
    assert!(snapshot.failure(Metric::CpuUsage).is_some());
    for metric in others {
        assert!(snapshot.failure(metric).is_none());
    }

    h.source.edit(|s| s.cpu_delay = None);
    tokio::time::sleep(Duration::from_millis(500)).await;
    h.sink.clear();

    let snapshot = h.collector.run_round().await;
    assert!(snapshot.failures().next().is_none());
    assert!(h.sink.errors().is_empty());
}

#[tokio::test]
async fn test_rate_spans_slow_adapters() {
    let mut h = Harness::new(Script {
        network: counters(0, 0),
        battery_takes: Some(chrono::Duration::seconds(1)),
        ..Default::default()
    });
    h.collector.initialize().await;

    // counters are read after the battery query, two seconds after the baseline
    h.clock.advance(chrono::Duration::seconds(1));
    h.source.edit(|s| s.network = counters(4096, 2048));
    let first = h.collector.run_round().await;
    assert_eq!(rate_of(first.reading(Metric::Upload)), 2.0);
    assert_eq!(rate_of(first.reading(Metric::Download)), 1.0);

    h.source.edit(|s| s.network = counters(5120, 2048));
    let second = h.collector.run_round().await;
    assert_eq!(rate_of(second.reading(Metric::Upload)), 1.0);
    assert_eq!(rate_of(second.reading(Metric::Download)), 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_stops_on_shutdown() {
    let h = Harness::new(Script::default());
    h.config.set_refresh_interval(0.01).unwrap();

    let mut collector = h.collector;
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(async move {
        collector.run(shutdown_rx).await;
        collector
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown_tx.send(()).unwrap();

    let collector = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("collector did not stop")
        .unwrap();

    assert_eq!(collector.state(), CollectorState::Stopped);
    assert!(collector.rounds_completed() >= 2);
    assert_eq!(h.store.read().round, collector.rounds_completed());
}
