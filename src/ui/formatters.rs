use colored::*;
use humansize::{format_size, BINARY};

use crate::core::system_monitor::{Metric, MetricReading, Sample, SeverityBand, Snapshot};

/// Format uptime as `H:MM:SS`, or `D day(s), H:MM:SS` past one day
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;

    match days {
        0 => format!("{}:{:02}:{:02}", hours, minutes, seconds),
        1 => format!("1 day, {}:{:02}:{:02}", hours, minutes, seconds),
        _ => format!("{} days, {}:{:02}:{:02}", days, hours, minutes, seconds),
    }
}

/// Format a KB/s rate with one decimal
fn format_rate(kb_per_sec: f64) -> String {
    format!("{:.1} KB/s", kb_per_sec)
}

pub fn format_reading(reading: &MetricReading) -> String {
    match reading {
        MetricReading::Percentage { value, .. } => format!("{:.1}%", value),
        MetricReading::Frequency { mhz } => format!("{} MHz", mhz),
        MetricReading::ByteCount { used, total } => format!(
            "{} / {}",
            format_size(*used, BINARY),
            format_size(*total, BINARY)
        ),
        MetricReading::Rate { kb_per_sec } => format_rate(*kb_per_sec),
        MetricReading::BatteryState { percent, charging } => format!(
            "{:.0}% {}",
            percent,
            if *charging { "(Charging)" } else { "(Not Charging)" }
        ),
        MetricReading::Duration { secs } => format_uptime(*secs),
    }
}

/// Text for one slot; failures render as an explicit error, never a value
pub fn format_sample(sample: Option<&Sample>) -> String {
    match sample {
        Some(Sample::Reading(reading)) => format_reading(reading),
        Some(Sample::Absent) => "n/a".to_string(),
        Some(Sample::Failure(_)) => "Error".to_string(),
        None => "-".to_string(),
    }
}

pub fn colorize(text: String, band: Option<SeverityBand>) -> ColoredString {
    match band {
        Some(SeverityBand::Critical) => text.red(),
        Some(SeverityBand::Warning) => text.yellow(),
        Some(SeverityBand::Normal) => text.green(),
        None => text.normal(),
    }
}

/// One status line per snapshot
pub fn format_snapshot_line(snapshot: &Snapshot) -> String {
    let slot = |metric: Metric| {
        let text = format_sample(snapshot.sample(metric));
        if snapshot.failure(metric).is_some() {
            text.red().bold().to_string()
        } else {
            colorize(text, snapshot.severity(metric)).to_string()
        }
    };

    format!(
        "#{} CPU {} @ {} | RAM {} ({}) | Disk {} {} ({}) | Battery {} | ↑ {} ↓ {} | Uptime {}",
        snapshot.round,
        slot(Metric::CpuUsage),
        slot(Metric::CpuFrequency),
        slot(Metric::MemoryUsage),
        slot(Metric::MemoryBytes),
        snapshot.selected_disk,
        slot(Metric::DiskUsage),
        slot(Metric::DiskBytes),
        slot(Metric::Battery),
        slot(Metric::Upload),
        slot(Metric::Download),
        slot(Metric::Uptime),
    )
}

/// Render a history as a one-line sparkline, values in percent
pub fn sparkline(values: &[f32]) -> String {
    const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    values
        .iter()
        .map(|v| {
            let idx = (v.clamp(0.0, 100.0) / 100.0 * (BARS.len() - 1) as f32).round() as usize;
            BARS[idx.min(BARS.len() - 1)]
        })
        .collect()
}
