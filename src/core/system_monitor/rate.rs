//! Conversion of cumulative counters into instantaneous rates.

/// Cumulative network byte counters, summed over all interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Kilobytes per second between two counter samples.
///
/// A non-positive (or non-finite) interval yields 0. A counter that went
/// backwards is treated as a reset: the delta is the new value itself.
pub fn rate(prev: u64, curr: u64, elapsed_secs: f64) -> f64 {
    if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
        return 0.0;
    }

    let delta = if curr >= prev { curr - prev } else { curr };
    delta as f64 / 1024.0 / elapsed_secs
}

/// Upload and download rates in KB/s, in that order
pub fn throughput(prev: NetCounters, curr: NetCounters, elapsed_secs: f64) -> (f64, f64) {
    (
        rate(prev.bytes_sent, curr.bytes_sent, elapsed_secs),
        rate(prev.bytes_recv, curr.bytes_recv, elapsed_secs),
    )
}
