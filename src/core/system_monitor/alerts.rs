//! Alert system for high resource usage.
//!
//! Evaluates the percentage slots of a snapshot against the alert threshold
//! and produces transient alert events.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::{Metric, Snapshot};

pub const DEFAULT_ALERT_THRESHOLD: f32 = 90.0;

/// A single high-usage event. Not stored in any history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub metric: Metric,
    pub value: f32,
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    pub fn message(&self) -> String {
        format!("{} usage is very high: {:.1}%", self.metric.label(), self.value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPolicy {
    /// One event per qualifying round while the metric stays above threshold
    #[default]
    EveryRound,
    /// One event when the metric moves above threshold, none while it stays there
    OnCrossing,
}

/// Percentage slots that can raise alerts
pub const ALERTING_METRICS: [Metric; 3] = [Metric::CpuUsage, Metric::MemoryUsage, Metric::DiskUsage];

/// Stateful evaluator; remembers which metrics were above threshold last round.
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    threshold: f32,
    policy: AlertPolicy,
    above: HashSet<Metric>,
}

impl AlertEvaluator {
    pub fn new(threshold: f32, policy: AlertPolicy) -> Self {
        Self {
            threshold,
            policy,
            above: HashSet::new(),
        }
    }

    /// Events for this snapshot. A failed slot resets the crossing state of
    /// its metric.
    pub fn evaluate(&mut self, snapshot: &Snapshot) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        for metric in ALERTING_METRICS {
            let value = snapshot.reading(metric).and_then(|r| r.as_percent());
            let Some(value) = value.filter(|v| *v > self.threshold) else {
                self.above.remove(&metric);
                continue;
            };

            let newly_above = self.above.insert(metric);
            if self.policy == AlertPolicy::EveryRound || newly_above {
                events.push(AlertEvent {
                    metric,
                    value,
                    timestamp: snapshot.timestamp,
                });
            }
        }

        events
    }
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_THRESHOLD, AlertPolicy::default())
    }
}
