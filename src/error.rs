use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Custom error type for the sysmon application
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for the sysmon application
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MonitorError::Config(msg.into())
    }

    /// Create a runtime error
    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        MonitorError::Runtime(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        MonitorError::Other(msg.into())
    }
}

/// Failure of a single metric query.
///
/// These never abort a sampling round: the collector stores them in the
/// affected snapshot slot and forwards them to the error sink. They are
/// serializable because they travel inside snapshots.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricError {
    /// The requested resource (usually the selected disk) does not exist.
    #[error("{0} not found")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The query did not return within the adapter timeout.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// The platform does not expose this metric right now.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl MetricError {
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        MetricError::NotFound(what.into())
    }

    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        MetricError::Unavailable(msg.into())
    }

    pub fn query<S: Into<String>>(msg: S) -> Self {
        MetricError::Query(msg.into())
    }

    pub fn timeout(after: Duration) -> Self {
        MetricError::Timeout(after.as_millis().min(u64::MAX as u128) as u64)
    }
}

impl From<io::Error> for MetricError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => MetricError::NotFound(err.to_string()),
            io::ErrorKind::PermissionDenied => MetricError::PermissionDenied(err.to_string()),
            io::ErrorKind::TimedOut => MetricError::Timeout(0),
            _ => MetricError::Query(err.to_string()),
        }
    }
}
