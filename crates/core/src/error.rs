use chrono::NaiveDateTime;
use thiserror::Error;

use crate::retention::Granularity;

/// Top-level error type used across the entire application.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The host could not report CPU utilization this time.
    #[error("CPU metric unavailable: {0}")]
    MetricUnavailable(String),

    /// The sample store could not complete an append or a query.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The requested start lies before the granularity's retention cutoff.
    #[error(
        "{granularity} usage is only available from {} onwards",
        .cutoff.format("%Y-%m-%dT%H:%M:%S")
    )]
    OutOfRetentionWindow {
        granularity: Granularity,
        cutoff: NaiveDateTime,
    },

    /// A sampling cycle overran its time budget.
    #[error("sampling cycle did not finish within {0:?}")]
    Timeout(std::time::Duration),

    /// A background task panicked or was cancelled.
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// A request parameter failed to parse as the expected temporal type.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl MonitorError {
    /// `true` for failures caused by the caller's request rather than the service.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::OutOfRetentionWindow { .. } | Self::MalformedInput(_)
        )
    }
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
