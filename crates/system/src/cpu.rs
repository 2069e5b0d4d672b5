use cpumon_core::{MonitorError, Result};
use sysinfo::{CpuRefreshKind, RefreshKind, System};

/// Reads host-wide CPU utilization.
pub trait MetricSource: Send {
    /// CPU time used by the whole host since the previous read, in percent.
    fn read(&mut self) -> Result<f64>;
}

/// [`MetricSource`] backed by `sysinfo`.
///
/// CPU usage is a delta between two refreshes, so the constructor takes the
/// first baseline and every `read` measures against the one before it.
pub struct SysinfoSource {
    sys: System,
}

impl SysinfoSource {
    pub fn new() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_cpu_usage()),
        );
        Self { sys }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SysinfoSource {
    fn read(&mut self) -> Result<f64> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(MonitorError::MetricUnavailable(
                "sysinfo does not support this platform".into(),
            ));
        }
        self.sys.refresh_cpu_usage();
        if self.sys.cpus().is_empty() {
            return Err(MonitorError::MetricUnavailable("no CPUs reported".into()));
        }
        checked_percent(f64::from(self.sys.global_cpu_usage()))
    }
}

/// Pass finite readings through unchanged; out-of-range values are kept.
fn checked_percent(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MonitorError::MetricUnavailable(format!("non-finite reading: {value}")))
    }
}
