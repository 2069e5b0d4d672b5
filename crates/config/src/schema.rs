use cpumon_core::{Lookback, MonitorError, Result, RetentionPolicy};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure parsed from `cpumon.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub sampler: SamplerConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub retention: RetentionConfig,
}

impl MonitorConfig {
    /// Reject settings the daemon cannot run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.sampler;
        if s.interval_secs == 0 {
            return Err(MonitorError::Config("sampler.interval_secs must be > 0".into()));
        }
        if s.tick_timeout_secs == 0 || s.tick_timeout_secs >= s.interval_secs {
            return Err(MonitorError::Config(format!(
                "sampler.tick_timeout_secs must be between 1 and {} (exclusive)",
                s.interval_secs
            )));
        }
        let r = &self.retention;
        if r.minute_days == 0 || r.hour_months == 0 || r.day_months == 0 {
            return Err(MonitorError::Config("retention windows must be > 0".into()));
        }
        self.server.listen_addr()?;
        Ok(())
    }
}

/// Background sampler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Seconds between two samples.
    pub interval_secs: u64,
    /// Upper bound for one read-and-store cycle.
    pub tick_timeout_secs: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_secs:     60,
            tick_timeout_secs: 30,
        }
    }
}

impl SamplerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn tick_timeout(&self) -> Duration {
        Duration::from_secs(self.tick_timeout_secs)
    }
}

/// Sample database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: crate::default_data_path() }
    }
}

/// HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { listen: "127.0.0.1:8080".to_string() }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| MonitorError::Config(format!("server.listen '{}': {e}", self.listen)))
    }
}

/// How far back each query granularity may look.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Raw (minute) queries, in days.
    pub minute_days: u32,
    /// Hourly bucket queries, in calendar months.
    pub hour_months: u32,
    /// Daily bucket queries, in calendar months.
    pub day_months: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            minute_days: 7,
            hour_months: 3,
            day_months:  12,
        }
    }
}

impl RetentionConfig {
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            minute: Lookback::Days(self.minute_days),
            hour:   Lookback::Months(self.hour_months),
            day:    Lookback::Months(self.day_months),
        }
    }
}
