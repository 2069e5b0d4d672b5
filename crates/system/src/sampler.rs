use cpumon_core::{Clock, MonitorError, Result, Sample, SampleStore};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cpu::MetricSource;

/// Default time between two samples.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
/// Default bound on one whole read-and-store cycle.
pub const DEFAULT_TICK_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the sampler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerState {
    /// Waiting for the next tick.
    #[default]
    Idle,
    /// Reading the metric and storing it.
    Sampling,
}

/// Snapshot of sampler progress, published after every state change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SamplerStatus {
    pub state: SamplerState,
    /// Completed cycles, successful or not.
    pub ticks: u64,
    pub failures: u64,
    pub last_sample: Option<Sample>,
    pub last_error: Option<String>,
}

/// Periodically reads a [`MetricSource`] and appends the value to a store.
pub struct Sampler<M> {
    source:       Arc<Mutex<M>>,
    store:        Arc<dyn SampleStore>,
    clock:        Arc<dyn Clock>,
    interval:     Duration,
    tick_timeout: Duration,
}

impl<M> Clone for Sampler<M> {
    fn clone(&self) -> Self {
        Self {
            source:       Arc::clone(&self.source),
            store:        Arc::clone(&self.store),
            clock:        Arc::clone(&self.clock),
            interval:     self.interval,
            tick_timeout: self.tick_timeout,
        }
    }
}

impl<M: MetricSource + 'static> Sampler<M> {
    pub fn new(source: M, store: Arc<dyn SampleStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source:       Arc::new(Mutex::new(source)),
            store,
            clock,
            interval:     DEFAULT_INTERVAL,
            tick_timeout: DEFAULT_TICK_TIMEOUT,
        }
    }

    pub fn with_interval(mut self, interval: Duration, tick_timeout: Duration) -> Self {
        self.interval = interval;
        self.tick_timeout = tick_timeout;
        self
    }

    /// Run one read-and-store cycle, bounded by the tick timeout.
    pub async fn tick(&self) -> Result<Sample> {
        match time::timeout(self.tick_timeout, self.cycle()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(MonitorError::Timeout(self.tick_timeout)),
        }
    }

    async fn cycle(&self) -> Result<Sample> {
        // Host reads may block, so they run on the blocking pool.
        let source = Arc::clone(&self.source);
        let value = task::spawn_blocking(move || {
            let mut source = source.lock().unwrap_or_else(PoisonError::into_inner);
            source.read()
        })
        .await
        .map_err(|e| MonitorError::TaskFailed(format!("metric read: {e}")))??;

        let now = self.clock.now();
        self.store.append(now, value).await
    }

    /// Spawn the sampling loop on the Tokio runtime.
    ///
    /// Ticks are scheduled at fixed intervals from the spawn instant; a cycle
    /// that overruns causes the missed ticks to be skipped, never run
    /// concurrently. Each cycle runs in its own task, so a panic is recorded
    /// as a failed tick. The loop exits once `shutdown` changes or its sender
    /// is dropped, after any in-flight cycle has completed.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> SamplerHandle {
        let (status_tx, status_rx) = watch::channel(SamplerStatus::default());

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Sampling CPU usage every {:?}", self.interval);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {}
                }

                // ── Cycle ────────────────────────────────────────────────────
                status_tx.send_modify(|s| s.state = SamplerState::Sampling);
                let sampler = self.clone();
                let outcome = match tokio::spawn(async move { sampler.tick().await }).await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(MonitorError::TaskFailed(format!("sampling cycle: {e}"))),
                };

                // ── Status ───────────────────────────────────────────────────
                status_tx.send_modify(|s| {
                    s.state = SamplerState::Idle;
                    s.ticks += 1;
                    match outcome {
                        Ok(sample) => {
                            debug!(id = sample.id, value = sample.value, "Stored CPU sample");
                            s.last_sample = Some(sample);
                        }
                        Err(e) => {
                            warn!("CPU sampling failed: {e}");
                            s.failures += 1;
                            s.last_error = Some(e.to_string());
                        }
                    }
                });
            }

            info!("Sampler stopped");
        });

        SamplerHandle { status: status_rx, task }
    }
}

/// Handle to a running sampler task.
pub struct SamplerHandle {
    status: watch::Receiver<SamplerStatus>,
    task:   JoinHandle<()>,
}

impl SamplerHandle {
    /// A receiver that observes every status update.
    pub fn status(&self) -> watch::Receiver<SamplerStatus> {
        self.status.clone()
    }

    /// Wait for the loop to exit after shutdown was signalled.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!("Sampler task ended abnormally: {e}");
        }
    }
}
