use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::RwLock;

use crate::aggregate;
use crate::bucket::{day_bounds, BucketSummary};
use crate::error::Result;
use crate::sample::{truncate_to_second, Sample};

/// Append-only persistence of CPU samples.
///
/// Implementations must make each `append` visible atomically: a concurrent
/// reader sees the whole sample or nothing. The aggregation methods have
/// default bodies that reduce a range scan in memory; a backend with native
/// grouping may override them as long as the output is the same.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Insert one sample and return it with its assigned id.
    async fn append(&self, timestamp: NaiveDateTime, value: f64) -> Result<Sample>;

    /// Samples with `start <= timestamp <= end`, ascending by timestamp.
    async fn range(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<Sample>>;

    /// Hourly buckets for the samples taken on `date`.
    async fn hourly_aggregate(&self, date: NaiveDate) -> Result<Vec<BucketSummary>> {
        let (lo, hi) = day_bounds(date, date)?;
        let samples = self.range(lo, hi).await?;
        Ok(aggregate::hourly(&samples))
    }

    /// Daily buckets for the samples taken on `start ..= end`.
    async fn daily_aggregate(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<BucketSummary>> {
        let (lo, hi) = day_bounds(start, end)?;
        let samples = self.range(lo, hi).await?;
        Ok(aggregate::daily(&samples))
    }
}

/// Volatile store backed by a vector. Used by `--in-memory` and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    samples: RwLock<Vec<Sample>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.samples.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.samples.read().await.is_empty()
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn append(&self, timestamp: NaiveDateTime, value: f64) -> Result<Sample> {
        let mut samples = self.samples.write().await;
        let sample = Sample {
            id: samples.len() as i64 + 1,
            timestamp: truncate_to_second(timestamp),
            value,
        };
        samples.push(sample.clone());
        Ok(sample)
    }

    async fn range(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<Sample>> {
        let mut hits: Vec<Sample> = self
            .samples
            .read()
            .await
            .iter()
            .filter(|s| start <= s.timestamp && s.timestamp <= end)
            .cloned()
            .collect();
        // stable: ties keep insertion order
        hits.sort_by_key(|s| s.timestamp);
        Ok(hits)
    }
}
