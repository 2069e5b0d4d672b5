//! Query path: retention check first, then the store.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::bucket::BucketSummary;
use crate::clock::Clock;
use crate::error::Result;
use crate::retention::{Granularity, RetentionPolicy};
use crate::sample::Sample;
use crate::store::SampleStore;

/// Answers minute / hour / day usage queries over a [`SampleStore`].
#[derive(Clone)]
pub struct UsageService {
    store: Arc<dyn SampleStore>,
    policy: RetentionPolicy,
    clock: Arc<dyn Clock>,
}

impl UsageService {
    pub fn new(store: Arc<dyn SampleStore>, policy: RetentionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { store, policy, clock }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Raw samples between `start` and `end`, both inclusive.
    #[instrument(skip(self))]
    pub async fn minute_usage(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<Sample>> {
        self.policy.validate(Granularity::Minute, start, self.clock.now())?;
        let samples = self.store.range(start, end).await?;
        debug!(count = samples.len(), "minute usage");
        Ok(samples)
    }

    /// Hourly min / max / avg for one date.
    #[instrument(skip(self))]
    pub async fn hourly_usage(&self, date: NaiveDate) -> Result<Vec<BucketSummary>> {
        self.policy
            .validate(Granularity::Hour, date.and_time(NaiveTime::MIN), self.clock.now())?;
        let buckets = self.store.hourly_aggregate(date).await?;
        debug!(count = buckets.len(), "hourly usage");
        Ok(buckets)
    }

    /// Daily min / max / avg for the dates `start ..= end`.
    #[instrument(skip(self))]
    pub async fn daily_usage(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<BucketSummary>> {
        self.policy
            .validate(Granularity::Day, start.and_time(NaiveTime::MIN), self.clock.now())?;
        let buckets = self.store.daily_aggregate(start, end).await?;
        debug!(count = buckets.len(), "daily usage");
        Ok(buckets)
    }
}
