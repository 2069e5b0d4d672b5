//! Grouped min / max / mean reduction over already-filtered samples.

use chrono::Timelike;
use std::collections::BTreeMap;

use crate::bucket::{BucketKey, BucketSummary};
use crate::sample::Sample;

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: u64,
}

impl Accumulator {
    fn new(value: f64) -> Self {
        Self { min: value, max: value, sum: value, count: 1 }
    }

    fn push(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }

    fn finish(self, key: BucketKey) -> BucketSummary {
        BucketSummary::new(key, self.min, self.max, self.sum / self.count as f64)
    }
}

/// Group by `key`, one summary per non-empty group, ascending by key.
pub fn group_by<F>(samples: &[Sample], key: F) -> Vec<BucketSummary>
where
    F: Fn(&Sample) -> BucketKey,
{
    let mut groups: BTreeMap<BucketKey, Accumulator> = BTreeMap::new();
    for sample in samples {
        groups
            .entry(key(sample))
            .and_modify(|acc| acc.push(sample.value))
            .or_insert_with(|| Accumulator::new(sample.value));
    }
    groups.into_iter().map(|(k, acc)| acc.finish(k)).collect()
}

/// Buckets keyed by `(date, hour-of-day)`.
pub fn hourly(samples: &[Sample]) -> Vec<BucketSummary> {
    group_by(samples, |s| BucketKey::Hour {
        date: s.timestamp.date(),
        hour: s.timestamp.hour(),
    })
}

/// Buckets keyed by calendar date.
pub fn daily(samples: &[Sample]) -> Vec<BucketSummary> {
    group_by(samples, |s| BucketKey::Day(s.timestamp.date()))
}
