use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};

use crate::error::{MonitorError, Result};

/// Grouping key of an aggregated bucket.
///
/// Daily queries produce `Day` keys, hourly queries produce `Hour` keys; the
/// two never mix within one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    Day(NaiveDate),
    Hour { date: NaiveDate, hour: u32 },
}

impl BucketKey {
    /// Calendar date the bucket belongs to.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match *self {
            Self::Day(date) | Self::Hour { date, .. } => date,
        }
    }

    /// Day of month (1 – 31).
    #[must_use]
    pub fn day(&self) -> u32 {
        self.date().day()
    }

    /// Hour of day (0 – 23) for hourly buckets.
    #[must_use]
    pub fn hour(&self) -> Option<u32> {
        match *self {
            Self::Day(_) => None,
            Self::Hour { hour, .. } => Some(hour),
        }
    }
}

/// Min / max / mean of the sample values that fell into one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketSummary {
    pub key: BucketKey,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl BucketSummary {
    /// Build a summary, pulling a float-rounded mean back into `[min, max]`.
    #[must_use]
    pub fn new(key: BucketKey, min: f64, max: f64, avg: f64) -> Self {
        Self { key, min, max, avg: avg.max(min).min(max) }
    }
}

/// Inclusive timestamp bounds covering every second of the dates
/// `start ..= end`: `start 00:00:00` up to `(end + 1 day) 00:00:00 - 1s`.
pub fn day_bounds(start: NaiveDate, end: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let next = end
        .succ_opt()
        .ok_or_else(|| MonitorError::MalformedInput(format!("date {end} is out of range")))?;
    let upper = next.and_time(chrono::NaiveTime::MIN) - TimeDelta::seconds(1);
    Ok((start.and_time(chrono::NaiveTime::MIN), upper))
}
