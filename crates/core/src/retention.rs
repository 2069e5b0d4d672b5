use chrono::{Months, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MonitorError, Result};

/// Resolution a usage query is asked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Raw samples over a date-time range.
    Minute,
    /// Hourly buckets for a single date.
    Hour,
    /// Daily buckets over a date range.
    Day,
}

impl Granularity {
    /// Whether requests of this granularity are bounded by calendar date
    /// rather than by date-time.
    fn is_date_based(self) -> bool {
        !matches!(self, Self::Minute)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        })
    }
}

/// How far back a granularity may look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    Days(u32),
    Months(u32),
}

impl Lookback {
    /// `from` minus this lookback; `None` when it would leave chrono's range.
    fn before(self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Days(days) => from.checked_sub_signed(TimeDelta::days(i64::from(days))),
            Self::Months(months) => from.checked_sub_months(Months::new(months)),
        }
    }
}

/// Per-granularity retention windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub minute: Lookback,
    pub hour: Lookback,
    pub day: Lookback,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            minute: Lookback::Days(7),
            hour:   Lookback::Months(3),
            day:    Lookback::Months(12),
        }
    }
}

impl RetentionPolicy {
    #[must_use]
    pub fn window(&self, granularity: Granularity) -> Lookback {
        match granularity {
            Granularity::Minute => self.minute,
            Granularity::Hour => self.hour,
            Granularity::Day => self.day,
        }
    }

    /// Earliest start a `granularity` query may request at `now`.
    ///
    /// Date-based granularities get a cutoff at midnight of the cutoff date.
    #[must_use]
    pub fn cutoff(&self, granularity: Granularity, now: NaiveDateTime) -> NaiveDateTime {
        let Some(cutoff) = self.window(granularity).before(now) else {
            return NaiveDateTime::MIN;
        };
        if granularity.is_date_based() {
            cutoff.date().and_time(NaiveTime::MIN)
        } else {
            cutoff
        }
    }

    /// Reject `requested_start` if it is strictly earlier than the cutoff.
    pub fn validate(
        &self,
        granularity: Granularity,
        requested_start: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<()> {
        let cutoff = self.cutoff(granularity, now);
        let start = if granularity.is_date_based() {
            requested_start.date().and_time(NaiveTime::MIN)
        } else {
            requested_start
        };
        if start < cutoff {
            return Err(MonitorError::OutOfRetentionWindow { granularity, cutoff });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn now() -> NaiveDateTime {
        ts(2024, 5, 26, 12, 0, 0)
    }

    #[test]
    fn minute_window_is_seven_days_to_the_second() {
        let policy = RetentionPolicy::default();
        let bound = ts(2024, 5, 19, 12, 0, 0);

        assert!(policy.validate(Granularity::Minute, bound, now()).is_ok());
        let err = policy
            .validate(Granularity::Minute, bound - TimeDelta::seconds(1), now())
            .unwrap_err();
        match err {
            MonitorError::OutOfRetentionWindow { granularity, cutoff } => {
                assert_eq!(granularity, Granularity::Minute);
                assert_eq!(cutoff, bound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn minute_window_rejects_ten_days_accepts_six() {
        let policy = RetentionPolicy::default();
        let ten = now() - TimeDelta::days(10);
        let six = now() - TimeDelta::days(6);
        assert!(policy.validate(Granularity::Minute, ten, now()).is_err());
        assert!(policy.validate(Granularity::Minute, six, now()).is_ok());
    }

    #[test]
    fn hour_window_is_three_calendar_months() {
        let policy = RetentionPolicy::default();
        assert!(policy
            .validate(Granularity::Hour, ts(2024, 2, 26, 0, 0, 0), now())
            .is_ok());
        assert!(policy
            .validate(Granularity::Hour, ts(2024, 2, 25, 0, 0, 0), now())
            .is_err());
    }

    #[test]
    fn day_window_is_one_year() {
        let policy = RetentionPolicy::default();
        assert!(policy
            .validate(Granularity::Day, ts(2023, 5, 26, 0, 0, 0), now())
            .is_ok());
        assert!(policy
            .validate(Granularity::Day, ts(2023, 5, 25, 0, 0, 0), now())
            .is_err());
        assert_eq!(
            policy.cutoff(Granularity::Day, now()),
            ts(2023, 5, 26, 0, 0, 0)
        );
    }

    #[test]
    fn month_subtraction_clamps_to_month_end() {
        let policy = RetentionPolicy::default();
        let now = ts(2024, 5, 31, 8, 0, 0);
        assert_eq!(policy.cutoff(Granularity::Hour, now), ts(2024, 2, 29, 0, 0, 0));
    }

    #[test]
    fn custom_windows_apply() {
        let policy = RetentionPolicy {
            minute: Lookback::Days(1),
            hour: Lookback::Days(10),
            day: Lookback::Months(1),
        };
        assert!(policy
            .validate(Granularity::Minute, now() - TimeDelta::hours(25), now())
            .is_err());
        assert_eq!(
            policy.cutoff(Granularity::Hour, now()),
            ts(2024, 5, 16, 0, 0, 0)
        );
    }

    #[test]
    fn granularity_display_and_serde() {
        assert_eq!(Granularity::Hour.to_string(), "hour");
        let json = serde_json::to_string(&Granularity::Day).unwrap();
        assert_eq!(json, "\"day\"");
    }
}
