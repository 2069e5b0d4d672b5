use chrono::{DateTime, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// One timestamped CPU-utilization measurement, as held by a store.
///
/// Timestamps are local wall-clock time with whole-second resolution.
/// `value` is a percentage but is deliberately not clamped to `0.0 – 100.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Store-assigned identifier.
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// Drop the sub-second part of `ts`; stores keep whole seconds only.
#[must_use]
pub fn truncate_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Seconds between 1970-01-01T00:00:00 and `ts`, ignoring any timezone.
#[must_use]
pub fn to_epoch_seconds(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}

/// First whole epoch second at or after `ts`. Lower range bounds use this so
/// a fractional start never admits the second it falls inside.
#[must_use]
pub fn to_epoch_seconds_ceil(ts: NaiveDateTime) -> i64 {
    to_epoch_seconds(ts) + i64::from(ts.nanosecond() > 0)
}

/// Inverse of [`to_epoch_seconds`]. `None` if out of chrono's range.
#[must_use]
pub fn from_epoch_seconds(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32, milli: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 26)
            .unwrap()
            .and_hms_milli_opt(h, m, s, milli)
            .unwrap()
    }

    #[test]
    fn ceil_rounds_fractional_seconds_up() {
        let whole = to_epoch_seconds(at(4, 0, 0, 0));
        assert_eq!(to_epoch_seconds_ceil(at(4, 0, 0, 0)), whole);
        assert_eq!(to_epoch_seconds_ceil(at(4, 0, 0, 500)), whole + 1);
        assert_eq!(to_epoch_seconds(at(4, 0, 0, 500)), whole);
    }

    #[test]
    fn truncation_drops_fraction() {
        assert_eq!(truncate_to_second(at(4, 20, 15, 750)), at(4, 20, 15, 0));
    }

    #[test]
    fn epoch_seconds_are_wall_clock() {
        let ts = at(4, 20, 15, 0);
        let secs = to_epoch_seconds(ts);
        assert_eq!(secs % 86_400, 4 * 3600 + 20 * 60 + 15);
        assert_eq!(from_epoch_seconds(secs), Some(ts));
    }

    #[test]
    fn serializes_iso_timestamp() {
        let sample = Sample { id: 7, timestamp: at(4, 20, 15, 0), value: 30.5 };
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["timestamp"], "2024-05-26T04:20:15");
        assert_eq!(json["value"], 30.5);
    }
}
