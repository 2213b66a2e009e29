//! Attendance policy: the time boundaries scans are classified against.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Default opening time (07:00).
pub const DEFAULT_ARRIVAL_WINDOW_START: NaiveTime = hms(7, 0);
/// Default on-time arrival boundary (07:15).
pub const DEFAULT_ARRIVAL_WINDOW_END: NaiveTime = hms(7, 15);
/// Default departure boundary (16:00).
pub const DEFAULT_DEPARTURE_WINDOW_END: NaiveTime = hms(16, 0);

const fn hms(hour: u32, minute: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, minute, 0) {
        Some(time) => time,
        None => panic!("invalid policy constant"),
    }
}

/// The institution-wide attendance policy.
///
/// There is at most one policy; stores create it with [`Default`] values on
/// first access and only administrative updates change it afterwards. Events
/// keep the timeliness computed when they were recorded, so an update never
/// rewrites history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendancePolicy {
    /// Official opening time. Informational; the classifier does not consult it.
    pub arrival_window_start: NaiveTime,
    /// Arrivals strictly after this time are late.
    pub arrival_window_end: NaiveTime,
    /// Departures strictly after this time are flagged late.
    pub departure_window_end: NaiveTime,
    /// Whether a departure needs a same-day arrival first.
    pub require_arrival_before_departure: bool,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            arrival_window_start: DEFAULT_ARRIVAL_WINDOW_START,
            arrival_window_end: DEFAULT_ARRIVAL_WINDOW_END,
            departure_window_end: DEFAULT_DEPARTURE_WINDOW_END,
            require_arrival_before_departure: true,
        }
    }
}

/// Inclusive timestamp range covering one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBucket {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DayBucket {
    /// The bucket for `date`, from midnight to the last representable
    /// microsecond of the day.
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            start: date.and_time(hms(0, 0)),
            end: date.and_time(last_instant_of_day()),
        }
    }

    /// The bucket containing `at`.
    #[must_use]
    pub fn containing(at: NaiveDateTime) -> Self {
        Self::for_date(at.date())
    }

    /// Whether `at` falls inside the bucket.
    #[must_use]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Inclusive range spanning several whole days.
#[must_use]
pub fn date_range_bounds(first: NaiveDate, last: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    (
        DayBucket::for_date(first).start,
        DayBucket::for_date(last).end,
    )
}

// Stores keep microsecond precision, so this is the last stored instant.
const fn last_instant_of_day() -> NaiveTime {
    match NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999) {
        Some(time) => time,
        None => panic!("invalid end of day"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_institution_defaults() {
        let policy = AttendancePolicy::default();
        assert_eq!(policy.arrival_window_start.to_string(), "07:00:00");
        assert_eq!(policy.arrival_window_end.to_string(), "07:15:00");
        assert_eq!(policy.departure_window_end.to_string(), "16:00:00");
        assert!(policy.require_arrival_before_departure);
    }

    #[test]
    fn day_bucket_covers_whole_day_inclusively() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let bucket = DayBucket::for_date(date);

        assert!(bucket.contains(date.and_hms_opt(0, 0, 0).unwrap()));
        assert!(bucket.contains(date.and_hms_micro_opt(23, 59, 59, 999_999).unwrap()));

        let next_day = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        assert!(!bucket.contains(next_day.and_hms_opt(0, 0, 0).unwrap()));

        let previous = NaiveDate::from_ymd_opt(2025, 3, 2)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert!(!bucket.contains(previous));
    }

    #[test]
    fn containing_uses_the_timestamp_date() {
        let at = NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(16, 30, 0)
            .unwrap();
        assert_eq!(DayBucket::containing(at), DayBucket::for_date(at.date()));
    }

    #[test]
    fn policy_serializes_times_as_clock_strings() {
        let json = serde_json::to_value(AttendancePolicy::default()).unwrap();
        assert_eq!(json["arrival_window_end"], "07:15:00");
        assert_eq!(json["departure_window_end"], "16:00:00");
        assert_eq!(json["require_arrival_before_departure"], true);
    }
}
