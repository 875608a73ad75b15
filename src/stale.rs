use chrono::{Duration, Utc};
use std::fmt;

/// Saved sessions older than this many hours trigger the "still saved" prompt.
pub const STALE_AFTER_HOURS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleAge {
    EarlierToday,
    OneHour,
    Hours(i64),
    Days(i64),
}

impl StaleAge {
    pub fn from_age(age: Duration) -> Self {
        let hours = age.num_hours();
        match hours {
            h if h < 1 => StaleAge::EarlierToday,
            1 => StaleAge::OneHour,
            h if h < 24 => StaleAge::Hours(h),
            h => StaleAge::Days(h / 24),
        }
    }
}

impl fmt::Display for StaleAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleAge::EarlierToday => f.write_str("Data from earlier today is still saved"),
            StaleAge::OneHour => f.write_str("Data from 1 hour ago is still saved"),
            StaleAge::Hours(hours) => write!(f, "Data from {hours} hours ago is still saved"),
            StaleAge::Days(1) => f.write_str("Data from 1 day ago is still saved"),
            StaleAge::Days(days) => write!(f, "Data from {days} days ago is still saved"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleNotice {
    pub age: Duration,
    pub bucket: StaleAge,
}

pub fn check(session_start_ms: Option<i64>) -> Option<StaleNotice> {
    check_at(session_start_ms, Utc::now().timestamp_millis())
}

pub fn check_at(session_start_ms: Option<i64>, now_ms: i64) -> Option<StaleNotice> {
    let age = Duration::try_milliseconds(now_ms.saturating_sub(session_start_ms?))?;
    if age <= Duration::hours(STALE_AFTER_HOURS) {
        return None;
    }
    Some(StaleNotice {
        age,
        bucket: StaleAge::from_age(age),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries() {
        let bucket = |minutes| StaleAge::from_age(Duration::minutes(minutes)).to_string();

        assert_eq!(bucket(59), "Data from earlier today is still saved");
        assert_eq!(bucket(61), "Data from 1 hour ago is still saved");
        assert_eq!(bucket(119), "Data from 1 hour ago is still saved");
        assert_eq!(bucket(120), "Data from 2 hours ago is still saved");
        assert_eq!(bucket(23 * 60 + 59), "Data from 23 hours ago is still saved");
        assert_eq!(bucket(25 * 60), "Data from 1 day ago is still saved");
        assert_eq!(bucket(49 * 60), "Data from 2 days ago is still saved");
    }

    #[test]
    fn prompts_only_past_two_hours() {
        let now = 10 * 60 * 60 * 1000;
        let two_hours = Duration::hours(STALE_AFTER_HOURS).num_milliseconds();

        assert_eq!(check_at(None, now), None);
        assert_eq!(check_at(Some(now - two_hours), now), None);

        let notice = check_at(Some(now - two_hours - 1), now).expect("stale");
        assert_eq!(notice.bucket, StaleAge::Hours(2));
    }

    #[test]
    fn corrupt_start_times_do_not_overflow() {
        let now = 1_700_000_000_000;
        let ancient = check_at(Some(i64::MIN), now).expect("stale");
        assert!(matches!(ancient.bucket, StaleAge::Days(days) if days > 0));
        assert_eq!(check_at(Some(i64::MAX), now), None);
    }
}
