use crate::errors::HoursError;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoursMinutes {
    pub hours: i64,
    pub minutes: i64,
}

impl HoursMinutes {
    pub fn from_minutes(total: i64) -> Self {
        Self {
            hours: total / 60,
            minutes: total % 60,
        }
    }

    pub fn label(&self) -> String {
        format!("{}h {}m", self.hours, self.minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftHours {
    pub elapsed: HoursMinutes,
    pub after_break: HoursMinutes,
    pub rounded_hours: f64,
}

impl ShiftHours {
    pub fn zero() -> Self {
        Self::from_minutes(0, 0)
    }

    fn from_minutes(elapsed: i64, after_break: i64) -> Self {
        let decimal = after_break as f64 / 60.0;
        Self {
            elapsed: HoursMinutes::from_minutes(elapsed),
            after_break: HoursMinutes::from_minutes(after_break),
            // Quarter hours, always truncated downwards.
            rounded_hours: (decimal * 4.0).floor() / 4.0,
        }
    }

    pub fn rounded_label(&self) -> String {
        format!("{:.2}h", self.rounded_hours)
    }
}

pub fn parse_clock(field: &'static str, raw: &str) -> Result<Option<NaiveTime>, HoursError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map(Some)
        .map_err(|_| HoursError::InvalidClock {
            field,
            value: raw.to_string(),
        })
}

/// Lenient integer read of the break field; anything unparsable is no break.
pub fn parse_break_minutes(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(0)
}

/// Worked time between two wall-clock times. An end earlier than the start
/// is taken to fall on the next day. Missing either time yields zeros.
pub fn calculate(start: Option<NaiveTime>, end: Option<NaiveTime>, break_minutes: i64) -> ShiftHours {
    let (Some(start), Some(end)) = (start, end) else {
        return ShiftHours::zero();
    };

    let minute_of_day = |time: NaiveTime| i64::from(time.hour() * 60 + time.minute());
    let elapsed = (minute_of_day(end) - minute_of_day(start)).rem_euclid(MINUTES_PER_DAY);
    let after_break = elapsed.saturating_sub(break_minutes).max(0);

    ShiftHours::from_minutes(elapsed, after_break)
}

/// Parses the raw form fields and calculates.
pub fn calculate_from_fields(start: &str, end: &str, break_minutes: &str) -> Result<ShiftHours, HoursError> {
    let start = parse_clock("start", start)?;
    let end = parse_clock("end", end)?;
    Ok(calculate(start, end, parse_break_minutes(break_minutes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(hour, minute, 0)
    }

    #[test]
    fn day_shift_rounds_down_to_quarter_hour() {
        let result = calculate(at(9, 0), at(17, 10), 30);
        assert_eq!(result.elapsed, HoursMinutes { hours: 8, minutes: 10 });
        assert_eq!(result.after_break, HoursMinutes { hours: 7, minutes: 40 });
        assert_eq!(result.rounded_hours, 7.5);
        assert_eq!(result.rounded_label(), "7.50h");
    }

    #[test]
    fn overnight_shift_wraps_to_next_day() {
        let result = calculate(at(22, 0), at(6, 0), 0);
        assert_eq!(result.elapsed.label(), "8h 0m");
        assert_eq!(result.rounded_hours, 8.0);
    }

    #[test]
    fn break_longer_than_shift_clamps_to_zero() {
        let result = calculate(at(12, 0), at(12, 20), 45);
        assert_eq!(result.after_break, HoursMinutes { hours: 0, minutes: 0 });
        assert_eq!(result.rounded_hours, 0.0);
    }

    #[test]
    fn missing_time_yields_zero() {
        assert_eq!(calculate(None, at(17, 0), 0), ShiftHours::zero());
        assert_eq!(calculate(at(9, 0), None, 15), ShiftHours::zero());
    }

    #[test]
    fn rounded_hours_never_exceed_worked_time() {
        for end_minute in 0..60 {
            let result = calculate(at(8, 0), at(16, end_minute), 0);
            let worked = (8 * 60 + i64::from(end_minute)) as f64 / 60.0;
            assert!(result.rounded_hours <= worked);
            assert_eq!((result.rounded_hours * 4.0).fract(), 0.0);
        }
    }

    #[test]
    fn extreme_break_values_do_not_overflow() {
        let huge_negative = calculate_from_fields("09:00", "17:00", &i64::MIN.to_string()).unwrap();
        assert_eq!(huge_negative.elapsed, HoursMinutes { hours: 8, minutes: 0 });
        assert!(huge_negative.after_break.hours >= 8);

        let huge = calculate(at(9, 0), at(17, 0), i64::MAX);
        assert_eq!(huge.after_break, HoursMinutes { hours: 0, minutes: 0 });
        assert_eq!(huge.rounded_hours, 0.0);
    }

    #[test]
    fn parses_form_fields() {
        let result = calculate_from_fields("09:00", "17:10", "30").unwrap();
        assert_eq!(result.rounded_hours, 7.5);

        let result = calculate_from_fields("09:00", "17:00", "lunch").unwrap();
        assert_eq!(result.rounded_hours, 8.0);

        assert_eq!(calculate_from_fields("", "17:00", "").unwrap(), ShiftHours::zero());
        assert!(matches!(
            calculate_from_fields("9am", "17:00", ""),
            Err(HoursError::InvalidClock { field: "start", .. })
        ));
    }
}
