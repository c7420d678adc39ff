//! Deadline evaluation rules.
//!
//! A deadline is a calendar date; it is only breached after the final instant
//! of that day (23:59:59.999 local time), never at day start. All arithmetic
//! here is calendar-day based and pure: callers read the clock once and pass
//! `now` in.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// Due-date bands used by listings and the notification rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineStatus {
    Overdue,
    DueToday,
    DueSoon,
    Safe,
}

impl DeadlineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeadlineStatus::Overdue => "overdue",
            DeadlineStatus::DueToday => "due today",
            DeadlineStatus::DueSoon => "due soon",
            DeadlineStatus::Safe => "safe",
        }
    }
}

/// Parse a deadline string: `YYYY-MM-DD`, a plain ISO datetime, or RFC 3339.
///
/// Anything unparsable (including the empty string) is treated as "no
/// deadline" rather than an error.
pub fn parse_deadline(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// True iff `now` is strictly past the end of the deadline's calendar day.
pub fn is_overdue(deadline: NaiveDate, now: NaiveDateTime) -> bool {
    match deadline.and_hms_milli_opt(23, 59, 59, 999) {
        Some(end_of_day) => now > end_of_day,
        None => false,
    }
}

/// Whole calendar days from `now`'s date to the deadline.
///
/// Midnight-aligned on both sides, so "due tomorrow" is 1 regardless of the
/// time of day. Negative once the deadline's day is in the past.
pub fn days_until_due(deadline: NaiveDate, now: NaiveDateTime) -> i64 {
    (deadline - now.date()).num_days()
}

/// Band an optional deadline relative to `now`. No deadline is `Safe`.
pub fn classify(deadline: Option<NaiveDate>, now: NaiveDateTime) -> DeadlineStatus {
    let Some(date) = deadline else {
        return DeadlineStatus::Safe;
    };
    if is_overdue(date, now) {
        return DeadlineStatus::Overdue;
    }
    match days_until_due(date, now) {
        0 => DeadlineStatus::DueToday,
        d if (1..=3).contains(&d) => DeadlineStatus::DueSoon,
        _ => DeadlineStatus::Safe,
    }
}

/// Deserialize a date field leniently: empty, missing, or unparsable strings
/// become `None` so one bad record cannot fail a whole database load.
pub fn lenient_date<'de, D>(de: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.as_deref().and_then(parse_deadline))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn parse_accepts_date_and_datetime_forms() {
        assert_eq!(parse_deadline("2024-03-15"), Some(date(2024, 3, 15)));
        assert_eq!(parse_deadline(" 2024-03-15 "), Some(date(2024, 3, 15)));
        assert_eq!(
            parse_deadline("2024-03-15T09:30:00"),
            Some(date(2024, 3, 15))
        );
        assert_eq!(
            parse_deadline("2024-03-15T09:30:00.250"),
            Some(date(2024, 3, 15))
        );
        assert_eq!(
            parse_deadline("2024-03-15T09:30:00+02:00"),
            Some(date(2024, 3, 15))
        );
    }

    #[test]
    fn parse_fails_closed() {
        assert_eq!(parse_deadline(""), None);
        assert_eq!(parse_deadline("soon"), None);
        assert_eq!(parse_deadline("15/03/2024"), None);
        assert_eq!(parse_deadline("2024-13-40"), None);
    }

    #[test]
    fn overdue_flips_at_end_of_day() {
        let deadline = date(2024, 1, 10);
        assert!(!is_overdue(deadline, at(2024, 1, 10, 0, 0)));
        assert!(!is_overdue(deadline, at(2024, 1, 10, 12, 0)));
        // Final tracked instant of the deadline day.
        let last = deadline.and_hms_milli_opt(23, 59, 59, 999).unwrap();
        assert!(!is_overdue(deadline, last));
        // First millisecond of the next day.
        let next = date(2024, 1, 11).and_hms_milli_opt(0, 0, 0, 0).unwrap();
        assert!(is_overdue(deadline, next));
        assert!(is_overdue(deadline, at(2024, 1, 11, 9, 0)));
    }

    #[test]
    fn days_until_is_calendar_based() {
        let now = at(2024, 1, 10, 23, 50);
        assert_eq!(days_until_due(date(2024, 1, 10), now), 0);
        assert_eq!(days_until_due(date(2024, 1, 11), now), 1);
        assert_eq!(days_until_due(date(2024, 1, 17), now), 7);
        assert_eq!(days_until_due(date(2024, 1, 6), now), -4);
    }

    #[test]
    fn classification_bands() {
        let now = at(2024, 1, 10, 10, 0);
        assert_eq!(classify(None, now), DeadlineStatus::Safe);
        assert_eq!(classify(Some(date(2024, 1, 9)), now), DeadlineStatus::Overdue);
        assert_eq!(
            classify(Some(date(2024, 1, 10)), now),
            DeadlineStatus::DueToday
        );
        assert_eq!(
            classify(Some(date(2024, 1, 13)), now),
            DeadlineStatus::DueSoon
        );
        assert_eq!(classify(Some(date(2024, 1, 14)), now), DeadlineStatus::Safe);
    }
}
