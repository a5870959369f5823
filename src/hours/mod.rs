//! Business-hours resolution.
//!
//! Evaluates a location's free-text hour strings (`"11 am–10 pm"`,
//! `"4–10 pm"`, `"Closed"`) into an open/closed decision for an arbitrary
//! instant. Total and side-effect-free: every failure path (missing entry,
//! unparseable string) yields `false`, never an error.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::HourEntry;

/// Civil timezone of all locations, as a fixed UTC-7 offset. This is PDT
/// only; during Pacific standard time (roughly November-March) the true
/// offset is UTC-8, so evaluations run an hour ahead. Inherited from the
/// source data's fixtures; do not change without re-baselining them.
const PACIFIC_OFFSET_SECS: i32 = -7 * 3600;

/// Before this civil time of day, a missing entry for the target date falls
/// back to the previous date, so the tail of an overnight window that
/// started the prior calendar day is classified correctly.
const OVERNIGHT_LOOKBACK_CUTOFF: u32 = 6 * 60;

/// Full form: independent meridiem on each side, e.g. "11 am–10 pm".
static FULL_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)\s*[–-]\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)\s*$")
        .expect("full range pattern")
});

/// Elided form: only the end carries a meridiem, e.g. "4–10 pm".
static ELIDED_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,2})(?::(\d{2}))?\s*[–-]\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)\s*$")
        .expect("elided range pattern")
});

/// Is the location open at the given ISO calendar date and time of day
/// (minutes since local midnight)?
pub fn is_open_at(entries: &[HourEntry], target_date: &str, minutes: u32) -> bool {
    let entry = match find_entry(entries, target_date) {
        Some(e) => Some(e),
        // No data for the target date: early-morning instants may belong to
        // an overnight window opened the previous calendar day.
        None if minutes < OVERNIGHT_LOOKBACK_CUTOFF => {
            previous_date(target_date).and_then(|d| find_entry(entries, &d))
        }
        None => None,
    };

    match entry {
        Some(entry) => is_open_for_hours(&entry.hours, minutes),
        // No data means assume closed. Policy, not a data error.
        None => false,
    }
}

/// Is the location open at the given instant, evaluated in the fixed-offset
/// Pacific civil time? The instant is an explicit parameter so evaluation
/// stays deterministic and testable.
pub fn is_open_now(entries: &[HourEntry], now: DateTime<Utc>) -> bool {
    let offset = FixedOffset::east_opt(PACIFIC_OFFSET_SECS).expect("pacific offset");
    let civil = now.with_timezone(&offset);
    let minutes = civil.hour() * 60 + civil.minute();
    let date = format!(
        "{:04}-{:02}-{:02}",
        civil.year(),
        civil.month(),
        civil.day()
    );
    is_open_at(entries, &date, minutes)
}

/// Evaluate one hours string against a time of day. Both boundaries are
/// inclusive: a location is still open at the instant of closing.
fn is_open_for_hours(hours: &str, minutes: u32) -> bool {
    if hours.to_lowercase().contains("closed") {
        return false;
    }

    let Some((start, end)) = parse_range(hours) else {
        return false;
    };

    if end < start {
        // Range crosses midnight, e.g. 23:00-02:00.
        minutes >= start || minutes <= end
    } else {
        minutes >= start && minutes <= end
    }
}

/// Parse an hours string into (start, end) minutes since midnight.
///
/// The elided form's start inherits the end's meridiem; when that reading
/// would place the start after the end, the start flips to the other
/// meridiem, so "11–2 pm" reads as 11:00-14:00 and "9–2 am" as 21:00-02:00.
/// Noon-crossing elided inputs are inherently ambiguous; this choice is
/// preserved from the source data, not asserted correct.
fn parse_range(hours: &str) -> Option<(u32, u32)> {
    if let Some(caps) = FULL_RANGE.captures(hours) {
        let start = to_minutes(&caps[1], caps.get(2).map(|m| m.as_str()), &caps[3])?;
        let end = to_minutes(&caps[4], caps.get(5).map(|m| m.as_str()), &caps[6])?;
        return Some((start, end));
    }

    if let Some(caps) = ELIDED_RANGE.captures(hours) {
        let meridiem = caps[5].to_string();
        let end = to_minutes(&caps[3], caps.get(4).map(|m| m.as_str()), &meridiem)?;
        let inherited = to_minutes(&caps[1], caps.get(2).map(|m| m.as_str()), &meridiem)?;
        let start = if inherited > end {
            let other = if meridiem.eq_ignore_ascii_case("pm") {
                "am"
            } else {
                "pm"
            };
            to_minutes(&caps[1], caps.get(2).map(|m| m.as_str()), other)?
        } else {
            inherited
        };
        return Some((start, end));
    }

    None
}

/// Convert hour/minute/meridiem captures to minutes since midnight in
/// 24-hour form (12 am -> 0, pm adds 12 unless already 12).
fn to_minutes(hour: &str, minute: Option<&str>, meridiem: &str) -> Option<u32> {
    let mut hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.unwrap_or("0").parse().ok()?;
    if hour == 0 || hour > 12 || minute > 59 {
        return None;
    }

    let pm = meridiem.eq_ignore_ascii_case("pm");
    if pm && hour != 12 {
        hour += 12;
    } else if !pm && hour == 12 {
        hour = 0;
    }

    Some(hour * 60 + minute)
}

fn find_entry<'a>(entries: &'a [HourEntry], date: &str) -> Option<&'a HourEntry> {
    entries.iter().find(|e| e.full_date == date)
}

fn previous_date(date: &str) -> Option<String> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let previous = parsed.checked_sub_days(Days::new(1))?;
    Some(previous.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(full_date: &str, hours: &str) -> HourEntry {
        HourEntry {
            day_of_week: "Tue".to_string(),
            date: "Sep 30".to_string(),
            hours: hours.to_string(),
            full_date: full_date.to_string(),
        }
    }

    #[test]
    fn test_closed_literal_any_case() {
        let entries = vec![entry("2025-09-30", "CLOSED")];
        assert!(!is_open_at(&entries, "2025-09-30", 12 * 60));

        let entries = vec![entry("2025-09-30", "Closed for private event")];
        assert!(!is_open_at(&entries, "2025-09-30", 12 * 60));
    }

    #[test]
    fn test_no_entry_for_date() {
        let entries = vec![entry("2025-09-29", "11 am–10 pm")];
        assert!(!is_open_at(&entries, "2025-09-30", 15 * 60));
    }

    #[test]
    fn test_standard_range_boundaries() {
        let entries = vec![entry("2025-09-30", "11 am–10 pm")];
        assert!(!is_open_at(&entries, "2025-09-30", 10 * 60 + 59));
        assert!(is_open_at(&entries, "2025-09-30", 11 * 60));
        assert!(is_open_at(&entries, "2025-09-30", 15 * 60));
        assert!(is_open_at(&entries, "2025-09-30", 22 * 60));
        assert!(!is_open_at(&entries, "2025-09-30", 22 * 60 + 1));
    }

    #[test]
    fn test_range_with_minutes() {
        let entries = vec![entry("2025-09-30", "11:30 am–9:30 pm")];
        assert!(!is_open_at(&entries, "2025-09-30", 11 * 60 + 29));
        assert!(is_open_at(&entries, "2025-09-30", 14 * 60 + 15));
        assert!(is_open_at(&entries, "2025-09-30", 21 * 60 + 30));
    }

    #[test]
    fn test_overnight_range() {
        let entries = vec![entry("2025-10-03", "11 pm–2 am")];
        assert!(is_open_at(&entries, "2025-10-03", 23 * 60 + 30));
        assert!(!is_open_at(&entries, "2025-10-03", 15 * 60));
    }

    #[test]
    fn test_overnight_tail_next_day_lookup() {
        let entries = vec![entry("2025-10-03", "11 pm–2 am")];
        // 1:30 am on the next calendar date: no entry for the 4th, so the
        // previous day's window applies.
        assert!(is_open_at(&entries, "2025-10-04", 1 * 60 + 30));
        // Past the end of the window.
        assert!(!is_open_at(&entries, "2025-10-04", 2 * 60 + 1));
        // The lookback only applies before 6 am.
        assert!(!is_open_at(&entries, "2025-10-04", 7 * 60));
    }

    #[test]
    fn test_next_day_entry_takes_precedence() {
        let entries = vec![
            entry("2025-10-03", "11 pm–2 am"),
            entry("2025-10-04", "Closed"),
        ];
        assert!(!is_open_at(&entries, "2025-10-04", 1 * 60 + 30));
    }

    #[test]
    fn test_elided_meridiem_inherited() {
        let entries = vec![entry("2025-09-30", "4–10 pm")];
        assert!(is_open_at(&entries, "2025-09-30", 18 * 60));
        assert!(!is_open_at(&entries, "2025-09-30", 12 * 60));
    }

    #[test]
    fn test_elided_noon_crossing() {
        // Ambiguous input: reads as 11:00-14:00, not 23:00-14:00.
        let entries = vec![entry("2025-09-30", "11–2 pm")];
        assert!(is_open_at(&entries, "2025-09-30", 12 * 60));
        assert!(!is_open_at(&entries, "2025-09-30", 23 * 60 + 30));
    }

    #[test]
    fn test_elided_overnight() {
        let entries = vec![entry("2025-09-30", "9–2 am")];
        assert!(is_open_at(&entries, "2025-09-30", 23 * 60));
        assert!(is_open_at(&entries, "2025-09-30", 1 * 60));
        assert!(!is_open_at(&entries, "2025-09-30", 12 * 60));
    }

    #[test]
    fn test_hyphen_and_spacing_variants() {
        let entries = vec![entry("2025-09-30", "11 am - 10 pm")];
        assert!(is_open_at(&entries, "2025-09-30", 15 * 60));

        let entries = vec![entry("2025-09-30", "11am–10pm")];
        assert!(is_open_at(&entries, "2025-09-30", 15 * 60));
    }

    #[test]
    fn test_noon_and_midnight_conversion() {
        let entries = vec![entry("2025-09-30", "12 pm–12 am")];
        assert!(is_open_at(&entries, "2025-09-30", 12 * 60));
        assert!(is_open_at(&entries, "2025-09-30", 23 * 60));
        // end < start, so the range wraps and midnight itself is included.
        assert!(is_open_at(&entries, "2025-09-30", 0));
        assert!(!is_open_at(&entries, "2025-09-30", 6 * 60));
    }

    #[test]
    fn test_malformed_hours() {
        for bad in ["Invalid format", "11 am–", "call us", "25 am–3 pm", ""] {
            let entries = vec![entry("2025-09-30", bad)];
            assert!(!is_open_at(&entries, "2025-09-30", 15 * 60), "{:?}", bad);
        }
    }

    #[test]
    fn test_is_open_now_fixed_offset() {
        let entries = vec![entry("2025-09-30", "11 am–10 pm")];

        // 22:00 UTC is 15:00 at UTC-7: open.
        let now = Utc.with_ymd_and_hms(2025, 9, 30, 22, 0, 0).unwrap();
        assert!(is_open_now(&entries, now));

        // 16:00 UTC is 09:00 at UTC-7: before opening.
        let now = Utc.with_ymd_and_hms(2025, 9, 30, 16, 0, 0).unwrap();
        assert!(!is_open_now(&entries, now));

        // 06:00 UTC next day is 23:00 at UTC-7: after closing.
        let now = Utc.with_ymd_and_hms(2025, 10, 1, 6, 0, 0).unwrap();
        assert!(!is_open_now(&entries, now));
    }

    #[test]
    fn test_is_open_now_overnight_tail() {
        let entries = vec![entry("2025-10-03", "11 pm–2 am")];
        // 07:30 UTC on the 4th is 00:30 at UTC-7 on the 4th; the window
        // opened on the 3rd.
        let now = Utc.with_ymd_and_hms(2025, 10, 4, 7, 30, 0).unwrap();
        assert!(is_open_now(&entries, now));
    }

    #[test]
    fn test_empty_entries() {
        assert!(!is_open_at(&[], "2025-09-30", 12 * 60));
        let now = Utc.with_ymd_and_hms(2025, 9, 30, 22, 0, 0).unwrap();
        assert!(!is_open_now(&[], now));
    }
}
