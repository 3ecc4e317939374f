//! Tenant-local slot arithmetic for the auto-scheduler. Pure functions over
//! chrono/chrono-tz; all I/O stays in the activities.
//!
//! Slot matching is exact `HH:MM` string equality against a 60-second tick.
//! A minute-granularity tick is the contract; a missed tick skips the slot.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// "Now" projected into a tenant's timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSlot {
    /// Local wall-clock minute, zero-padded `HH:MM`.
    pub hhmm: String,
    /// 0 = Sunday … 6 = Saturday.
    pub day_of_week: u8,
    pub date: NaiveDate,
}

pub fn parse_timezone(tz: &str) -> Result<Tz> {
    tz.parse::<Tz>()
        .map_err(|e| anyhow!("invalid timezone {tz:?}: {e}"))
}

pub fn local_slot(now: DateTime<Utc>, tz: Tz) -> LocalSlot {
    let local = now.with_timezone(&tz);
    LocalSlot {
        hhmm: format!("{:02}:{:02}", local.hour(), local.minute()),
        day_of_week: local.weekday().num_days_from_sunday() as u8,
        date: local.date_naive(),
    }
}

pub fn matches_slot(slot: &LocalSlot, days_of_week: &[i16], preferred_times: &[String]) -> bool {
    days_of_week.contains(&(slot.day_of_week as i16))
        && preferred_times.iter().any(|t| t == &slot.hhmm)
}

/// UTC bounds of a tenant-local calendar day, for the daily quota count.
pub fn local_day_bounds(date: NaiveDate, tz: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    Ok((day_start(date, tz)?, day_start(next_day(date)?, tz)?))
}

/// UTC bounds of the tenant-local minute the slot falls in, for the
/// duplicate-tick guard.
pub fn local_minute_bounds(
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let local = now.with_timezone(&tz);
    let start = local
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .ok_or_else(|| anyhow!("failed to truncate {local} to the minute"))?;
    Ok((
        start.with_timezone(&Utc),
        start.with_timezone(&Utc) + chrono::Duration::minutes(1),
    ))
}

fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(1))
        .ok_or_else(|| anyhow!("date overflow past {date}"))
}

fn day_start(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid midnight for {date}"))?;
    // On DST spring-forward days midnight may not exist; take the earliest
    // valid local instant.
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + chrono::Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("no valid local midnight for {date} in {tz}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_slot_converts_timezone_and_weekday() {
        // 2026-03-04 14:30 UTC is a Wednesday, 09:30 in New York (EST).
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 14, 30, 0).unwrap();
        let tz = parse_timezone("America/New_York").unwrap();
        let slot = local_slot(now, tz);
        assert_eq!(slot.hhmm, "09:30");
        assert_eq!(slot.day_of_week, 3);
        assert_eq!(slot.date, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
    }

    #[test]
    fn utc_midnight_crossing_shifts_local_date() {
        // 01:00 UTC Thursday is still 20:00 Wednesday in New York.
        let now = Utc.with_ymd_and_hms(2026, 3, 5, 1, 0, 0).unwrap();
        let tz = parse_timezone("America/New_York").unwrap();
        let slot = local_slot(now, tz);
        assert_eq!(slot.hhmm, "20:00");
        assert_eq!(slot.day_of_week, 3);
        assert_eq!(slot.date, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
    }

    #[test]
    fn slot_matching_is_exact() {
        let slot = LocalSlot {
            hhmm: "09:30".to_string(),
            day_of_week: 3,
            date: NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
        };
        let times = vec!["09:30".to_string(), "17:00".to_string()];

        assert!(matches_slot(&slot, &[1, 2, 3, 4, 5], &times));
        // Wrong day.
        assert!(!matches_slot(&slot, &[0, 6], &times));
        // One minute off does not match.
        let off = LocalSlot {
            hhmm: "09:31".to_string(),
            ..slot
        };
        assert!(!matches_slot(&off, &[1, 2, 3, 4, 5], &times));
        assert!(!matches_slot(&slot, &[1, 2, 3, 4, 5], &[]));
    }

    #[test]
    fn day_bounds_span_one_local_day() {
        let tz = parse_timezone("America/New_York").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        let (start, end) = local_day_bounds(date, tz).unwrap();
        // EST is UTC-5: local midnight is 05:00 UTC.
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 4, 5, 0, 0).unwrap());
        assert_eq!(end - start, chrono::Duration::hours(24));
    }

    #[test]
    fn minute_bounds_cover_the_current_minute() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 14, 30, 42).unwrap();
        let (start, end) = local_minute_bounds(now, chrono_tz::UTC).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 4, 14, 30, 0).unwrap());
        assert_eq!(end - start, chrono::Duration::minutes(1));
    }

    #[test]
    fn bad_timezone_is_rejected() {
        assert!(parse_timezone("Mars/Olympus_Mons").is_err());
    }
}
