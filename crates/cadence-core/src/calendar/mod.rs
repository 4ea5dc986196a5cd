//! Calendar arithmetic for program days.
//!
//! Everything here works on calendar dates ([`NaiveDate`]), never on
//! instants. Callers convert instants with [`to_calendar_date`] using the
//! single reference offset from configuration before doing any math, so two
//! callers in different time zones always agree on the day count.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc, Weekday};

/// True for Monday through Friday.
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Whether `date` is a day on which a program can be "on".
pub fn is_program_day(date: NaiveDate, include_weekends: bool) -> bool {
    include_weekends || is_weekday(date)
}

/// Normalize a UTC instant to a calendar date in the reference zone.
pub fn to_calendar_date(instant: DateTime<Utc>, zone: FixedOffset) -> NaiveDate {
    instant.with_timezone(&zone).date_naive()
}

/// Elapsed program days from `start` up to (not including) `as_of`.
///
/// Returns 0 when `as_of` is on or before `start`. Without weekends only
/// Monday-Friday dates in `[start, as_of)` are counted, so a Monday-to-Monday
/// span counts 5.
pub fn days_between(start: NaiveDate, as_of: NaiveDate, include_weekends: bool) -> u32 {
    if as_of <= start {
        return 0;
    }
    let total = (as_of - start).num_days();
    let counted = if include_weekends {
        total
    } else {
        let full_weeks = total / 7;
        let tail_start = start + Duration::days(full_weeks * 7);
        let tail = (0..total % 7)
            .map(|offset| tail_start + Duration::days(offset))
            .filter(|d| is_weekday(*d))
            .count() as i64;
        full_weeks * 5 + tail
    };
    u32::try_from(counted).unwrap_or(u32::MAX)
}

/// Calendar date on which program day `day_index` (1-based) falls for a run
/// starting on `start`.
///
/// Without weekends, a start on Saturday or Sunday rolls forward to Monday
/// and later days skip weekends. Day index 0 is treated as day 1.
pub fn date_for_day_index(start: NaiveDate, day_index: u32, include_weekends: bool) -> NaiveDate {
    let offset = i64::from(day_index.max(1) - 1);
    if include_weekends {
        return start + Duration::days(offset);
    }

    let mut date = start;
    while !is_weekday(date) {
        date = date.succ_opt().unwrap_or(date);
    }
    date = date + Duration::days(offset / 5 * 7);
    let mut remaining = offset % 5;
    while remaining > 0 {
        date = date + Duration::days(1);
        if is_weekday(date) {
            remaining -= 1;
        }
    }
    date
}
