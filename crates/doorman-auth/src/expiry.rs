//! Session expiry encoding and the liveness rule.
//!
//! Expiries are stored as the six-component string
//! `year-month-day-hour-minute-second` in UTC, zero-padded, e.g.
//! `2031-01-07-16-45-09`. Parsing is strict and fails closed: anything
//! that is not exactly six all-digit components naming a real calendar
//! time counts as already expired.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

const EXPIRY_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// The instant a session issued or refreshed at `now` will lapse.
pub fn compute_expiry(now: DateTime<Utc>, duration_minutes: i64) -> DateTime<Utc> {
    now + Duration::try_minutes(duration_minutes).unwrap_or_else(Duration::zero)
}

/// Encode an instant into the stored column format.
pub fn format_expiry(at: DateTime<Utc>) -> String {
    at.format(EXPIRY_FORMAT).to_string()
}

/// Decode a stored expiry string, or `None` if it is malformed.
pub fn parse_expiry(encoded: &str) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = encoded.split('-').collect();
    let [year, month, day, hour, minute, second] = parts.as_slice() else {
        return None;
    };
    if ![year, month, day, hour, minute, second]
        .iter()
        .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    )?;
    date.and_hms_opt(hour.parse().ok()?, minute.parse().ok()?, second.parse().ok()?)
}

/// Whether a stored expiry is still in the future at `now`.
///
/// The comparison is strict: a session whose expiry equals the current
/// second is already dead. Malformed strings are dead too.
pub fn is_live(encoded: &str, now: DateTime<Utc>) -> bool {
    parse_expiry(encoded).is_some_and(|expiry| now.naive_utc() < expiry)
}
