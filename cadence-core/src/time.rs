//! Time utilities: timezone-aware conversions between local wall-clock time and UTC.
//!
//! All scheduling arithmetic happens on `DateTime<Utc>`; local time only
//! exists at the edges (templates, date-only deadlines, day boundaries).

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse an IANA timezone name like "Europe/London".
pub fn parse_tz(name: &str) -> Option<Tz> {
    name.trim().parse().ok()
}

/// Resolve a local wall-clock time to UTC.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times that
/// do not exist (DST spring-forward gap) return `None`.
pub fn local_to_utc(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Start of a local calendar day (local midnight) in UTC.
pub fn start_of_local_day(tz: Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    local_to_utc(tz, date, NaiveTime::MIN)
}

/// 23:59:59 local time on `date`, the deadline used for date-only due dates.
pub fn end_of_local_day(tz: Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let t = NaiveTime::from_hms_opt(23, 59, 59)?;
    local_to_utc(tz, date, t)
}

/// Local calendar date of an instant.
pub fn local_date(tz: Tz, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// Parse a naive local timestamp ("2026-02-20T14:30:00" or "2026-02-20 14:30")
/// in `tz`, returning UTC.
pub fn parse_local_datetime_to_utc(local: &str, tz: Tz) -> Option<DateTime<Utc>> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    let local = local.trim();
    let ndt = FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(local, f).ok())?;
    local_to_utc(tz, ndt.date(), ndt.time())
}

/// Parse either an RFC 3339 timestamp (offset honoured) or a naive local one.
pub fn parse_timestamp(s: &str, tz: Tz) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_local_datetime_to_utc(s, tz))
}

/// Helper: format a UTC time as local RFC 3339.
pub fn to_local_rfc3339(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).to_rfc3339()
}
