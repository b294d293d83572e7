use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parses an ISO calendar date (`YYYY-MM-DD`). Blank input yields `None`.
pub fn parse_iso_date(raw: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(Some)
}

/// Returns the UTC instant at which `date` begins in `tz`.
///
/// When local midnight is skipped by a DST transition the first valid local
/// instant of that day is used instead.
pub fn start_of_local_day(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => (1..=3)
            .filter_map(|hour| {
                date.and_hms_opt(hour, 0, 0)
                    .and_then(|t| tz.from_local_datetime(&t).earliest())
            })
            .next()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
    }
}

/// Returns the exclusive UTC upper bound for an inclusive local end date.
pub fn end_of_local_day_exclusive(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    match date.succ_opt() {
        Some(next) => start_of_local_day(next, tz),
        None => DateTime::<Utc>::MAX_UTC,
    }
}
