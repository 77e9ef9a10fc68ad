use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::errors::AppError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Resolves the date forms clients send to one calendar date in the venue's offset.
///
/// Plain dates are taken as-is. Datetimes carrying an offset (the `toISOString()`
/// form) are shifted into `offset` first, so `2025-02-28T17:00:00Z` at +07:00 is
/// the first of March. Naive datetimes are treated as already local.
pub fn normalize_date(raw: &str, offset: FixedOffset) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Ok(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&offset).date_naive());
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt.date());
        }
    }

    Err(AppError::validation(format!("invalid booking date: {raw}")))
}
