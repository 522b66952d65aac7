//! Certificate expiry parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::{ProcessError, Result};

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Naive formats tried after RFC 3339 and RFC 2822, interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%b %d %H:%M:%S %Y GMT",
    "%b %e %H:%M:%S %Y GMT",
];

/// Parse an expiry value found in a scan result.
pub fn parse_expiry(value: &Value) -> Result<DateTime<Utc>> {
    let text = match value {
        Value::String(s) => s.trim(),
        Value::Null => return Err(ProcessError::Expiry("no expiry value found".to_string())),
        other => {
            return Err(ProcessError::Expiry(format!(
                "expected a date string, got {other}"
            )))
        }
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(ProcessError::Expiry(format!("unrecognized date: {text:?}")))
}

/// Whole days from `now` until `expires`, rounded toward negative infinity.
pub fn days_until(expires: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires - now).num_seconds().div_euclid(SECS_PER_DAY)
}
