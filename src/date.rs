use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

use crate::error::{PosError, Result};

/// Canonical timestamp format understood by the service.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date-only textual form accepted from callers.
const PARTIAL_FORMAT: &str = "%Y-%m-%d";

/// Date-like values accepted by [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub enum DateLike {
    /// Timezone-aware point in time
    Timestamp(DateTime<Utc>),
    /// Naive date and time
    DateTime(NaiveDateTime),
    /// Date without a time component (midnight is assumed)
    Date(NaiveDate),
    /// Textual form, parsed against the recognized formats
    Text(String),
}

impl From<DateTime<Utc>> for DateLike {
    fn from(dt: DateTime<Utc>) -> Self {
        DateLike::Timestamp(dt)
    }
}

impl From<NaiveDateTime> for DateLike {
    fn from(dt: NaiveDateTime) -> Self {
        DateLike::DateTime(dt)
    }
}

impl From<NaiveDate> for DateLike {
    fn from(d: NaiveDate) -> Self {
        DateLike::Date(d)
    }
}

impl From<&str> for DateLike {
    fn from(s: &str) -> Self {
        DateLike::Text(s.to_string())
    }
}

impl From<String> for DateLike {
    fn from(s: String) -> Self {
        DateLike::Text(s)
    }
}

/// Normalize a date-like value into the canonical `YYYY-MM-DD HH:MM:SS`
/// string.
///
/// Native date/time values format directly. Strings are tried against the
/// date-only form first, then the full form; a string matching neither
/// yields the current timestamp. The fallback is documented behavior of
/// the service contract, not a failure.
pub fn normalize(value: &DateLike) -> String {
    match value {
        DateLike::Timestamp(dt) => dt.format(CANONICAL_FORMAT).to_string(),
        DateLike::DateTime(dt) => dt.format(CANONICAL_FORMAT).to_string(),
        DateLike::Date(d) => d.and_time(NaiveTime::MIN).format(CANONICAL_FORMAT).to_string(),
        DateLike::Text(s) => normalize_str(s),
    }
}

fn normalize_str(s: &str) -> String {
    if let Ok(d) = NaiveDate::parse_from_str(s, PARTIAL_FORMAT) {
        return d.and_time(NaiveTime::MIN).format(CANONICAL_FORMAT).to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, CANONICAL_FORMAT) {
        return dt.format(CANONICAL_FORMAT).to_string();
    }
    Utc::now().format(CANONICAL_FORMAT).to_string()
}

/// Normalize a JSON option value.
///
/// Only strings are date-like once inside an option mapping; any other
/// JSON type is a caller mistake, reported before network I/O.
pub fn normalize_value(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(normalize_str(s)),
        other => Err(PosError::InvalidArgument(format!(
            "date values must be date/time values or strings, got {}",
            json_type_name(other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
