use std::convert::TryFrom;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid {field} datetime '{value}': {err}"))
}

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} value {value} is negative"))
}

/// JSON-encoded string list column ('[]' when empty).
pub fn parse_string_list(value: &str, field: &str) -> Result<Vec<String>> {
    serde_json::from_str(value).map_err(|err| anyhow!("invalid {field} JSON '{value}': {err}"))
}
