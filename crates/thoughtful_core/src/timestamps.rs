use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::ValidationError;
use crate::types::IsoTimestamp;

/// Canonical ISO-8601 form used for every stored timestamp: UTC with a `Z`
/// suffix and microsecond precision.
pub fn to_iso(instant: DateTime<Utc>) -> IsoTimestamp {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `YYYY-MM-DD` key of the UTC day containing `instant`.
pub fn date_key(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// Parses an ISO-8601 string with an offset, a `Z` suffix, no offset at all
/// (assumed UTC) or a bare date (midnight UTC) and re-renders it in canonical
/// form.
pub fn normalize_iso(value: &str) -> Result<IsoTimestamp, ValidationError> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(to_iso(parsed.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(to_iso(naive.and_utc()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(to_iso(date.and_time(NaiveTime::MIN).and_utc()));
    }
    Err(ValidationError::new(format!(
        "'{value}' is not a valid ISO8601 timestamp"
    )))
}

pub(crate) fn deserialize_iso<'de, D>(deserializer: D) -> Result<IsoTimestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    normalize_iso(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_optional_iso<'de, D>(
    deserializer: D,
) -> Result<Option<IsoTimestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    raw.map(|value| normalize_iso(&value).map_err(serde::de::Error::custom))
        .transpose()
}
