use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Validity window of a temporally scoped entity. Both bounds are inclusive;
/// an unset `valid_to` means open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Validity {
    #[serde(default = "now", deserialize_with = "deserialize_datetime")]
    #[schemars(with = "Option<String>")]
    pub valid_from: DateTime<FixedOffset>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    #[schemars(with = "Option<String>")]
    pub valid_to: Option<DateTime<FixedOffset>>,
}

impl Validity {
    pub fn new(valid_from: DateTime<FixedOffset>, valid_to: Option<DateTime<FixedOffset>>) -> Self {
        Validity {
            valid_from,
            valid_to,
        }
    }

    /// Open-ended window starting now
    pub fn starting_now() -> Self {
        Validity::new(now(), None)
    }

    /// Window covering every representable instant
    pub fn always() -> Self {
        Validity::new(DateTime::<Utc>::MIN_UTC.fixed_offset(), None)
    }

    pub fn contains(&self, at: DateTime<FixedOffset>) -> bool {
        self.valid_from <= at && self.valid_to.map_or(true, |to| at <= to)
    }
}

impl Default for Validity {
    fn default() -> Self {
        Validity::starting_now()
    }
}

pub fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid datetime: {0}")]
pub struct InvalidDatetime(pub String);

/// Parse a date/time with offset. Naive forms and bare dates are read as UTC.
pub fn parse_datetime(s: &str) -> Result<DateTime<FixedOffset>, InvalidDatetime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt.and_utc().fixed_offset());
        }
    }
    if let Some(dt) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(dt.and_utc().fixed_offset());
    }
    Err(InvalidDatetime(s.to_string()))
}

pub(crate) fn deserialize_datetime<'de, D>(
    deserializer: D,
) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_datetime(&s).map_err(|err| serde::de::Error::custom(err.to_string()))
}

pub(crate) fn deserialize_optional_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    s.map(|s| parse_datetime(&s).map_err(|err| serde::de::Error::custom(err.to_string())))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> DateTime<FixedOffset> {
        parse_datetime(s).unwrap()
    }

    #[test]
    fn parses_offset_and_naive_forms() {
        assert_eq!(dt("2024-01-15T10:30:00+01:00").offset().local_minus_utc(), 3600);
        assert_eq!(dt("2024-01-15T10:30:00"), dt("2024-01-15T10:30:00+00:00"));
        assert_eq!(dt("2024-01-15 10:30:00"), dt("2024-01-15T10:30:00Z"));
        assert_eq!(dt("2024-01-15"), dt("2024-01-15T00:00:00Z"));
        assert!(parse_datetime("15/01/2024").is_err());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let validity = Validity::new(dt("2024-01-01"), Some(dt("2024-12-31")));
        assert!(validity.contains(dt("2024-01-01")));
        assert!(validity.contains(dt("2024-12-31")));
        assert!(!validity.contains(dt("2023-12-31")));
        assert!(!validity.contains(dt("2025-01-01")));
    }

    #[test]
    fn open_ended_window() {
        let validity = Validity::new(dt("2024-01-01"), None);
        assert!(validity.contains(dt("2999-01-01")));
        assert!(Validity::always().contains(dt("1900-01-01")));
    }

    #[test]
    fn deserializes_lenient_dates() {
        let validity: Validity =
            serde_json::from_str(r#"{"valid_from": "2024-01-01", "valid_to": null}"#).unwrap();
        assert_eq!(validity.valid_from, dt("2024-01-01T00:00:00Z"));
        assert_eq!(validity.valid_to, None);
    }
}
