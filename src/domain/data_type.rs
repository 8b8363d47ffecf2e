use super::temporal::parse_datetime;
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Data type of an attribute value.
///
/// The set is closed: each variant carries a stable code used by persistence
/// and a name used in messages and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum AttributeDataType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    Enum,
    Json,
}

impl AttributeDataType {
    pub const ALL: [AttributeDataType; 6] = [
        AttributeDataType::String,
        AttributeDataType::Number,
        AttributeDataType::Boolean,
        AttributeDataType::Date,
        AttributeDataType::Enum,
        AttributeDataType::Json,
    ];

    /// Stable persistence code
    pub fn code(self) -> i32 {
        match self {
            AttributeDataType::String => 1,
            AttributeDataType::Number => 2,
            AttributeDataType::Boolean => 3,
            AttributeDataType::Date => 4,
            AttributeDataType::Enum => 5,
            AttributeDataType::Json => 6,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            AttributeDataType::String => "String",
            AttributeDataType::Number => "Number",
            AttributeDataType::Boolean => "Boolean",
            AttributeDataType::Date => "Date",
            AttributeDataType::Enum => "Enum",
            AttributeDataType::Json => "Json",
        }
    }
}

impl fmt::Display for AttributeDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttributeDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown attribute data type: {s}"))
    }
}

/// An attribute value parsed from its raw text according to its data type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<FixedOffset>),
    /// Enum code; membership is checked against the schema, not here
    Enum(String),
    Json(serde_json::Value),
}

/// Raw text could not be read as the declared data type.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("'{raw}' is not a valid {data_type} value")]
pub struct ValueError {
    pub data_type: AttributeDataType,
    pub raw: String,
}

impl TypedValue {
    /// Parse raw attribute text as the given data type.
    pub fn parse(data_type: AttributeDataType, raw: &str) -> Result<TypedValue, ValueError> {
        let invalid = || ValueError {
            data_type,
            raw: raw.to_string(),
        };
        match data_type {
            AttributeDataType::String => Ok(TypedValue::String(raw.to_string())),
            AttributeDataType::Number => parse_number(raw)
                .filter(|_| parse_decimal(raw).is_some())
                .map(TypedValue::Number)
                .ok_or_else(invalid),
            AttributeDataType::Boolean => parse_bool(raw)
                .map(TypedValue::Boolean)
                .ok_or_else(invalid),
            AttributeDataType::Date => parse_datetime(raw.trim())
                .map(TypedValue::Date)
                .map_err(|_| invalid()),
            AttributeDataType::Enum => Ok(TypedValue::Enum(raw.trim().to_string())),
            AttributeDataType::Json => serde_json::from_str(raw)
                .map(TypedValue::Json)
                .map_err(|_| invalid()),
        }
    }

    pub fn data_type(&self) -> AttributeDataType {
        match self {
            TypedValue::String(_) => AttributeDataType::String,
            TypedValue::Number(_) => AttributeDataType::Number,
            TypedValue::Boolean(_) => AttributeDataType::Boolean,
            TypedValue::Date(_) => AttributeDataType::Date,
            TypedValue::Enum(_) => AttributeDataType::Enum,
            TypedValue::Json(_) => AttributeDataType::Json,
        }
    }
}

/// Locale-independent floating point parse. Non-finite values are rejected.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Invariant-format number parse into a decimal. Exact decimal text is kept
/// exact; other float literals go through `f64`.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    let float = parse_number(raw)?;
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .or_else(|| Decimal::try_from(float).ok())
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
