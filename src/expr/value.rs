use crate::domain::data_type::{parse_bool, parse_decimal};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

/// Runtime value of a formula operand or result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Bound for schema-declared attributes that were not supplied
    Null,
    Number(Decimal),
    Boolean(bool),
    Text(String),
}

impl Value {
    /// Coerce raw attribute text: number first, then boolean, else text.
    pub fn from_raw(raw: &str) -> Value {
        if let Some(number) = parse_decimal(raw) {
            Value::Number(number)
        } else if let Some(flag) = parse_bool(raw) {
            Value::Boolean(flag)
        } else {
            Value::Text(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view: numbers, and text that reads as a number.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(t) => parse_decimal(t),
            Value::Null | Value::Boolean(_) => None,
        }
    }

    /// Monetary view of a formula result. Anything that is not numeric is
    /// "no contribution" rather than an error.
    pub fn to_decimal(&self) -> Option<Decimal> {
        self.as_number()
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Number(n) => write!(f, "{}", n.normalize()),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Text(t) => f.write_str(t),
        }
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(t: &str) -> Self {
        Value::Text(t.to_string())
    }
}

/// Named values a formula can reference. Names are trimmed and matched
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: HashMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.values.insert(name.trim().to_lowercase(), value.into());
        self
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.bind(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(&name.trim().to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
