use super::data_type::AttributeDataType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A way in which an attribute set fails to satisfy an asset type's schema.
///
/// Violations are data, not errors: validation returns all of them and the
/// caller decides what to reject. `Display` renders the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum Violation {
    MissingRequired {
        key: String,
    },
    TypeMismatch {
        key: String,
        expected: AttributeDataType,
        actual: AttributeDataType,
    },
    InvalidValue {
        key: String,
        data_type: AttributeDataType,
    },
    PatternMismatch {
        key: String,
        value: String,
        pattern: String,
    },
    /// The definition itself carries a pattern that does not compile.
    InvalidPattern {
        key: String,
        pattern: String,
        reason: String,
    },
    MissingEnumDefinition {
        key: String,
    },
    DisallowedEnumValue {
        key: String,
        value: String,
        allowed: Vec<String>,
    },
}

impl Violation {
    pub fn key(&self) -> &str {
        match self {
            Violation::MissingRequired { key }
            | Violation::TypeMismatch { key, .. }
            | Violation::InvalidValue { key, .. }
            | Violation::PatternMismatch { key, .. }
            | Violation::InvalidPattern { key, .. }
            | Violation::MissingEnumDefinition { key }
            | Violation::DisallowedEnumValue { key, .. } => key,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingRequired { key } => {
                write!(f, "missing required attribute '{key}'")
            }
            Violation::TypeMismatch {
                key,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for '{key}': expected {expected}, got {actual}"
            ),
            Violation::InvalidValue { key, data_type } => {
                write!(f, "invalid value for '{key}' as {data_type}")
            }
            Violation::PatternMismatch {
                key,
                value,
                pattern,
            } => write!(
                f,
                "value '{value}' of '{key}' does not satisfy pattern '{pattern}'"
            ),
            Violation::InvalidPattern {
                key,
                pattern,
                reason,
            } => write!(f, "invalid pattern '{pattern}' on definition '{key}': {reason}"),
            Violation::MissingEnumDefinition { key } => {
                write!(f, "missing enum definition for '{key}'")
            }
            Violation::DisallowedEnumValue {
                key,
                value,
                allowed,
            } => write!(
                f,
                "value '{value}' of '{key}' is not an allowed value (allowed: {})",
                allowed.join(", ")
            ),
        }
    }
}

/// Join violation messages into a single line.
pub fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
