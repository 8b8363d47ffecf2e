use super::data_type::{AttributeDataType, TypedValue, ValueError};
use super::temporal::Validity;
use super::{key_eq, normalize_key};
use chrono::{DateTime, FixedOffset};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AttributeError {
    #[error("attribute key must not be blank")]
    BlankKey,
}

/// A concrete, temporally scoped attribute value attached to an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtendedAttribute {
    pub key: String,
    /// Raw textual form of the value
    #[serde(default)]
    pub value: String,
    pub data_type: AttributeDataType,
    #[serde(default)]
    pub is_required: bool,
    #[serde(flatten)]
    pub validity: Validity,
}

impl ExtendedAttribute {
    /// Create an attribute effective from now on.
    pub fn new(
        key: &str,
        value: &str,
        data_type: AttributeDataType,
        is_required: bool,
    ) -> Result<Self, AttributeError> {
        if key.trim().is_empty() {
            return Err(AttributeError::BlankKey);
        }
        Ok(ExtendedAttribute {
            key: key.trim().to_string(),
            value: value.to_string(),
            data_type,
            is_required,
            validity: Validity::starting_now(),
        })
    }

    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    pub fn update_value(&mut self, value: &str, data_type: AttributeDataType, is_required: bool) {
        self.value = value.to_string();
        self.data_type = data_type;
        self.is_required = is_required;
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Parsed value, or `None` when the raw value is blank.
    pub fn typed_value(&self) -> Result<Option<TypedValue>, ValueError> {
        if self.is_blank() {
            return Ok(None);
        }
        TypedValue::parse(self.data_type, &self.value).map(Some)
    }

    /// Whether the raw value is well formed for the declared data type.
    /// A blank value is tolerated only when the attribute is optional.
    pub fn is_valid_value(&self) -> bool {
        match self.typed_value() {
            Ok(Some(_)) => true,
            Ok(None) => !self.is_required,
            Err(_) => false,
        }
    }

    pub fn is_effective_at(&self, at: DateTime<FixedOffset>) -> bool {
        self.validity.contains(at)
    }

    pub fn has_key(&self, key: &str) -> bool {
        key_eq(&self.key, key)
    }
}

/// Case-insensitive key index over a collection of attributes.
///
/// When several attributes share a key, the one with the latest `valid_from`
/// wins; ties go to the later entry.
pub(crate) fn index_by_key<'a, I>(attributes: I) -> HashMap<String, &'a ExtendedAttribute>
where
    I: IntoIterator<Item = &'a ExtendedAttribute>,
{
    let mut index: HashMap<String, &ExtendedAttribute> = HashMap::new();
    for attribute in attributes {
        let key = normalize_key(&attribute.key);
        if key.is_empty() {
            continue;
        }
        let slot = index.entry(key).or_insert(attribute);
        if attribute.validity.valid_from >= slot.validity.valid_from {
            *slot = attribute;
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::temporal::parse_datetime;

    fn attr(value: &str, data_type: AttributeDataType, required: bool) -> ExtendedAttribute {
        ExtendedAttribute::new("K", value, data_type, required).unwrap()
    }

    #[test]
    fn new_sets_properties() {
        let a = ExtendedAttribute::new(" K ", "123", AttributeDataType::Number, true).unwrap();
        assert_eq!(a.key, "K");
        assert_eq!(a.value, "123");
        assert_eq!(a.data_type, AttributeDataType::Number);
        assert!(a.is_required);
        assert!(a.validity.valid_to.is_none());
    }

    #[test]
    fn blank_key_rejected() {
        assert_eq!(
            ExtendedAttribute::new("  ", "v", AttributeDataType::String, false),
            Err(AttributeError::BlankKey)
        );
    }

    #[test]
    fn number_values() {
        assert!(attr("123", AttributeDataType::Number, false).is_valid_value());
        assert!(!attr("abc", AttributeDataType::Number, false).is_valid_value());
        assert!(attr("-7.9e27", AttributeDataType::Number, false).is_valid_value());
        // finite as a float, but beyond what a decimal can hold
        assert!(!attr("1e30", AttributeDataType::Number, false).is_valid_value());
    }

    #[test]
    fn boolean_values() {
        assert!(attr("true", AttributeDataType::Boolean, false).is_valid_value());
        assert!(attr("FALSE", AttributeDataType::Boolean, false).is_valid_value());
        assert!(!attr("x", AttributeDataType::Boolean, false).is_valid_value());
    }

    #[test]
    fn date_values() {
        assert!(attr("2020-01-01", AttributeDataType::Date, false).is_valid_value());
        assert!(attr("2020-01-01T08:00:00+02:00", AttributeDataType::Date, false).is_valid_value());
        assert!(!attr("notadate", AttributeDataType::Date, false).is_valid_value());
    }

    #[test]
    fn json_and_enum_values() {
        assert!(attr("[1, 2, 3]", AttributeDataType::Json, false).is_valid_value());
        assert!(!attr("[1, 2", AttributeDataType::Json, false).is_valid_value());
        assert!(attr("anything", AttributeDataType::Enum, true).is_valid_value());
    }

    #[test]
    fn blank_value_valid_only_when_optional() {
        assert!(attr("  ", AttributeDataType::Number, false).is_valid_value());
        assert!(!attr("  ", AttributeDataType::Number, true).is_valid_value());
        assert!(!attr("", AttributeDataType::String, true).is_valid_value());
    }

    #[test]
    fn update_value_changes_fields() {
        let mut a = attr("1", AttributeDataType::Number, false);
        a.update_value("2", AttributeDataType::Number, true);
        assert_eq!(a.value, "2");
        assert!(a.is_required);
    }

    #[test]
    fn index_prefers_latest_valid_from() {
        let later = attr("1", AttributeDataType::Number, false).with_validity(Validity::new(
            parse_datetime("2024-06-01").unwrap(),
            None,
        ));
        let earlier = ExtendedAttribute::new("k", "2", AttributeDataType::Number, false)
            .unwrap()
            .with_validity(Validity::new(parse_datetime("2024-01-01").unwrap(), None));
        let attrs = [later, earlier];
        let index = index_by_key(&attrs);
        assert_eq!(index.len(), 1);
        assert_eq!(index["k"].value, "1");
    }

    #[test]
    fn index_tie_goes_to_later_entry() {
        let validity = Validity::new(parse_datetime("2024-01-01").unwrap(), None);
        let attrs = [
            attr("1", AttributeDataType::Number, false).with_validity(validity),
            attr("2", AttributeDataType::Number, false).with_validity(validity),
        ];
        assert_eq!(index_by_key(&attrs)["k"].value, "2");
    }
}
