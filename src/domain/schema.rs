use super::data_type::AttributeDataType;
use super::{key_eq, normalize_key};
use std::sync::Arc;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("definition key must not be blank")]
    BlankKey,
    #[error("definition label must not be blank: {key}")]
    BlankLabel { key: String },
    #[error("enum item code must not be blank: {enum_key}")]
    BlankEnumCode { enum_key: String },
    #[error("duplicate code '{code}' in enum '{enum_key}'")]
    DuplicateEnumCode { enum_key: String, code: String },
}

/// One allowed value of an [`EnumDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumItem {
    /// Stored and matched value
    pub code: String,
    /// Display text
    pub label: String,
    pub order: i32,
}

/// Named, ordered set of allowed codes backing an enum-typed attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDefinition {
    key: String,
    label: String,
    items: Vec<EnumItem>,
}

impl EnumDefinition {
    pub fn new(key: &str, label: &str) -> Result<Self, SchemaError> {
        let (key, label) = require_key_and_label(key, label)?;
        Ok(EnumDefinition {
            key,
            label,
            items: Vec::new(),
        })
    }

    /// Builder form of [`EnumDefinition::add_item`].
    pub fn with_item(mut self, code: &str, label: &str, order: i32) -> Result<Self, SchemaError> {
        self.add_item(code, label, order)?;
        Ok(self)
    }

    /// Add an item, keeping items sorted by `order` (stable for equal orders).
    /// Codes must be unique within the enum, ignoring case.
    pub fn add_item(
        &mut self,
        code: &str,
        label: &str,
        order: i32,
    ) -> Result<&mut Self, SchemaError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(SchemaError::BlankEnumCode {
                enum_key: self.key.clone(),
            });
        }
        if self.item(code).is_some() {
            return Err(SchemaError::DuplicateEnumCode {
                enum_key: self.key.clone(),
                code: code.to_string(),
            });
        }
        let position = self.items.partition_point(|item| item.order <= order);
        self.items.insert(
            position,
            EnumItem {
                code: code.to_string(),
                label: label.trim().to_string(),
                order,
            },
        );
        Ok(self)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn items(&self) -> &[EnumItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.code.as_str())
    }

    /// Item whose code equals `value` after trimming, ignoring case.
    pub fn item(&self, value: &str) -> Option<&EnumItem> {
        self.items.iter().find(|item| key_eq(&item.code, value))
    }

    /// Anchored, case-insensitive alternation over the item codes. Longer
    /// codes come first so that no code is shadowed by one of its prefixes.
    pub fn build_code_regex(&self) -> String {
        if self.items.is_empty() {
            return r"^[^\s\S]$".to_string();
        }
        let mut codes: Vec<&str> = self.codes().collect();
        codes.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        let alternation = codes
            .into_iter()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        format!("^(?i:{alternation})$")
    }
}

/// Schema entry describing one attribute an asset type expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    key: String,
    label: String,
    data_type: AttributeDataType,
    is_required: bool,
    enum_definition: Option<Arc<EnumDefinition>>,
    regex_pattern: Option<String>,
}

impl AttributeDefinition {
    /// Scalar definition. Key and label are trimmed and must not be blank.
    pub fn new(
        key: &str,
        label: &str,
        data_type: AttributeDataType,
        is_required: bool,
        regex_pattern: Option<&str>,
    ) -> Result<Self, SchemaError> {
        let (key, label) = require_key_and_label(key, label)?;
        Ok(AttributeDefinition {
            key,
            label,
            data_type,
            is_required,
            enum_definition: None,
            regex_pattern: non_blank(regex_pattern),
        })
    }

    /// Enum-backed definition taking its key and label from the enum, with a
    /// pattern derived from the item codes.
    pub fn from_enum(enum_definition: impl Into<Arc<EnumDefinition>>, is_required: bool) -> Self {
        let enum_definition = enum_definition.into();
        AttributeDefinition {
            key: enum_definition.key().to_string(),
            label: enum_definition.label().to_string(),
            data_type: AttributeDataType::Enum,
            is_required,
            regex_pattern: Some(enum_definition.build_code_regex()),
            enum_definition: Some(enum_definition),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn data_type(&self) -> AttributeDataType {
        self.data_type
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn enum_definition(&self) -> Option<&EnumDefinition> {
        self.enum_definition.as_deref()
    }

    pub fn regex_pattern(&self) -> Option<&str> {
        self.regex_pattern.as_deref()
    }

    pub fn has_key(&self, key: &str) -> bool {
        key_eq(&self.key, key)
    }

    pub fn update_label(&mut self, label: &str) -> Result<&mut Self, SchemaError> {
        if label.trim().is_empty() {
            return Err(SchemaError::BlankLabel {
                key: self.key.clone(),
            });
        }
        self.label = label.trim().to_string();
        Ok(self)
    }

    /// Set the validation pattern; a blank or missing pattern clears it.
    pub fn set_regex_pattern(&mut self, pattern: Option<&str>) -> &mut Self {
        self.regex_pattern = non_blank(pattern);
        self
    }
}

fn require_key_and_label(key: &str, label: &str) -> Result<(String, String), SchemaError> {
    if normalize_key(key).is_empty() {
        return Err(SchemaError::BlankKey);
    }
    if label.trim().is_empty() {
        return Err(SchemaError::BlankLabel {
            key: key.trim().to_string(),
        });
    }
    Ok((key.trim().to_string(), label.trim().to_string()))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}
