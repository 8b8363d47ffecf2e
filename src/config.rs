//! Asset-type catalogs loaded from JSON.
//!
//! Enums are declared once at the top level and referenced by key from
//! attribute specs, so every definition using an enum shares one
//! [`EnumDefinition`].

use crate::domain::asset_type::AMOUNT_VARIABLE;
use crate::domain::temporal::deserialize_optional_datetime;
use crate::domain::{
    normalize_key, AssetType, AssetTypeError, AttributeDataType, AttributeDefinition,
    EnumDefinition, RuleError, SchemaError, TaxRule, Validity,
};
use crate::expr::{parse_formula, Expr, ExprError};
use chrono::{DateTime, FixedOffset};
use schemars::schema::RootSchema;
use schemars::{schema_for, JsonSchema};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown enum '{enum_key}' referenced by asset type '{asset_type}'")]
    UnknownEnum {
        asset_type: String,
        enum_key: String,
    },
    #[error("duplicate enum: {0}")]
    DuplicateEnum(String),
    #[error("duplicate asset type: {0}")]
    DuplicateAssetType(String),
    #[error("tax rule '{rule}' has an invalid formula: {source}")]
    InvalidFormula {
        rule: String,
        #[source]
        source: ExprError,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    AssetType(#[from] AssetTypeError),
    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Input root for catalog JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CatalogInput {
    #[serde(default)]
    pub enums: Vec<EnumSpec>,
    pub asset_types: Vec<AssetTypeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EnumSpec {
    /// Key referenced by enum-backed attributes, also the attribute key
    pub key: String,
    pub label: String,
    pub items: Vec<EnumItemSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EnumItemSpec {
    pub code: String,
    pub label: String,
    /// Sort position; defaults to the item's position in the list
    #[serde(default)]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssetTypeSpec {
    /// Stable identifier; generated when absent
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// An object with an `enum` member is an enum attribute; anything else must
/// carry `key`, `label` and `data_type`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum AttributeSpec {
    /// Attribute backed by a declared enum; key and label come from the enum
    Enum {
        #[serde(rename = "enum")]
        enum_key: String,
        #[serde(default = "default_true")]
        required: bool,
    },
    Scalar {
        key: String,
        label: String,
        data_type: AttributeDataType,
        #[serde(default)]
        required: bool,
        /// Pattern the whole value must match
        #[serde(default)]
        regex: Option<String>,
    },
}

#[derive(Deserialize)]
struct RawAttributeSpec {
    #[serde(rename = "enum")]
    enum_key: Option<String>,
    required: Option<bool>,
    key: Option<String>,
    label: Option<String>,
    data_type: Option<AttributeDataType>,
    regex: Option<String>,
}

impl<'de> Deserialize<'de> for AttributeSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawAttributeSpec::deserialize(deserializer)?;
        if let Some(enum_key) = raw.enum_key {
            return Ok(AttributeSpec::Enum {
                enum_key,
                required: raw.required.unwrap_or(true),
            });
        }
        let key = raw.key.ok_or_else(|| {
            <D::Error as de::Error>::custom("attribute needs either `enum` or `key`")
        })?;
        let missing = |field: &str| {
            <D::Error as de::Error>::custom(format!("attribute '{key}': missing field `{field}`"))
        };
        Ok(AttributeSpec::Scalar {
            label: raw.label.ok_or_else(|| missing("label"))?,
            data_type: raw.data_type.ok_or_else(|| missing("data_type"))?,
            required: raw.required.unwrap_or(false),
            regex: raw.regex,
            key,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RuleSpec {
    pub key: String,
    pub label: String,
    /// Formula over attribute keys and `amount`
    pub expression: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    #[schemars(with = "Option<String>")]
    pub valid_from: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    #[schemars(with = "Option<String>")]
    pub valid_to: Option<DateTime<FixedOffset>>,
}

fn default_true() -> bool {
    true
}

impl EnumSpec {
    fn build(&self) -> Result<EnumDefinition, SchemaError> {
        let mut definition = EnumDefinition::new(&self.key, &self.label)?;
        for (position, item) in self.items.iter().enumerate() {
            let order = item.order.unwrap_or(position as i32 + 1);
            definition.add_item(&item.code, &item.label, order)?;
        }
        Ok(definition)
    }
}

impl AttributeSpec {
    fn build(
        &self,
        asset_type: &str,
        enums: &HashMap<String, Arc<EnumDefinition>>,
    ) -> Result<AttributeDefinition, ConfigError> {
        match self {
            AttributeSpec::Enum { enum_key, required } => {
                let definition =
                    enums
                        .get(&normalize_key(enum_key))
                        .ok_or_else(|| ConfigError::UnknownEnum {
                            asset_type: asset_type.to_string(),
                            enum_key: enum_key.clone(),
                        })?;
                Ok(AttributeDefinition::from_enum(
                    Arc::clone(definition),
                    *required,
                ))
            }
            AttributeSpec::Scalar {
                key,
                label,
                data_type,
                required,
                regex,
            } => Ok(AttributeDefinition::new(
                key,
                label,
                *data_type,
                *required,
                regex.as_deref(),
            )?),
        }
    }
}

impl RuleSpec {
    fn build(&self) -> Result<(TaxRule, Expr), ConfigError> {
        let formula =
            parse_formula(&self.expression).map_err(|source| ConfigError::InvalidFormula {
                rule: self.key.clone(),
                source,
            })?;
        let valid_from = self.valid_from.unwrap_or(Validity::always().valid_from);
        let mut rule = TaxRule::new(&self.key, &self.label, &self.expression)?
            .with_validity(Validity::new(valid_from, self.valid_to));
        if let Some(description) = &self.description {
            rule = rule.with_description(description);
        }
        if !self.enabled {
            rule = rule.disabled();
        }
        Ok((rule, formula))
    }
}

impl AssetTypeSpec {
    fn build(
        &self,
        enums: &HashMap<String, Arc<EnumDefinition>>,
    ) -> Result<AssetType, ConfigError> {
        let mut asset_type = AssetType::create(&self.name, self.description.as_deref())?;
        if let Some(id) = self.id {
            asset_type = asset_type.with_id(id);
        }
        for attribute in &self.attributes {
            asset_type.add_expected_attribute(attribute.build(&self.name, enums)?)?;
        }
        for spec in &self.rules {
            let (rule, formula) = spec.build()?;
            for name in formula.variables() {
                let declared = asset_type.has_expected_attribute(name)
                    || name.eq_ignore_ascii_case(AMOUNT_VARIABLE);
                if !declared {
                    log::warn!(
                        "tax rule '{}' of asset type '{}' references undeclared attribute '{}'",
                        rule.key,
                        asset_type.name(),
                        name
                    );
                }
            }
            asset_type.add_tax_rule(rule)?;
        }
        Ok(asset_type)
    }
}

/// Build asset types from catalog input, rejecting malformed schemas.
pub fn build_catalog(input: CatalogInput) -> Result<Vec<AssetType>, ConfigError> {
    let mut enums = HashMap::new();
    for spec in &input.enums {
        let definition = spec.build()?;
        if enums
            .insert(normalize_key(definition.key()), Arc::new(definition))
            .is_some()
        {
            return Err(ConfigError::DuplicateEnum(spec.key.clone()));
        }
    }

    let mut asset_types: Vec<AssetType> = Vec::with_capacity(input.asset_types.len());
    for spec in &input.asset_types {
        let asset_type = spec.build(&enums)?;
        if asset_types
            .iter()
            .any(|t| normalize_key(t.name()) == normalize_key(asset_type.name()))
        {
            return Err(ConfigError::DuplicateAssetType(asset_type.name().to_string()));
        }
        log::debug!(
            "loaded asset type '{}' with {} attribute(s) and {} rule(s)",
            asset_type.name(),
            asset_type.expected_attributes().len(),
            asset_type.tax_rules().len()
        );
        asset_types.push(asset_type);
    }
    Ok(asset_types)
}

/// Read an asset-type catalog from JSON
pub fn read_catalog_json<R: Read>(reader: R) -> anyhow::Result<Vec<AssetType>> {
    let input: CatalogInput = serde_json::from_reader(reader)?;
    Ok(build_catalog(input)?)
}

/// JSON Schema of the catalog input format
pub fn catalog_schema() -> RootSchema {
    schema_for!(CatalogInput)
}
