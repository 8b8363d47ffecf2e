pub mod asset;
pub mod asset_type;
pub mod attribute;
pub mod data_type;
pub mod rule;
pub mod schema;
pub mod temporal;
pub mod violation;

pub use self::{
    asset::{AssetError, TaxableAsset},
    asset_type::{AssetType, AssetTypeError, EvaluationError},
    attribute::{AttributeError, ExtendedAttribute},
    data_type::{AttributeDataType, TypedValue, ValueError},
    rule::{RuleError, TaxLine, TaxRule},
    schema::{AttributeDefinition, EnumDefinition, EnumItem, SchemaError},
    temporal::{parse_datetime, InvalidDatetime, Validity},
    violation::{join_violations, Violation},
};

/// Canonical form of an attribute, definition or rule key for lookups.
pub(crate) fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Keys match ignoring surrounding whitespace and case.
pub(crate) fn key_eq(a: &str, b: &str) -> bool {
    normalize_key(a) == normalize_key(b)
}
