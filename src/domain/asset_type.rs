use super::attribute::{index_by_key, ExtendedAttribute};
use super::data_type::{parse_number, AttributeDataType};
use super::normalize_key;
use super::rule::TaxRule;
use super::schema::AttributeDefinition;
use super::violation::Violation;
use crate::expr::{Bindings, Evaluator, ExprError, FormulaEngine, Value};
use regex::Regex;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Variable name under which a caller-supplied base amount is bound.
pub const AMOUNT_VARIABLE: &str = "amount";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssetTypeError {
    #[error("asset type name must not be blank")]
    BlankName,
    #[error("an expected attribute with key '{0}' already exists")]
    DuplicateAttribute(String),
    #[error("tax rule key must not be blank")]
    BlankRuleKey,
    #[error("a tax rule with key '{0}' already exists")]
    DuplicateRule(String),
}

/// A tax rule's formula could not be evaluated.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("failed to evaluate tax rule '{rule}': {source}")]
pub struct EvaluationError {
    pub rule: String,
    #[source]
    pub source: ExprError,
}

/// Aggregate declaring the attribute schema and tax rules for a category of
/// taxable asset.
///
/// Expected attributes and tax rules are unique by key, ignoring case. The
/// collections are only reachable through the methods below, which keep that
/// invariant.
#[derive(Debug, Clone)]
pub struct AssetType {
    id: Uuid,
    name: String,
    description: Option<String>,
    expected_attributes: Vec<AttributeDefinition>,
    tax_rules: Vec<TaxRule>,
}

impl AssetType {
    pub fn create(name: &str, description: Option<&str>) -> Result<Self, AssetTypeError> {
        Ok(AssetType {
            id: Uuid::now_v7(),
            name: require_name(name)?,
            description: clean_description(description),
            expected_attributes: Vec::new(),
            tax_rules: Vec::new(),
        })
    }

    /// Replace the generated identifier, e.g. when reloading a stored type.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn rename(&mut self, name: &str) -> Result<&mut Self, AssetTypeError> {
        self.name = require_name(name)?;
        Ok(self)
    }

    /// A missing or blank description clears it.
    pub fn update_description(&mut self, description: Option<&str>) -> &mut Self {
        self.description = clean_description(description);
        self
    }

    pub fn expected_attributes(&self) -> &[AttributeDefinition] {
        &self.expected_attributes
    }

    pub fn tax_rules(&self) -> &[TaxRule] {
        &self.tax_rules
    }

    pub fn add_expected_attribute(
        &mut self,
        definition: AttributeDefinition,
    ) -> Result<&mut Self, AssetTypeError> {
        if self.has_expected_attribute(definition.key()) {
            return Err(AssetTypeError::DuplicateAttribute(
                definition.key().to_string(),
            ));
        }
        self.expected_attributes.push(definition);
        Ok(self)
    }

    /// Returns whether a definition was removed.
    pub fn remove_expected_attribute(&mut self, key: &str) -> bool {
        let before = self.expected_attributes.len();
        if !normalize_key(key).is_empty() {
            self.expected_attributes.retain(|d| !d.has_key(key));
        }
        self.expected_attributes.len() != before
    }

    /// Removes the definition sharing `definition`'s key.
    pub fn remove_expected_attribute_definition(
        &mut self,
        definition: &AttributeDefinition,
    ) -> bool {
        self.remove_expected_attribute(definition.key())
    }

    pub fn has_expected_attribute(&self, key: &str) -> bool {
        self.expected_attribute(key).is_some()
    }

    pub fn expected_attribute(&self, key: &str) -> Option<&AttributeDefinition> {
        if normalize_key(key).is_empty() {
            return None;
        }
        self.expected_attributes.iter().find(|d| d.has_key(key))
    }

    pub fn add_tax_rule(&mut self, rule: TaxRule) -> Result<&mut Self, AssetTypeError> {
        if normalize_key(&rule.key).is_empty() {
            return Err(AssetTypeError::BlankRuleKey);
        }
        if self.has_tax_rule(&rule.key) {
            return Err(AssetTypeError::DuplicateRule(rule.key));
        }
        self.tax_rules.push(rule);
        Ok(self)
    }

    /// Returns whether a rule was removed.
    pub fn remove_tax_rule(&mut self, key: &str) -> bool {
        let before = self.tax_rules.len();
        let key = normalize_key(key);
        if !key.is_empty() {
            self.tax_rules.retain(|r| normalize_key(&r.key) != key);
        }
        self.tax_rules.len() != before
    }

    pub fn has_tax_rule(&self, key: &str) -> bool {
        self.tax_rule(key).is_some()
    }

    pub fn tax_rule(&self, key: &str) -> Option<&TaxRule> {
        let key = normalize_key(key);
        if key.is_empty() {
            return None;
        }
        self.tax_rules.iter().find(|r| normalize_key(&r.key) == key)
    }

    /// Check an attribute set against the expected-attribute schema.
    ///
    /// Definitions are checked in declaration order. An empty result means
    /// the set satisfies the schema. Blank values of optional attributes are
    /// not matched against patterns or enum codes.
    pub fn validate_attributes(&self, attributes: &[ExtendedAttribute]) -> Vec<Violation> {
        let index = index_by_key(attributes);
        let distinct = attributes
            .iter()
            .filter(|a| !normalize_key(&a.key).is_empty())
            .count();
        if index.len() < distinct {
            log::warn!(
                "asset type '{}': {} attribute(s) share a key, using the latest valid_from",
                self.name,
                distinct - index.len()
            );
        }

        let mut violations = Vec::new();
        for definition in &self.expected_attributes {
            let provided = match index.get(&normalize_key(definition.key())) {
                Some(provided) => *provided,
                None if definition.is_required() => {
                    violations.push(Violation::MissingRequired {
                        key: definition.key().to_string(),
                    });
                    continue;
                }
                None => continue,
            };
            check_attribute(definition, provided, &mut violations);
        }
        violations
    }

    /// Evaluate one rule with the built-in formula language.
    ///
    /// Returns `Ok(None)` when the rule is unknown, disabled, or produces a
    /// non-numeric result.
    pub fn evaluate_tax_rule(
        &self,
        key: &str,
        attributes: &[ExtendedAttribute],
        amount: Option<Decimal>,
    ) -> Result<Option<Decimal>, EvaluationError> {
        self.evaluate_tax_rule_with(&Evaluator, key, attributes, amount)
    }

    pub fn evaluate_tax_rule_with(
        &self,
        engine: &impl FormulaEngine,
        key: &str,
        attributes: &[ExtendedAttribute],
        amount: Option<Decimal>,
    ) -> Result<Option<Decimal>, EvaluationError> {
        let rule = match self.tax_rule(key) {
            Some(rule) if rule.enabled => rule,
            Some(_) => {
                log::debug!("tax rule '{}' is disabled", key);
                return Ok(None);
            }
            None => return Ok(None),
        };

        let result = self
            .bind(attributes, amount)
            .and_then(|bindings| engine.evaluate(&rule.expression, &bindings))
            .map_err(|source| EvaluationError {
                rule: rule.key.clone(),
                source,
            })?;
        let amount = result.to_decimal();
        if amount.is_none() {
            log::debug!(
                "tax rule '{}' produced non-numeric {} result",
                rule.key,
                result.type_name()
            );
        }
        Ok(amount)
    }

    /// Schema keys bind as null so that optional attributes may be absent.
    ///
    /// A Number attribute whose text is a finite float outside the decimal
    /// range fails with [`ExprError::Overflow`] instead of binding as text.
    fn bind(
        &self,
        attributes: &[ExtendedAttribute],
        amount: Option<Decimal>,
    ) -> Result<Bindings, ExprError> {
        let mut bindings = Bindings::new();
        for definition in &self.expected_attributes {
            bindings.bind(definition.key(), Value::Null);
        }
        for attribute in index_by_key(attributes).into_values() {
            let value = Value::from_raw(&attribute.value);
            if attribute.data_type == AttributeDataType::Number
                && !matches!(value, Value::Number(_))
                && parse_number(&attribute.value).is_some()
            {
                return Err(ExprError::Overflow(format!(
                    "attribute '{}' = '{}'",
                    attribute.key,
                    attribute.value.trim()
                )));
            }
            bindings.bind(&attribute.key, value);
        }
        if let Some(amount) = amount {
            bindings.bind(AMOUNT_VARIABLE, amount);
        }
        Ok(bindings)
    }
}

fn check_attribute(
    definition: &AttributeDefinition,
    provided: &ExtendedAttribute,
    violations: &mut Vec<Violation>,
) {
    let key = definition.key();
    if provided.data_type.code() != definition.data_type().code() {
        violations.push(Violation::TypeMismatch {
            key: key.to_string(),
            expected: definition.data_type(),
            actual: provided.data_type,
        });
    }

    if !provided.is_valid_value() {
        violations.push(Violation::InvalidValue {
            key: key.to_string(),
            data_type: provided.data_type,
        });
    }

    if provided.is_blank() && !definition.is_required() {
        return;
    }

    if let Some(pattern) = definition.regex_pattern() {
        match Regex::new(&format!("^(?:{pattern})$")) {
            Ok(regex) if regex.is_match(&provided.value) => {}
            Ok(_) => violations.push(Violation::PatternMismatch {
                key: key.to_string(),
                value: provided.value.clone(),
                pattern: pattern.to_string(),
            }),
            Err(e) => {
                log::warn!("definition '{}' has an invalid pattern: {}", key, e);
                violations.push(Violation::InvalidPattern {
                    key: key.to_string(),
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    if definition.data_type() == AttributeDataType::Enum {
        match definition.enum_definition().filter(|e| !e.is_empty()) {
            None => violations.push(Violation::MissingEnumDefinition {
                key: key.to_string(),
            }),
            Some(enum_definition) if enum_definition.item(&provided.value).is_none() => {
                violations.push(Violation::DisallowedEnumValue {
                    key: key.to_string(),
                    value: provided.value.trim().to_string(),
                    allowed: enum_definition.codes().map(str::to_string).collect(),
                })
            }
            Some(_) => {}
        }
    }
}

fn require_name(name: &str) -> Result<String, AssetTypeError> {
    match name.trim() {
        "" => Err(AssetTypeError::BlankName),
        name => Ok(name.to_string()),
    }
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::EnumDefinition;
    use crate::domain::temporal::{parse_datetime, Validity};
    use rust_decimal_macros::dec;

    fn attr(key: &str, value: &str, data_type: AttributeDataType) -> ExtendedAttribute {
        ExtendedAttribute::new(key, value, data_type, false).unwrap()
    }

    fn real_estate_type() -> EnumDefinition {
        EnumDefinition::new("RealEstateType", "Type de bien")
            .unwrap()
            .with_item("PB", "Propriété Bâtie", 1)
            .unwrap()
            .with_item("PNB", "Propriété Non Bâtie", 2)
            .unwrap()
    }

    fn schema() -> AssetType {
        let mut asset_type = AssetType::create("RealEstate", Some("Biens immobiliers")).unwrap();
        asset_type
            .add_expected_attribute(
                AttributeDefinition::new(
                    "ResidualValue",
                    "Valeur résiduelle",
                    AttributeDataType::Number,
                    true,
                    None,
                )
                .unwrap(),
            )
            .unwrap()
            .add_expected_attribute(AttributeDefinition::from_enum(real_estate_type(), false))
            .unwrap();
        asset_type
    }

    #[test]
    fn create_trims_and_rejects_blank_name() {
        let asset_type = AssetType::create("  Vehicle ", Some("  ")).unwrap();
        assert_eq!(asset_type.name(), "Vehicle");
        assert_eq!(asset_type.description(), None);
        assert_eq!(
            AssetType::create(" ", None).unwrap_err(),
            AssetTypeError::BlankName
        );
    }

    #[test]
    fn rename_and_update_description() {
        let mut asset_type = AssetType::create("A", None).unwrap();
        assert_eq!(
            asset_type.rename("").unwrap_err(),
            AssetTypeError::BlankName
        );
        asset_type.rename(" B ").unwrap().update_description(Some(" d "));
        assert_eq!(asset_type.name(), "B");
        assert_eq!(asset_type.description(), Some("d"));
        asset_type.update_description(None);
        assert_eq!(asset_type.description(), None);
    }

    #[test]
    fn expected_attribute_keys_are_unique_ignoring_case() {
        let mut asset_type = schema();
        let duplicate =
            AttributeDefinition::new("residualvalue", "x", AttributeDataType::Number, false, None)
                .unwrap();
        assert_eq!(
            asset_type.add_expected_attribute(duplicate).unwrap_err(),
            AssetTypeError::DuplicateAttribute("residualvalue".to_string())
        );
        assert!(asset_type.has_expected_attribute("RESIDUALVALUE"));
        assert!(!asset_type.has_expected_attribute("  "));
        assert_eq!(
            asset_type.expected_attribute("realestatetype").map(|d| d.label()),
            Some("Type de bien")
        );
    }

    #[test]
    fn remove_expected_attribute_reports_whether_removed() {
        let mut asset_type = schema();
        assert!(asset_type.remove_expected_attribute("residualVALUE"));
        assert!(!asset_type.remove_expected_attribute("residualvalue"));
        assert!(!asset_type.remove_expected_attribute(""));
        assert_eq!(asset_type.expected_attributes().len(), 1);
    }

    #[test]
    fn remove_expected_attribute_by_definition_matches_on_key() {
        let mut asset_type = schema();
        let same_key = AttributeDefinition::new(
            " RESIDUALVALUE ",
            "other",
            AttributeDataType::String,
            false,
            None,
        )
        .unwrap();
        assert!(asset_type.remove_expected_attribute_definition(&same_key));
        assert!(!asset_type.remove_expected_attribute_definition(&same_key));
        assert!(!asset_type.has_expected_attribute("ResidualValue"));
        assert!(asset_type.remove_expected_attribute_definition(&AttributeDefinition::from_enum(
            real_estate_type(),
            true
        )));
        assert!(asset_type.expected_attributes().is_empty());
    }

    #[test]
    fn tax_rule_keys_are_unique_ignoring_case() {
        let mut asset_type = schema();
        asset_type
            .add_tax_rule(TaxRule::new("TFB", "Foncier bâti", "0").unwrap())
            .unwrap();
        assert_eq!(
            asset_type
                .add_tax_rule(TaxRule::new("tfb", "dup", "1").unwrap())
                .unwrap_err(),
            AssetTypeError::DuplicateRule("tfb".to_string())
        );
        let mut blank = TaxRule::new("X", "x", "1").unwrap();
        blank.key = " ".to_string();
        assert_eq!(
            asset_type.add_tax_rule(blank).unwrap_err(),
            AssetTypeError::BlankRuleKey
        );
        assert!(asset_type.has_tax_rule("Tfb"));
        assert!(asset_type.remove_tax_rule("TFB"));
        assert!(!asset_type.remove_tax_rule("TFB"));
    }

    #[test]
    fn valid_attributes_produce_no_violations() {
        let attributes = [
            attr("residualvalue", "1000", AttributeDataType::Number),
            attr("RealEstateType", "pb", AttributeDataType::Enum),
        ];
        assert_eq!(schema().validate_attributes(&attributes), vec![]);
    }

    #[test]
    fn missing_required_skips_further_checks() {
        let violations = schema().validate_attributes(&[]);
        assert_eq!(
            violations,
            vec![Violation::MissingRequired {
                key: "ResidualValue".to_string()
            }]
        );
    }

    #[test]
    fn type_mismatch_and_invalid_value_both_reported() {
        let violations = schema()
            .validate_attributes(&[attr("ResidualValue", "abc", AttributeDataType::Boolean)]);
        assert_eq!(
            violations,
            vec![
                Violation::TypeMismatch {
                    key: "ResidualValue".to_string(),
                    expected: AttributeDataType::Number,
                    actual: AttributeDataType::Boolean,
                },
                Violation::InvalidValue {
                    key: "ResidualValue".to_string(),
                    data_type: AttributeDataType::Boolean,
                },
            ]
        );

        let violations = schema()
            .validate_attributes(&[attr("ResidualValue", "abc", AttributeDataType::String)]);
        assert_eq!(
            violations,
            vec![Violation::TypeMismatch {
                key: "ResidualValue".to_string(),
                expected: AttributeDataType::Number,
                actual: AttributeDataType::String,
            }]
        );

        let violations = schema()
            .validate_attributes(&[attr("ResidualValue", "abc", AttributeDataType::Number)]);
        assert_eq!(
            violations,
            vec![Violation::InvalidValue {
                key: "ResidualValue".to_string(),
                data_type: AttributeDataType::Number,
            }]
        );
    }

    #[test]
    fn enum_label_is_not_an_allowed_value() {
        let violations = schema().validate_attributes(&[
            attr("ResidualValue", "1", AttributeDataType::Number),
            attr("RealEstateType", "Propriété Bâtie", AttributeDataType::Enum),
        ]);
        assert_eq!(violations.len(), 2);
        assert!(matches!(violations[0], Violation::PatternMismatch { .. }));
        assert_eq!(
            violations[1],
            Violation::DisallowedEnumValue {
                key: "RealEstateType".to_string(),
                value: "Propriété Bâtie".to_string(),
                allowed: vec!["PB".to_string(), "PNB".to_string()],
            }
        );
    }

    #[test]
    fn blank_optional_value_is_accepted() {
        let violations = schema().validate_attributes(&[
            attr("ResidualValue", "1", AttributeDataType::Number),
            attr("RealEstateType", " ", AttributeDataType::Enum),
        ]);
        assert_eq!(violations, vec![]);
    }

    #[test]
    fn user_patterns_are_anchored() {
        let mut asset_type = AssetType::create("Vehicle", None).unwrap();
        asset_type
            .add_expected_attribute(
                AttributeDefinition::new(
                    "Plate",
                    "Plaque",
                    AttributeDataType::String,
                    true,
                    Some("[A-Z]{2}-\\d{3}"),
                )
                .unwrap(),
            )
            .unwrap()
            .add_expected_attribute(
                AttributeDefinition::new(
                    "Code",
                    "Code",
                    AttributeDataType::String,
                    false,
                    Some("("),
                )
                .unwrap(),
            )
            .unwrap();
        let violations = asset_type.validate_attributes(&[
            attr("Plate", "xAB-123", AttributeDataType::String),
            attr("Code", "1", AttributeDataType::String),
        ]);
        assert!(matches!(&violations[0], Violation::PatternMismatch { key, .. } if key == "Plate"));
        assert!(matches!(&violations[1], Violation::InvalidPattern { key, .. } if key == "Code"));

        let violations =
            asset_type.validate_attributes(&[attr("Plate", "AB-123", AttributeDataType::String)]);
        assert_eq!(violations, vec![]);
    }

    #[test]
    fn empty_enum_is_a_missing_definition() {
        let mut asset_type = AssetType::create("T", None).unwrap();
        asset_type
            .add_expected_attribute(AttributeDefinition::from_enum(
                EnumDefinition::new("Kind", "Kind").unwrap(),
                true,
            ))
            .unwrap()
            .add_expected_attribute(
                AttributeDefinition::new("Other", "Other", AttributeDataType::Enum, false, None)
                    .unwrap(),
            )
            .unwrap();
        let violations = asset_type.validate_attributes(&[
            attr("Kind", "A", AttributeDataType::Enum),
            attr("Other", "B", AttributeDataType::Enum),
        ]);
        assert!(violations.contains(&Violation::MissingEnumDefinition {
            key: "Kind".to_string()
        }));
        assert!(violations.contains(&Violation::MissingEnumDefinition {
            key: "Other".to_string()
        }));
    }

    #[test]
    fn duplicate_keys_resolve_to_latest_valid_from() {
        let older = attr("ResidualValue", "abc", AttributeDataType::Number)
            .with_validity(Validity::new(parse_datetime("2020-01-01").unwrap(), None));
        let newer = attr("residualvalue", "100", AttributeDataType::Number)
            .with_validity(Validity::new(parse_datetime("2024-01-01").unwrap(), None));
        let mut asset_type = schema();
        asset_type
            .add_tax_rule(TaxRule::new("R", "r", "[ResidualValue]").unwrap())
            .unwrap();
        assert_eq!(
            asset_type.validate_attributes(&[newer.clone(), older.clone()]),
            vec![]
        );
        assert_eq!(
            asset_type.evaluate_tax_rule_with(&Evaluator, "R", &[older, newer], None),
            Ok(Some(dec!(100)))
        );
    }

    #[test]
    fn evaluate_simple_rule() {
        let mut asset_type = AssetType::create("T", None).unwrap();
        asset_type
            .add_tax_rule(TaxRule::new("R1", "r1", "[ResidualValue]*0.01").unwrap())
            .unwrap();
        let attributes = [attr("ResidualValue", "200", AttributeDataType::Number)];
        assert_eq!(
            asset_type.evaluate_tax_rule("r1", &attributes, None),
            Ok(Some(dec!(2)))
        );
    }

    #[test]
    fn unknown_and_disabled_rules_yield_none() {
        let mut asset_type = AssetType::create("T", None).unwrap();
        asset_type
            .add_tax_rule(TaxRule::new("Off", "off", "1").unwrap().disabled())
            .unwrap();
        assert_eq!(asset_type.evaluate_tax_rule("Off", &[], None), Ok(None));
        assert_eq!(asset_type.evaluate_tax_rule("Nope", &[], None), Ok(None));
    }

    #[test]
    fn amount_binding_overrides_attribute() {
        let mut asset_type = AssetType::create("T", None).unwrap();
        asset_type
            .add_tax_rule(TaxRule::new("R", "r", "amount * 0.2").unwrap())
            .unwrap();
        let attributes = [attr("Amount", "5", AttributeDataType::Number)];
        assert_eq!(
            asset_type.evaluate_tax_rule("R", &attributes, Some(dec!(100))),
            Ok(Some(dec!(20)))
        );
        assert_eq!(
            asset_type.evaluate_tax_rule("R", &attributes, None),
            Ok(Some(dec!(1)))
        );
    }

    #[test]
    fn non_numeric_result_is_none() {
        let mut asset_type = AssetType::create("T", None).unwrap();
        asset_type
            .add_tax_rule(TaxRule::new("Flag", "f", "1 > 0").unwrap())
            .unwrap()
            .add_tax_rule(TaxRule::new("Text", "t", "'12.5'").unwrap())
            .unwrap();
        assert_eq!(asset_type.evaluate_tax_rule("Flag", &[], None), Ok(None));
        assert_eq!(
            asset_type.evaluate_tax_rule("Text", &[], None),
            Ok(Some(dec!(12.5)))
        );
    }

    #[test]
    fn number_outside_decimal_range_overflows_instead_of_binding_as_text() {
        let mut asset_type = schema();
        asset_type
            .add_tax_rule(TaxRule::new("R", "r", "[ResidualValue] * 0.01").unwrap())
            .unwrap();
        let huge = [attr("ResidualValue", "1e30", AttributeDataType::Number)];
        assert_eq!(
            asset_type.validate_attributes(&huge),
            vec![Violation::InvalidValue {
                key: "ResidualValue".to_string(),
                data_type: AttributeDataType::Number,
            }]
        );
        assert_eq!(
            asset_type.evaluate_tax_rule("R", &huge, None),
            Err(EvaluationError {
                rule: "R".to_string(),
                source: ExprError::Overflow("attribute 'ResidualValue' = '1e30'".to_string()),
            })
        );

        // the same text on a String attribute is ordinary text
        let text = [attr("ResidualValue", "1e30", AttributeDataType::String)];
        assert!(matches!(
            asset_type.evaluate_tax_rule("R", &text, None),
            Err(EvaluationError {
                source: ExprError::TypeMismatch { .. },
                ..
            })
        ));
    }

    #[test]
    fn evaluation_failures_carry_the_rule_key() {
        let mut asset_type = schema();
        asset_type
            .add_tax_rule(TaxRule::new("Bad", "b", "[Unknown] * 2").unwrap())
            .unwrap()
            .add_tax_rule(TaxRule::new("Broken", "b", "1 +").unwrap())
            .unwrap()
            .add_tax_rule(
                TaxRule::new("Optional", "o", "[RealEstateType] == 'PB' ? 1 : 0").unwrap(),
            )
            .unwrap();
        assert_eq!(
            asset_type.evaluate_tax_rule("bad", &[], None),
            Err(EvaluationError {
                rule: "Bad".to_string(),
                source: ExprError::UnboundVariable("Unknown".to_string()),
            })
        );
        assert!(matches!(
            asset_type.evaluate_tax_rule("Broken", &[], None),
            Err(EvaluationError {
                source: ExprError::Parse(_),
                ..
            })
        ));
        // declared but absent attributes bind as null
        assert_eq!(
            asset_type.evaluate_tax_rule("Optional", &[], None),
            Ok(Some(dec!(0)))
        );
    }
}
