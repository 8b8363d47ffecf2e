use super::temporal::Validity;
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("tax rule key must not be blank")]
    BlankKey,
}

/// A named formula producing a monetary amount from an asset's attributes.
///
/// Formula variables are attribute keys, plus `amount` when a base amount is
/// supplied at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxRule {
    pub key: String,
    pub label: String,
    pub expression: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub validity: Validity,
}

impl TaxRule {
    /// Enabled rule valid at all times.
    pub fn new(key: &str, label: &str, expression: &str) -> Result<Self, RuleError> {
        if key.trim().is_empty() {
            return Err(RuleError::BlankKey);
        }
        Ok(TaxRule {
            key: key.trim().to_string(),
            label: label.trim().to_string(),
            expression: expression.trim().to_string(),
            description: None,
            enabled: true,
            validity: Validity::always(),
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.trim().to_string()).filter(|d| !d.is_empty());
        self
    }

    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_effective_at(&self, at: DateTime<FixedOffset>) -> bool {
        self.validity.contains(at)
    }
}

/// Result of evaluating one tax rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaxLine {
    /// Key of the rule that produced this line
    pub key: String,
    pub label: String,
    #[schemars(with = "f64")]
    pub amount: Decimal,
}

impl TaxLine {
    pub fn new(key: &str, label: &str, amount: Decimal) -> Self {
        TaxLine {
            key: key.to_string(),
            label: label.to_string(),
            amount,
        }
    }
}
