use super::asset_type::{AssetType, EvaluationError};
use super::attribute::{AttributeError, ExtendedAttribute};
use super::data_type::AttributeDataType;
use super::rule::TaxLine;
use super::temporal::{now, Validity};
use super::violation::{join_violations, Violation};
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("invalid attributes: {}", join_violations(.violations))]
    InvalidAttributes { violations: Vec<Violation> },
}

/// An attribute set validated against an [`AssetType`], able to produce tax
/// lines.
///
/// Validation only happens in [`TaxableAsset::create`]. Attributes changed
/// afterwards are not re-checked.
#[derive(Debug, Clone)]
pub struct TaxableAsset {
    id: Uuid,
    asset_type: Arc<AssetType>,
    attributes: Vec<ExtendedAttribute>,
}

impl TaxableAsset {
    pub fn create(
        asset_type: Arc<AssetType>,
        attributes: Vec<ExtendedAttribute>,
    ) -> Result<Self, AssetError> {
        let violations = asset_type.validate_attributes(&attributes);
        if !violations.is_empty() {
            log::debug!(
                "rejecting asset of type '{}' with {} violation(s)",
                asset_type.name(),
                violations.len()
            );
            return Err(AssetError::InvalidAttributes { violations });
        }
        Ok(TaxableAsset {
            id: Uuid::now_v7(),
            asset_type,
            attributes,
        })
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn asset_type(&self) -> &AssetType {
        &self.asset_type
    }

    pub fn attributes(&self) -> &[ExtendedAttribute] {
        &self.attributes
    }

    /// Attributes whose validity window contains `at`.
    pub fn effective_attributes(&self, at: DateTime<FixedOffset>) -> Vec<ExtendedAttribute> {
        self.attributes
            .iter()
            .filter(|a| a.is_effective_at(at))
            .cloned()
            .collect()
    }

    /// One line per enabled rule of the asset type, in rule order.
    ///
    /// Rules are evaluated over the attributes effective at `for_date`
    /// (default now). A rule with no numeric result contributes a zero line.
    pub fn calculate_tax_lines(
        &self,
        base_amount: Option<Decimal>,
        for_date: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<TaxLine>, EvaluationError> {
        let at = for_date.unwrap_or_else(now);
        let effective = self.effective_attributes(at);
        log::debug!(
            "calculating tax lines for asset {} at {} over {} effective attribute(s)",
            self.id,
            at,
            effective.len()
        );

        self.asset_type
            .tax_rules()
            .iter()
            .filter(|rule| rule.enabled)
            .map(|rule| {
                let amount = self
                    .asset_type
                    .evaluate_tax_rule(&rule.key, &effective, base_amount)?
                    .unwrap_or(Decimal::ZERO);
                Ok(TaxLine::new(&rule.key, &rule.label, amount))
            })
            .collect()
    }

    /// The attribute with `key` effective at `at` (default now).
    pub fn attribute(
        &self,
        key: &str,
        at: Option<DateTime<FixedOffset>>,
    ) -> Option<&ExtendedAttribute> {
        let at = at.unwrap_or_else(now);
        self.attributes
            .iter()
            .find(|a| a.has_key(key) && a.is_effective_at(at))
    }

    /// Append a new attribute effective from now on.
    pub fn add_attribute(
        &mut self,
        key: &str,
        value: &str,
        data_type: AttributeDataType,
        is_required: bool,
    ) -> Result<&ExtendedAttribute, AttributeError> {
        let attribute = ExtendedAttribute::new(key, value, data_type, is_required)?;
        self.attributes.push(attribute);
        Ok(&self.attributes[self.attributes.len() - 1])
    }

    /// Update the currently effective attribute with `key` in place, restarting
    /// its validity at now, or append a new one if none is effective.
    pub fn add_or_update_attribute(
        &mut self,
        key: &str,
        value: &str,
        data_type: AttributeDataType,
        is_required: bool,
    ) -> Result<&ExtendedAttribute, AttributeError> {
        let at = now();
        match self
            .attributes
            .iter()
            .position(|a| a.has_key(key) && a.is_effective_at(at))
        {
            Some(index) => {
                let existing = &mut self.attributes[index];
                existing.update_value(value, data_type, is_required);
                existing.validity = Validity::new(at, None);
                Ok(&self.attributes[index])
            }
            None => self.add_attribute(key, value, data_type, is_required),
        }
    }

    /// Remove and return the attribute with `key` effective at `at` (default
    /// now).
    pub fn remove_attribute(
        &mut self,
        key: &str,
        at: Option<DateTime<FixedOffset>>,
    ) -> Option<ExtendedAttribute> {
        let at = at.unwrap_or_else(now);
        let index = self
            .attributes
            .iter()
            .position(|a| a.has_key(key) && a.is_effective_at(at))?;
        Some(self.attributes.remove(index))
    }
}
