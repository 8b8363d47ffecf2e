//! Data-driven asset schemas and formula-based tax rules.
//!
//! An [`AssetType`] declares the attributes an asset of that kind carries and
//! the [`TaxRule`]s that apply to it. A [`TaxableAsset`] binds a validated set
//! of [`ExtendedAttribute`]s to its type and turns the type's rules into
//! [`TaxLine`]s.

pub mod config;
pub mod domain;
pub mod expr;

pub use crate::config::{
    build_catalog, catalog_schema, read_catalog_json, CatalogInput, ConfigError,
};
pub use crate::domain::*;
pub use crate::expr::{Bindings, Evaluator, ExprError, FormulaEngine, Value};
