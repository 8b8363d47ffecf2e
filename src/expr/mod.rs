//! Formula language for tax rules.
//!
//! Formulas are parsed into an [`Expr`] tree and evaluated over [`Bindings`].
//! Callers go through the [`FormulaEngine`] trait so the language can be
//! swapped without touching the domain types.

mod ast;
mod eval;
mod parser;
mod value;

pub use self::{
    ast::{BinaryOp, Expr, UnaryOp},
    parser::{parse_formula, MAX_NESTING, MAX_TREE_DEPTH},
    value::{Bindings, Value},
};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("failed to parse formula: {0}")]
    Parse(String),
    #[error("unknown variable '{0}'")]
    UnboundVariable(String),
    #[error("cannot apply '{operator}' to {operands}")]
    TypeMismatch { operator: String, operands: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("numeric overflow evaluating {0}")]
    Overflow(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function '{function}' expects {expected} argument(s), found {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },
}

/// Evaluates formula text over a set of bindings.
pub trait FormulaEngine {
    fn evaluate(&self, formula: &str, bindings: &Bindings) -> Result<Value, ExprError>;
}

/// The built-in formula language.
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

impl FormulaEngine for Evaluator {
    fn evaluate(&self, formula: &str, bindings: &Bindings) -> Result<Value, ExprError> {
        parse_formula(formula)?.evaluate(bindings)
    }
}

/// Parse and evaluate in one step with the built-in language.
pub fn evaluate(formula: &str, bindings: &Bindings) -> Result<Value, ExprError> {
    Evaluator.evaluate(formula, bindings)
}
