use super::ast::{BinaryOp, Expr, UnaryOp};
use super::value::{Bindings, Value};
use super::ExprError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;

impl Expr {
    /// Evaluate against the given bindings.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<Value, ExprError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => bindings
                .get(name)
                .cloned()
                .ok_or_else(|| ExprError::UnboundVariable(name.clone())),
            Expr::Unary { op, operand } => unary(*op, operand.evaluate(bindings)?),
            Expr::Binary { op, lhs, rhs } => match op {
                BinaryOp::And => {
                    if condition(lhs.evaluate(bindings)?, "&&")? {
                        condition(rhs.evaluate(bindings)?, "&&").map(Value::Boolean)
                    } else {
                        Ok(Value::Boolean(false))
                    }
                }
                BinaryOp::Or => {
                    if condition(lhs.evaluate(bindings)?, "||")? {
                        Ok(Value::Boolean(true))
                    } else {
                        condition(rhs.evaluate(bindings)?, "||").map(Value::Boolean)
                    }
                }
                _ => binary(*op, lhs.evaluate(bindings)?, rhs.evaluate(bindings)?),
            },
            Expr::Conditional {
                condition: test,
                then,
                otherwise,
            } => {
                if condition(test.evaluate(bindings)?, "?:")? {
                    then.evaluate(bindings)
                } else {
                    otherwise.evaluate(bindings)
                }
            }
            Expr::Call { name, args } => call(name, args, bindings),
        }
    }
}

fn type_mismatch(operator: &str, operands: &[&Value]) -> ExprError {
    ExprError::TypeMismatch {
        operator: operator.to_string(),
        operands: operands
            .iter()
            .map(|v| v.type_name())
            .collect::<Vec<_>>()
            .join(" and "),
    }
}

fn condition(value: Value, operator: &str) -> Result<bool, ExprError> {
    match value {
        Value::Boolean(b) => Ok(b),
        other => Err(type_mismatch(operator, &[&other])),
    }
}

fn number(value: &Value, operator: &str) -> Result<Decimal, ExprError> {
    value
        .as_number()
        .ok_or_else(|| type_mismatch(operator, &[value]))
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value, ExprError> {
    match op {
        UnaryOp::Negate if operand.is_null() => Ok(Value::Null),
        UnaryOp::Negate => Ok(Value::Number(-number(&operand, "-")?)),
        UnaryOp::Not => condition(operand, "!").map(|b| Value::Boolean(!b)),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    match op {
        BinaryOp::Eq => Ok(Value::Boolean(equals(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Boolean(!equals(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match compare(op, &lhs, &rhs)? {
                Some(ordering) => ordering,
                None => return Ok(Value::Boolean(false)),
            };
            Ok(Value::Boolean(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        _ => arithmetic(op, lhs, rhs),
    }
}

fn equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Text(a), Value::Text(b)) => a == b,
        (Value::Number(_), Value::Text(_)) | (Value::Text(_), Value::Number(_)) => {
            matches!((lhs.as_number(), rhs.as_number()), (Some(a), Some(b)) if a == b)
        }
        _ => false,
    }
}

/// `None` when either side is null.
fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Option<Ordering>, ExprError> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(None);
    }
    if let (Value::Text(a), Value::Text(b)) = (lhs, rhs) {
        if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
            return Ok(Some(a.cmp(&b)));
        }
        return Ok(Some(a.cmp(b)));
    }
    match (lhs.as_number(), rhs.as_number()) {
        (Some(a), Some(b)) => Ok(Some(a.cmp(&b))),
        _ => Err(type_mismatch(&op.to_string(), &[lhs, rhs])),
    }
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }
    if let (BinaryOp::Add, Value::Text(a), Value::Text(b)) = (op, &lhs, &rhs) {
        return Ok(Value::Text(format!("{a}{b}")));
    }
    let symbol = op.to_string();
    let (a, b) = match (lhs.as_number(), rhs.as_number()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(type_mismatch(&symbol, &[&lhs, &rhs])),
    };
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div | BinaryOp::Rem if b.is_zero() => return Err(ExprError::DivisionByZero),
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Rem => a.checked_rem(b),
        _ => return Err(type_mismatch(&symbol, &[&lhs, &rhs])),
    };
    result
        .map(Value::Number)
        .ok_or_else(|| ExprError::Overflow(format!("{a} {symbol} {b}")))
}

fn arity(function: &str, expected: &str, found: usize) -> ExprError {
    ExprError::Arity {
        function: function.to_string(),
        expected: expected.to_string(),
        found,
    }
}

fn call(name: &str, args: &[Expr], bindings: &Bindings) -> Result<Value, ExprError> {
    let function = name.to_lowercase();
    if function == "if" {
        return match args {
            [test, then, otherwise] => {
                if condition(test.evaluate(bindings)?, "if")? {
                    then.evaluate(bindings)
                } else {
                    otherwise.evaluate(bindings)
                }
            }
            _ => Err(arity(name, "3", args.len())),
        };
    }

    let values = args
        .iter()
        .map(|arg| arg.evaluate(bindings))
        .collect::<Result<Vec<_>, _>>()?;
    match function.as_str() {
        "min" | "max" => {
            if values.is_empty() {
                return Err(arity(name, "at least 1", 0));
            }
            if values.iter().any(Value::is_null) {
                return Ok(Value::Null);
            }
            let numbers = values
                .iter()
                .map(|v| number(v, &function))
                .collect::<Result<Vec<_>, _>>()?;
            let extreme = if function == "min" {
                numbers.into_iter().min()
            } else {
                numbers.into_iter().max()
            };
            Ok(extreme.map_or(Value::Null, Value::Number))
        }
        "abs" | "floor" | "ceiling" => {
            let [value] = values.as_slice() else {
                return Err(arity(name, "1", values.len()));
            };
            if value.is_null() {
                return Ok(Value::Null);
            }
            let n = number(value, &function)?;
            Ok(Value::Number(match function.as_str() {
                "abs" => n.abs(),
                "floor" => n.floor(),
                _ => n.ceil(),
            }))
        }
        "round" => {
            let (value, places) = match values.as_slice() {
                [value] => (value, None),
                [value, places] => (value, Some(places)),
                _ => return Err(arity(name, "1 or 2", values.len())),
            };
            if value.is_null() || places.map_or(false, Value::is_null) {
                return Ok(Value::Null);
            }
            let n = number(value, "round")?;
            let dp = match places {
                Some(places) => number(places, "round")?
                    .to_u32()
                    .filter(|dp| *dp <= 28)
                    .ok_or_else(|| type_mismatch("round", &[places]))?,
                None => 0,
            };
            Ok(Value::Number(
                n.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven),
            ))
        }
        _ => Err(ExprError::UnknownFunction(name.to_string())),
    }
}
