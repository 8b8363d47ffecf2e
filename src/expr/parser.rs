//! Formula parser.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! ternary        := or ( "?" ternary ":" ternary )?
//! or             := and ( ("||" | "or") and )*
//! and            := equality ( ("&&" | "and") equality )*
//! equality       := comparison ( ("==" | "=" | "!=" | "<>") comparison )*
//! comparison     := additive ( ("<" | "<=" | ">" | ">=") additive )*
//! additive       := multiplicative ( ("+" | "-") multiplicative )*
//! multiplicative := unary ( ("*" | "/" | "%") unary )*
//! unary          := ("-" | "!" | "not") unary | primary
//! primary        := "(" ternary ")" | number | string | "[" name "]"
//!                 | true | false | null | ident "(" args ")" | ident
//! ```
//!
//! Keywords and identifiers are case-insensitive. Parenthesised groups,
//! unary operators, call arguments and conditional branches may nest at most
//! [`MAX_NESTING`] levels, and no operator chain may build a tree deeper than
//! [`MAX_TREE_DEPTH`].

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::value::Value;
use super::ExprError;
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, tag_no_case, take_while},
    character::complete::{char, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, cut, map, map_res, not, opt, recognize, value},
    error::{context, convert_error, VerboseError, VerboseErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use rust_decimal::Decimal;
use std::str::FromStr;

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Deepest nesting of groups, unary operators, call arguments and branches.
pub const MAX_NESTING: usize = 64;

/// Deepest expression tree a formula may produce.
pub const MAX_TREE_DEPTH: usize = 256;

const TOO_DEEP: &str = "formula nested too deeply";

/// Parse a complete formula.
pub fn parse_formula(input: &str) -> Result<Expr, ExprError> {
    match all_consuming(ws(|i| ternary(i, 0)))(input) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) if is_too_deep(&e) => {
            Err(ExprError::Parse(TOO_DEEP.to_string()))
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(ExprError::Parse(convert_error(input, e)))
        }
        Err(nom::Err::Incomplete(_)) => Err(ExprError::Parse("incomplete formula".to_string())),
    }
}

fn too_deep(input: &str) -> nom::Err<VerboseError<&str>> {
    nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context(TOO_DEEP))],
    })
}

fn is_too_deep(error: &VerboseError<&str>) -> bool {
    error
        .errors
        .iter()
        .any(|(_, kind)| matches!(kind, VerboseErrorKind::Context(c) if *c == TOO_DEEP))
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> Res<'a, O>
where
    F: FnMut(&'a str) -> Res<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

// ============================================================================
// Operators
// ============================================================================

fn ternary(input: &str, depth: usize) -> Res<'_, Expr> {
    if depth > MAX_NESTING {
        return Err(too_deep(input));
    }
    let (input, condition) = or_expr(input, depth)?;
    let (input, branches) = opt(preceded(
        ws(char('?')),
        cut(pair(
            |i| ternary(i, depth + 1),
            preceded(
                context("':' of conditional", ws(char(':'))),
                |i| ternary(i, depth + 1),
            ),
        )),
    ))(input)?;
    let expr = match branches {
        Some((then, otherwise)) => Expr::conditional(condition, then, otherwise),
        None => condition,
    };
    Ok((input, expr))
}

/// Left-associative chain of `operand (operator operand)*`.
fn chain<'a>(
    input: &'a str,
    depth: usize,
    operand: fn(&'a str, usize) -> Res<'a, Expr>,
    operator: fn(&'a str) -> Res<'a, BinaryOp>,
) -> Res<'a, Expr> {
    let (input, first) = operand(input, depth)?;
    let (rest_input, rest) = many0(pair(ws(operator), cut(|i| operand(i, depth))))(input)?;
    let mut tree_depth = first.depth();
    let mut expr = first;
    for (op, rhs) in rest {
        tree_depth = tree_depth.max(rhs.depth()) + 1;
        if tree_depth > MAX_TREE_DEPTH {
            return Err(too_deep(input));
        }
        expr = Expr::binary(op, expr, rhs);
    }
    Ok((rest_input, expr))
}

fn or_expr(input: &str, depth: usize) -> Res<'_, Expr> {
    chain(input, depth, and_expr, or_op)
}

fn and_expr(input: &str, depth: usize) -> Res<'_, Expr> {
    chain(input, depth, equality, and_op)
}

fn equality(input: &str, depth: usize) -> Res<'_, Expr> {
    chain(input, depth, comparison, equality_op)
}

fn comparison(input: &str, depth: usize) -> Res<'_, Expr> {
    chain(input, depth, additive, comparison_op)
}

fn additive(input: &str, depth: usize) -> Res<'_, Expr> {
    chain(input, depth, multiplicative, additive_op)
}

fn multiplicative(input: &str, depth: usize) -> Res<'_, Expr> {
    chain(input, depth, unary, multiplicative_op)
}

fn or_op(input: &str) -> Res<'_, BinaryOp> {
    value(BinaryOp::Or, alt((tag("||"), keyword("or"))))(input)
}

fn and_op(input: &str) -> Res<'_, BinaryOp> {
    value(BinaryOp::And, alt((tag("&&"), keyword("and"))))(input)
}

fn equality_op(input: &str) -> Res<'_, BinaryOp> {
    alt((
        value(BinaryOp::Eq, tag("==")),
        value(BinaryOp::Ne, tag("!=")),
        value(BinaryOp::Ne, tag("<>")),
        value(BinaryOp::Eq, tag("=")),
    ))(input)
}

fn comparison_op(input: &str) -> Res<'_, BinaryOp> {
    alt((
        value(BinaryOp::Le, tag("<=")),
        value(BinaryOp::Ge, tag(">=")),
        value(BinaryOp::Lt, terminated(tag("<"), not(char('>')))),
        value(BinaryOp::Gt, tag(">")),
    ))(input)
}

fn additive_op(input: &str) -> Res<'_, BinaryOp> {
    alt((value(BinaryOp::Add, char('+')), value(BinaryOp::Sub, char('-'))))(input)
}

fn multiplicative_op(input: &str) -> Res<'_, BinaryOp> {
    alt((
        value(BinaryOp::Mul, char('*')),
        value(BinaryOp::Div, char('/')),
        value(BinaryOp::Rem, char('%')),
    ))(input)
}

fn unary(input: &str, depth: usize) -> Res<'_, Expr> {
    if depth > MAX_NESTING {
        return Err(too_deep(input));
    }
    let op = alt((
        value(UnaryOp::Negate, char('-')),
        value(UnaryOp::Not, terminated(char('!'), not(char('=')))),
        value(UnaryOp::Not, keyword("not")),
    ));
    alt((
        map(pair(ws(op), cut(|i| unary(i, depth + 1))), |(op, operand)| {
            Expr::unary(op, operand)
        }),
        |i| primary(i, depth),
    ))(input)
}

// ============================================================================
// Operands
// ============================================================================

fn primary(input: &str, depth: usize) -> Res<'_, Expr> {
    context(
        "operand",
        ws(alt((
            |i| parenthesized(i, depth),
            map(number, Expr::Literal),
            map(string_literal, |s| Expr::Literal(Value::Text(s))),
            map(bracket_variable, Expr::Variable),
            value(Expr::Literal(Value::Boolean(true)), keyword("true")),
            value(Expr::Literal(Value::Boolean(false)), keyword("false")),
            value(Expr::Literal(Value::Null), keyword("null")),
            |i| call(i, depth),
            map(identifier, Expr::variable),
        ))),
    )(input)
}

fn parenthesized(input: &str, depth: usize) -> Res<'_, Expr> {
    delimited(
        char('('),
        cut(ws(|i| ternary(i, depth + 1))),
        cut(context("closing parenthesis", char(')'))),
    )(input)
}

fn number(input: &str) -> Res<'_, Value> {
    map(
        map_res(
            recognize(tuple((
                digit1,
                opt(pair(char('.'), digit1)),
                opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
            ))),
            |text: &str| Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)),
        ),
        Value::Number,
    )(input)
}

fn string_literal(input: &str) -> Res<'_, String> {
    alt((quoted('"', "\\\""), quoted('\'', "\\'")))(input)
}

fn quoted<'a>(quote: char, stop: &'static str) -> impl FnMut(&'a str) -> Res<'a, String> {
    delimited(
        char(quote),
        map(
            opt(escaped_transform(
                is_not(stop),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("'", tag("'")),
                    value("\n", tag("n")),
                )),
            )),
            Option::unwrap_or_default,
        ),
        cut(context("closing quote", char(quote))),
    )
}

/// `[Attribute Key]`; the name may contain anything but `]`.
fn bracket_variable(input: &str) -> Res<'_, String> {
    map(
        delimited(
            char('['),
            take_while(|c| c != ']'),
            cut(context("closing bracket", char(']'))),
        ),
        |name: &str| name.trim().to_string(),
    )(input)
}

fn call(input: &str, depth: usize) -> Res<'_, Expr> {
    let (input, name) = identifier(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, args) = cut(terminated(
        separated_list0(ws(char(',')), |i| ternary(i, depth + 1)),
        context("closing parenthesis", ws(char(')'))),
    ))(input)?;
    Ok((
        input,
        Expr::Call {
            name: name.to_string(),
            args,
        },
    ))
}

fn identifier(input: &str) -> Res<'_, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    terminated(tag_no_case(word), not(satisfy(is_ident_char)))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
