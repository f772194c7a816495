//! Filter and sort expression parsing.
//!
//! This module turns the small textual DSL accepted by the model
//! (`"test >= 2"`, `"name LIKE qwe%"`, `"field ASC"`, `"field 1"`) into
//! structured, typed expressions. Parsing is pure and synchronous: every
//! malformed expression fails here, before any query is built or sent.
//!
//! # Filter expressions
//!
//! A filter is `<field> <operator> <operand>`:
//!
//! - field: ASCII alphanumeric or underscore
//! - operator: one of `==`, `!=`, `<`, `<=`, `>`, `>=`, `LIKE`
//!   (case-insensitive)
//! - operand: everything after the operator token, so values with internal
//!   whitespace survive intact
//!
//! The operand is typed by inspection: a bare `null` becomes a null operand,
//! an unquoted finite number becomes a numeric operand, and anything else is
//! a string with one layer of wrapping single or double quotes stripped.
//!
//! # Sort expressions
//!
//! A sort is `<field> <direction>` where direction is `ASC`, `DESC`, `1`
//! (ascending) or `0` (descending), case-insensitive.

use bson::Bson;

use crate::error::{ModelError, ModelResult};

/// Comparison operators supported by filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Equal to.
    Eq,
    /// Not equal to.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Wildcard string match (`%` any sequence, `_` single character),
    /// case-insensitive.
    Like,
}

impl FilterOp {
    /// Matches an operator token case-insensitively.
    fn parse(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "==" => Some(FilterOp::Eq),
            "!=" => Some(FilterOp::Ne),
            "<" => Some(FilterOp::Lt),
            "<=" => Some(FilterOp::Lte),
            ">" => Some(FilterOp::Gt),
            ">=" => Some(FilterOp::Gte),
            "like" => Some(FilterOp::Like),
            _ => None,
        }
    }
}

/// A typed filter operand.
///
/// The parser distinguishes three shapes: the bare literal `null`, unquoted
/// numeric literals, and everything else as a string. Quote characters
/// anywhere in the operand force the string branch, so `'2'` compares as the
/// string `2`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// The literal `null` (also matches absent fields in most stores).
    Null,
    /// A numeric literal, normalized to `f64`.
    Number(f64),
    /// A string literal with wrapping quotes stripped.
    String(String),
}

impl From<&Operand> for Bson {
    fn from(operand: &Operand) -> Self {
        match operand {
            Operand::Null => Bson::Null,
            Operand::Number(n) => Bson::Double(*n),
            Operand::String(s) => Bson::String(s.clone()),
        }
    }
}

/// A single parsed filter predicate.
///
/// A find/count operation accepts zero or more of these, implicitly ANDed in
/// list order. There is no nested boolean composition.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    /// The record field the predicate applies to.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The typed right-hand operand.
    pub operand: Operand,
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// A single parsed sort key.
///
/// A query accepts zero or more of these, applied in list order: subsequent
/// keys break ties of prior keys (stable multi-key sort).
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// The record field to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Parses a filter expression string into a [`FilterExpr`].
///
/// # Errors
///
/// - [`ModelError::InvalidExpression`] if the expression has fewer than three
///   whitespace-separated tokens or the field is not a valid identifier
/// - [`ModelError::UnsupportedOperator`] if the operator token is not in the
///   supported set
///
/// # Example
///
/// ```
/// use docmodel_core::expr::{parse_filter, FilterOp, Operand};
///
/// let expr = parse_filter("test >= 2").unwrap();
/// assert_eq!(expr.field, "test");
/// assert_eq!(expr.op, FilterOp::Gte);
/// assert_eq!(expr.operand, Operand::Number(2.0));
/// ```
pub fn parse_filter(expr: &str) -> ModelResult<FilterExpr> {
    let tokens = expr
        .split_whitespace()
        .collect::<Vec<_>>();

    if tokens.len() < 3 {
        return Err(ModelError::InvalidExpression(expr.to_string()));
    }

    let field = tokens[0];
    let op_token = tokens[1];

    validate_identifier(field).map_err(|_| ModelError::InvalidExpression(expr.to_string()))?;

    let op = FilterOp::parse(op_token)
        .ok_or_else(|| ModelError::UnsupportedOperator(op_token.to_string()))?;

    // The operand is the remainder of the original string after the operator
    // token, so values with internal whitespace survive a plain token split.
    // The search starts past the field token in case the field itself
    // contains the operator as a substring.
    let field_end = expr.find(field).unwrap_or(0) + field.len();
    let operand_src = expr[field_end..]
        .find(op_token)
        .map(|at| expr[field_end + at + op_token.len()..].trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ModelError::InvalidExpression(expr.to_string()))?;

    Ok(FilterExpr {
        field: field.to_string(),
        op,
        operand: parse_operand(operand_src),
    })
}

/// Parses a sort expression string into a [`SortKey`].
///
/// # Errors
///
/// - [`ModelError::InvalidExpression`] if the expression does not have exactly
///   two whitespace-separated tokens or the field is not a valid identifier
/// - [`ModelError::InvalidSortDirection`] if the direction token is not one of
///   `ASC`, `DESC`, `1`, `0` (case-insensitive)
pub fn parse_sort(expr: &str) -> ModelResult<SortKey> {
    let tokens = expr
        .split_whitespace()
        .collect::<Vec<_>>();

    let [field, direction] = tokens.as_slice() else {
        return Err(ModelError::InvalidExpression(expr.to_string()));
    };

    validate_identifier(field).map_err(|_| ModelError::InvalidExpression(expr.to_string()))?;

    let direction = match direction.to_lowercase().as_str() {
        "asc" | "1" => SortDirection::Asc,
        "desc" | "0" => SortDirection::Desc,
        other => return Err(ModelError::InvalidSortDirection(other.to_string())),
    };

    Ok(SortKey { field: field.to_string(), direction })
}

/// Classifies an operand source string into a typed [`Operand`].
///
/// A bare unquoted `null` maps to the null operand. An operand containing no
/// quote characters that parses as a finite number is numeric, the literal
/// `0` included. Everything else is a string with one leading and one
/// trailing quote character stripped independently.
fn parse_operand(src: &str) -> Operand {
    if src == "null" {
        return Operand::Null;
    }

    let quoted = src.contains('\'') || src.contains('"');

    if !quoted {
        if let Ok(num) = src.parse::<f64>() {
            if num.is_finite() {
                return Operand::Number(num);
            }
        }
    }

    Operand::String(strip_quotes(src).to_string())
}

/// Strips at most one leading and one trailing quote character (`'` or `"`).
/// The two ends are handled independently and need not match.
fn strip_quotes(src: &str) -> &str {
    let src = src
        .strip_prefix(['\'', '"'])
        .unwrap_or(src);

    src.strip_suffix(['\'', '"']).unwrap_or(src)
}

/// Validates that a field or collection name is a safe identifier.
///
/// Names pass through query text unescaped (only operand values are bound),
/// so they are restricted to ASCII alphanumerics and underscores.
pub(crate) fn validate_identifier(name: &str) -> ModelResult<()> {
    if !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(ModelError::InvalidExpression(name.to_string()))
    }
}
