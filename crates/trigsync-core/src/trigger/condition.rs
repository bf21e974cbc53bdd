//! Structured trigger conditions.
//!
//! A condition is a boolean expression over the OLD and NEW row images,
//! rendered into the trigger's `WHEN` clause. Keeping it structured (rather
//! than a raw SQL string) lets two declarations be compared for semantic
//! equality across migration states.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Which row image a field reference reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowRef {
    /// The row as it was before the operation.
    Old,
    /// The row as it will be after the operation.
    New,
}

impl RowRef {
    /// SQL keyword for this row image.
    pub fn keyword(&self) -> &'static str {
        match self {
            RowRef::Old => "OLD",
            RowRef::New => "NEW",
        }
    }
}

/// Comparison operator for field conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl CompareOp {
    /// SQL operator token.
    pub fn token(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A literal value a field can be compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Integer literal.
    Integer(i64),
    /// Floating-point literal.
    Real(f64),
    /// Text literal.
    Text(String),
    /// Boolean literal (rendered as 1/0).
    Bool(bool),
}

impl Value {
    /// Convenience constructor for text values.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    fn render(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(r) => r.to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
        }
    }
}

/// A boolean expression over the OLD/NEW row images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Compare a field against a literal value.
    Compare {
        /// Row image to read.
        row: RowRef,
        /// Field name.
        field: String,
        /// Comparison operator.
        op: CompareOp,
        /// Literal to compare against.
        value: Value,
    },
    /// Field is NULL.
    IsNull {
        /// Row image to read.
        row: RowRef,
        /// Field name.
        field: String,
    },
    /// Field is not NULL.
    NotNull {
        /// Row image to read.
        row: RowRef,
        /// Field name.
        field: String,
    },
    /// Field value differs between the OLD and NEW images.
    ///
    /// Only meaningful for Update triggers.
    Changed {
        /// Field name.
        field: String,
    },
    /// Both sub-conditions hold.
    And(Box<Condition>, Box<Condition>),
    /// Either sub-condition holds.
    Or(Box<Condition>, Box<Condition>),
    /// The sub-condition does not hold.
    Not(Box<Condition>),
}

impl Condition {
    /// Compare a field against a literal.
    pub fn compare(row: RowRef, field: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Condition::Compare {
            row,
            field: field.into(),
            op,
            value,
        }
    }

    /// Field is NULL.
    pub fn is_null(row: RowRef, field: impl Into<String>) -> Self {
        Condition::IsNull {
            row,
            field: field.into(),
        }
    }

    /// Field is not NULL.
    pub fn not_null(row: RowRef, field: impl Into<String>) -> Self {
        Condition::NotNull {
            row,
            field: field.into(),
        }
    }

    /// Field value changed between OLD and NEW.
    pub fn changed(field: impl Into<String>) -> Self {
        Condition::Changed {
            field: field.into(),
        }
    }

    /// Conjunction with another condition.
    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    /// Disjunction with another condition.
    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    /// Negation.
    pub fn negate(self) -> Self {
        Condition::Not(Box::new(self))
    }

    /// Render the condition as a SQL expression.
    ///
    /// Fails with `Error::Configuration` if any referenced field is not a
    /// valid identifier.
    pub fn to_sql(&self) -> Result<String, Error> {
        match self {
            Condition::Compare {
                row,
                field,
                op,
                value,
            } => {
                validate_identifier(field)?;
                Ok(format!(
                    "{}.{} {} {}",
                    row.keyword(),
                    quote_identifier(field),
                    op.token(),
                    value.render()
                ))
            }
            Condition::IsNull { row, field } => {
                validate_identifier(field)?;
                Ok(format!("{}.{} IS NULL", row.keyword(), quote_identifier(field)))
            }
            Condition::NotNull { row, field } => {
                validate_identifier(field)?;
                Ok(format!(
                    "{}.{} IS NOT NULL",
                    row.keyword(),
                    quote_identifier(field)
                ))
            }
            Condition::Changed { field } => {
                validate_identifier(field)?;
                let field = quote_identifier(field);
                Ok(format!("OLD.{field} IS NOT NEW.{field}"))
            }
            Condition::And(a, b) => Ok(format!("({} AND {})", a.to_sql()?, b.to_sql()?)),
            Condition::Or(a, b) => Ok(format!("({} OR {})", a.to_sql()?, b.to_sql()?)),
            Condition::Not(inner) => Ok(format!("NOT ({})", inner.to_sql()?)),
        }
    }
}

/// Check that a name is usable as an unquoted-safe SQL identifier.
pub fn validate_identifier(name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::Configuration(format!(
            "invalid identifier: {name:?}"
        )));
    }
    Ok(())
}

/// Quote an identifier for use in DDL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}
