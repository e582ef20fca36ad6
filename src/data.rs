//! Cell view over loosely-typed row values.
//!
//! Rows arrive as JSON objects whose values may be native numbers, booleans,
//! strings, nulls, or nested structures depending on the source. [`Cell`] is
//! the tagged view every other module classifies against: the runtime tag is
//! inspected first, string patterns second.

use std::borrow::Cow;

use serde_json::{Number, Value};

use crate::error::{InferError, InferResult, json_kind};

/// One row of tabular data, keyed by column name in source order.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Missing,
    Bool(bool),
    Number(f64),
    Text(&'a str),
    Nested(&'a Value),
}

impl<'a> Cell<'a> {
    pub fn from_json(value: &'a Value) -> Self {
        match value {
            Value::Null => Cell::Missing,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Cell::Nested(value), Cell::Number),
            Value::String(s) => Cell::Text(s.as_str()),
            Value::Array(_) | Value::Object(_) => Cell::Nested(value),
        }
    }

    /// True for nulls and strings that are blank after trimming.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Missing => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Normalized string representation used for distinct counting and top-K.
    pub fn as_display(&self) -> Cow<'a, str> {
        match self {
            Cell::Missing => Cow::Borrowed(""),
            Cell::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Cell::Number(n) => Cow::Owned(format_number(*n)),
            Cell::Text(s) => Cow::Borrowed(s.trim()),
            Cell::Nested(value) => Cow::Owned(value.to_string()),
        }
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Builds a JSON number, preferring an integer representation when the value
/// carries no fractional part.
pub fn number_to_json(value: f64, integral: bool) -> Value {
    if integral && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Value::from(value as i64);
    }
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Parses JSON text whose top level must be an array of rows. Non-object
/// elements are kept; inference skips them.
pub fn rows_from_json(text: &str) -> InferResult<Vec<Value>> {
    match serde_json::from_str::<Value>(text)? {
        Value::Array(rows) => Ok(rows),
        other => Err(InferError::NotAnArray {
            found: json_kind(&other),
        }),
    }
}
