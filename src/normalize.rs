//! Numeric token analysis and value coercion.
//!
//! The same stripping rules back both the classifier (is this a number, and
//! which kind?) and the normalizer (what number is it?), so a value that
//! classifies as numeric always normalizes to a native number.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::data::{Cell, number_to_json};

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£'];
const CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "AUD", "CAD", "NZD", "JPY", "CNY", "INR",
];

static NUMERIC_RESIDUAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?$").expect("numeric residual regex")
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NumericToken {
    pub value: f64,
    pub has_fraction: bool,
    pub currency: bool,
    pub percent: bool,
}

/// Strips one leading currency symbol, one trailing currency code, grouping
/// commas and one trailing `%`, then requires a plain decimal residual.
pub(crate) fn analyze_numeric_token(raw: &str) -> Option<NumericToken> {
    let mut body = raw.trim();
    if body.is_empty() {
        return None;
    }

    let mut currency = false;
    if let Some(rest) = body.strip_prefix(CURRENCY_SYMBOLS) {
        currency = true;
        body = rest.trim_start();
    }

    if let Some(split) = body.len().checked_sub(3)
        && let (Some(head), Some(code)) = (body.get(..split), body.get(split..))
        && CURRENCY_CODES
            .iter()
            .any(|known| known.eq_ignore_ascii_case(code))
        && !head.ends_with(|c: char| c.is_alphabetic())
    {
        currency = true;
        body = head.trim_end();
    }

    let mut percent = false;
    if let Some(rest) = body.strip_suffix('%') {
        percent = true;
        body = rest.trim_end();
    }

    if !NUMERIC_RESIDUAL.is_match(body) {
        return None;
    }
    let digits = body.replace(',', "");
    let value = digits.parse::<f64>().ok().filter(|value| value.is_finite())?;
    Some(NumericToken {
        value,
        has_fraction: digits.contains('.'),
        currency,
        percent,
    })
}

/// Numeric value of a cell for running statistics, if it has one.
pub(crate) fn numeric_value(cell: &Cell<'_>) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => analyze_numeric_token(s).map(|token| token.value),
        _ => None,
    }
}

/// Coerces a value to a native number.
///
/// Numbers pass through. Null and blank strings become `null` when
/// `empty_as_null` is set and are returned unchanged otherwise. Strings that
/// strip to a clean numeric residual become numbers (`"12%"` is `12`, not
/// `0.12`); anything else is returned unchanged.
pub fn normalize_number(value: &Value, empty_as_null: bool) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::Null => Value::Null,
        Value::String(s) if s.trim().is_empty() => {
            if empty_as_null {
                Value::Null
            } else {
                value.clone()
            }
        }
        Value::String(s) => match analyze_numeric_token(s) {
            Some(token) => number_to_json(token.value, !token.has_fraction),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}

/// Coerces `"true"`/`"false"` (any case) to booleans; everything else passes
/// through untouched.
pub fn normalize_boolean(value: &Value) -> Value {
    match value {
        Value::String(s) => parse_boolean_literal(s).map_or_else(|| value.clone(), Value::Bool),
        _ => value.clone(),
    }
}

pub(crate) fn parse_boolean_literal(value: &str) -> Option<bool> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
