//! Per-value classification into a base type and a format label.
//!
//! Classification is an ordered, first-match-wins list of rules
//! ([`CLASSIFIER_RULES`]); the string fallbacks are a second ordered list
//! ([`STRING_RULES`]). Nothing here fails: a value no rule claims is `Text`.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    data::Cell,
    dates::guess_date_format,
    normalize::{analyze_numeric_token, parse_boolean_literal},
    schema::ColumnType,
};

pub const FORMAT_BOOLEAN: &str = "Boolean";
pub const FORMAT_INTEGER: &str = "Integer";
pub const FORMAT_FLOAT: &str = "Float";
pub const FORMAT_CURRENCY: &str = "Currency";
pub const FORMAT_PERCENTAGE: &str = "Percentage";
pub const FORMAT_FINANCIAL_YEAR: &str = "Financial year";
pub const FORMAT_URL: &str = "URL";
pub const FORMAT_EMAIL: &str = "Email";
pub const FORMAT_IP_ADDRESS: &str = "IP address";
pub const FORMAT_PHONE: &str = "Phone";
pub const FORMAT_COLOR: &str = "Color";
pub const FORMAT_DATA_URI: &str = "Data URI";
pub const FORMAT_OBJECT: &str = "Object";
pub const FORMAT_JSON: &str = "JSON";
pub const FORMAT_TEXT: &str = "Text";

const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?'];

static FINANCIAL_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:19|20)\d{2}[-–]\d{2}$").expect("financial year regex"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://[^\s/$.?#][^\s]*$").expect("url regex"));
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]{2,}$").expect("email regex"));
static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)$")
        .expect("ipv4 regex")
});
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d(][\d\s().-]{6,}\d$").expect("phone regex"));
static COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("color regex"));
static DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^data:(?:image|audio|video)/[\w.+-]+(?:;[\w.+-]+=[\w.+-]+)*(?:;base64)?,")
        .expect("data uri regex")
});
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("token regex"));
static PERCENT_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?\s*%$").expect("percent regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub column_type: ColumnType,
    pub format: Cow<'static, str>,
}

impl Classification {
    fn new(column_type: ColumnType, format: impl Into<Cow<'static, str>>) -> Self {
        Self {
            column_type,
            format: format.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyOptions {
    pub prefer_string_numbers: bool,
}

type ClassifierRule = fn(&Cell<'_>, &str, &ClassifyOptions) -> Option<Classification>;

/// Rule order is significant: booleans, then dates, then numbers, then the
/// string fallbacks.
pub const CLASSIFIER_RULES: &[(&str, ClassifierRule)] = &[
    ("boolean", classify_boolean),
    ("date", classify_date),
    ("number", classify_number),
    ("string", classify_string),
];

type StringRule = fn(&str) -> Option<&'static str>;

/// String subformats, evaluated in order after every typed rule missed.
pub const STRING_RULES: &[(&str, StringRule)] = &[
    (FORMAT_FINANCIAL_YEAR, financial_year_format),
    (FORMAT_URL, url_format),
    (FORMAT_EMAIL, email_format),
    (FORMAT_IP_ADDRESS, ip_address_format),
    (FORMAT_PHONE, phone_format),
    (FORMAT_COLOR, color_format),
    (FORMAT_DATA_URI, data_uri_format),
    (FORMAT_JSON, json_format),
];

fn financial_year_format(text: &str) -> Option<&'static str> {
    FINANCIAL_YEAR.is_match(text).then_some(FORMAT_FINANCIAL_YEAR)
}

fn url_format(text: &str) -> Option<&'static str> {
    URL.is_match(text).then_some(FORMAT_URL)
}

fn email_format(text: &str) -> Option<&'static str> {
    EMAIL.is_match(text).then_some(FORMAT_EMAIL)
}

fn ip_address_format(text: &str) -> Option<&'static str> {
    IPV4.is_match(text).then_some(FORMAT_IP_ADDRESS)
}

fn phone_format(text: &str) -> Option<&'static str> {
    PHONE.is_match(text).then_some(FORMAT_PHONE)
}

fn color_format(text: &str) -> Option<&'static str> {
    COLOR.is_match(text).then_some(FORMAT_COLOR)
}

fn data_uri_format(text: &str) -> Option<&'static str> {
    DATA_URI.is_match(text).then_some(FORMAT_DATA_URI)
}

/// Classifies one raw JSON value. Returns `None` for null and blank values,
/// which are excluded from every column statistic.
pub fn classify_value(value: &Value, prefer_string_numbers: bool) -> Option<Classification> {
    let options = ClassifyOptions {
        prefer_string_numbers,
    };
    classify_cell(&Cell::from_json(value), &options)
}

pub fn classify_cell(cell: &Cell<'_>, options: &ClassifyOptions) -> Option<Classification> {
    if cell.is_empty() {
        return None;
    }
    let text = cell.as_display();
    CLASSIFIER_RULES
        .iter()
        .find_map(|(_, rule)| rule(cell, &text, options))
}

fn classify_boolean(cell: &Cell<'_>, text: &str, _: &ClassifyOptions) -> Option<Classification> {
    let is_boolean = match cell {
        Cell::Bool(_) => true,
        Cell::Text(_) => parse_boolean_literal(text).is_some(),
        _ => false,
    };
    is_boolean.then(|| Classification::new(ColumnType::Boolean, FORMAT_BOOLEAN))
}

fn classify_date(cell: &Cell<'_>, text: &str, _: &ClassifyOptions) -> Option<Classification> {
    let Cell::Text(_) = cell else {
        return None;
    };
    guess_date_format(text).map(|token| Classification::new(ColumnType::Date, token))
}

fn classify_number(
    cell: &Cell<'_>,
    text: &str,
    options: &ClassifyOptions,
) -> Option<Classification> {
    if options.prefer_string_numbers {
        return None;
    }
    match cell {
        Cell::Number(n) => {
            let format = if n.fract() == 0.0 {
                FORMAT_INTEGER
            } else {
                FORMAT_FLOAT
            };
            Some(Classification::new(ColumnType::Number, format))
        }
        Cell::Text(_) => {
            let token = analyze_numeric_token(text)?;
            let format = if token.percent {
                FORMAT_PERCENTAGE
            } else if token.currency {
                FORMAT_CURRENCY
            } else if token.has_fraction && token.value.fract() != 0.0 {
                FORMAT_FLOAT
            } else {
                FORMAT_INTEGER
            };
            Some(Classification::new(ColumnType::Number, format))
        }
        _ => None,
    }
}

fn classify_string(cell: &Cell<'_>, text: &str, _: &ClassifyOptions) -> Option<Classification> {
    let format = match cell {
        Cell::Nested(_) => json_format(text),
        _ => STRING_RULES.iter().find_map(|(_, rule)| rule(text)),
    }
    .unwrap_or(FORMAT_TEXT);
    Some(Classification::new(ColumnType::String, format))
}

/// Parse failures are not errors here: the value simply is not JSON.
fn json_format(text: &str) -> Option<&'static str> {
    let looks_like_object = text.starts_with('{') && text.ends_with('}');
    let looks_like_array = text.starts_with('[') && text.ends_with(']');
    if !looks_like_object && !looks_like_array {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(_)) => Some(FORMAT_OBJECT),
        Ok(Value::Array(_)) => Some(FORMAT_JSON),
        _ => None,
    }
}

/// Coarse shape of a `Text` value, tallied per column for text statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextShape {
    /// Identifier-like: letters, digits and dashes only.
    Token,
    /// Sentence-like or long free text.
    Prose,
    Plain,
}

pub fn text_shape(text: &str) -> TextShape {
    let length = text.chars().count();
    if TOKEN.is_match(text) {
        TextShape::Token
    } else if text.contains(SENTENCE_TERMINATORS) || length > 50 {
        TextShape::Prose
    } else {
        TextShape::Plain
    }
}

pub fn looks_like_percentage(text: &str) -> bool {
    PERCENT_LIKE.is_match(text.trim())
}

/// Delimited-list heuristic: at least two non-empty parts split on `;`, `,`
/// or `|`, averaging no more than 30 characters.
pub fn looks_like_list(text: &str) -> bool {
    let parts: Vec<&str> = text
        .split([';', ',', '|'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.len() < 2 {
        return false;
    }
    let total: usize = parts.iter().map(|part| part.chars().count()).sum();
    total <= parts.len() * 30
}
