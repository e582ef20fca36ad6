//! Dataset formatter: rewrites rows with values coerced to the types the
//! inferred schema settled on.

use std::collections::HashMap;

use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::{
    classify::{FORMAT_BOOLEAN, FORMAT_CURRENCY, FORMAT_FLOAT, FORMAT_INTEGER, FORMAT_PERCENTAGE},
    data::{Cell, Row},
    dates::{MIXED_FORMAT, YEAR_FORMAT, parse_with_format},
    normalize::{normalize_boolean, normalize_number},
    schema::{ColumnDescriptor, ColumnType, SchemaOptions, get_schema},
};

const NUMERIC_GUESSES: &[&str] = &[
    FORMAT_INTEGER,
    FORMAT_FLOAT,
    FORMAT_CURRENCY,
    FORMAT_PERCENTAGE,
];

#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub schema: SchemaOptions,
    /// Empty values (and null markers, when honoured) in Number columns
    /// become `null`.
    pub number_empty_as_null: bool,
    /// Coerce mixed String columns whose best guess is numeric or boolean.
    pub best_guess: bool,
    pub report_ignored: bool,
    pub report: bool,
    /// Rewrite Date columns to ISO 8601.
    pub convert_dates: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            schema: SchemaOptions::default(),
            number_empty_as_null: true,
            best_guess: false,
            report_ignored: false,
            report: false,
            convert_dates: false,
        }
    }
}

/// A value a coercion could not convert; it is left in place unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IgnoredValue {
    pub row: usize,
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatReport {
    pub rows: Vec<Row>,
    pub ignored: Vec<IgnoredValue>,
}

#[derive(Debug, Clone, PartialEq)]
enum Coercion {
    Number { empty_as_null: bool },
    Boolean,
    Date(String),
    Keep,
}

impl Coercion {
    fn for_column(descriptor: &ColumnDescriptor, options: &FormatOptions) -> Self {
        match descriptor.column_type {
            ColumnType::Number => Coercion::Number {
                empty_as_null: options.number_empty_as_null,
            },
            ColumnType::Boolean => Coercion::Boolean,
            ColumnType::Date if options.convert_dates => match descriptor.format.as_deref() {
                Some(token) if token != MIXED_FORMAT && token != YEAR_FORMAT => {
                    Coercion::Date(token.to_string())
                }
                _ => Coercion::Keep,
            },
            ColumnType::String if options.best_guess && descriptor.is_mixed() => {
                match descriptor.probably.as_deref() {
                    Some(guess) if NUMERIC_GUESSES.contains(&guess) => Coercion::Number {
                        empty_as_null: false,
                    },
                    Some(FORMAT_BOOLEAN) => Coercion::Boolean,
                    _ => Coercion::Keep,
                }
            }
            _ => Coercion::Keep,
        }
    }

    /// Returns the coerced value and whether the coercion gave up on it.
    fn apply(&self, value: &Value, options: &FormatOptions) -> (Value, bool) {
        let cell = Cell::from_json(value);
        let is_marker = options.schema.is_null_marker(&cell);
        match self {
            Coercion::Keep => (value.clone(), false),
            Coercion::Number { empty_as_null } => {
                if is_marker {
                    let coerced = if *empty_as_null {
                        Value::Null
                    } else {
                        value.clone()
                    };
                    return (coerced, false);
                }
                let coerced = normalize_number(value, *empty_as_null);
                let failed = !cell.is_empty() && !matches!(coerced, Value::Number(_));
                (coerced, failed)
            }
            Coercion::Boolean => {
                let coerced = normalize_boolean(value);
                let failed = !cell.is_empty() && !is_marker && !matches!(coerced, Value::Bool(_));
                (coerced, failed)
            }
            Coercion::Date(token) => match cell {
                Cell::Text(text) if !cell.is_empty() && !is_marker => {
                    match parse_with_format(text, token) {
                        Some(iso) => (Value::String(iso), false),
                        None => (value.clone(), true),
                    }
                }
                _ => (value.clone(), false),
            },
        }
    }
}

/// Formats rows against a freshly inferred schema.
pub fn data_format(rows: &[Value], options: &FormatOptions) -> Vec<Row> {
    data_format_with_report(rows, options).rows
}

pub fn data_format_with_report(rows: &[Value], options: &FormatOptions) -> FormatReport {
    let schema = get_schema(rows, &options.schema);
    if options.report {
        for descriptor in &schema {
            info!(
                "Column '{}': {} ({}), completeness {:.2}, {} distinct",
                descriptor.name,
                descriptor.column_type,
                descriptor.format.as_deref().unwrap_or("-"),
                descriptor.completeness,
                descriptor.distinct_count
            );
        }
    }

    let plan: HashMap<&str, (&ColumnDescriptor, Coercion)> = schema
        .iter()
        .map(|descriptor| {
            (
                descriptor.source_key(),
                (descriptor, Coercion::for_column(descriptor, options)),
            )
        })
        .collect();

    let mut report = FormatReport::default();
    for (index, row) in rows.iter().enumerate() {
        let Value::Object(fields) = row else {
            continue;
        };
        let mut formatted = Row::new();
        for (key, value) in fields {
            let Some((descriptor, coercion)) = plan.get(key.as_str()) else {
                continue;
            };
            let (coerced, failed) = coercion.apply(value, options);
            if failed && options.report_ignored {
                warn!(
                    "Row {index}: column '{}' kept unconverted value {value}",
                    descriptor.name
                );
                report.ignored.push(IgnoredValue {
                    row: index,
                    column: descriptor.name.clone(),
                    value: value.clone(),
                });
            }
            formatted.insert(descriptor.name.clone(), coerced);
        }
        report.rows.push(formatted);
    }
    report
}
