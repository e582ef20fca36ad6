//! Renders inferred descriptors as a JSON Schema (draft 2020-12) for one row.

use serde_json::{Map, Value, json};

use crate::{
    classify::{
        FORMAT_COLOR, FORMAT_EMAIL, FORMAT_FINANCIAL_YEAR, FORMAT_INTEGER, FORMAT_IP_ADDRESS,
        FORMAT_OBJECT, FORMAT_URL,
    },
    dates::{MIXED_FORMAT, YEAR_FORMAT},
    schema::{ColumnDescriptor, ColumnType, SchemaOptions, get_schema},
};

pub const JSON_SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

#[derive(Debug, Clone, Default)]
pub struct JsonSchemaOptions {
    pub title: Option<String>,
}

pub fn to_json_schema(columns: &[ColumnDescriptor], options: &JsonSchemaOptions) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for column in columns {
        properties.insert(column.name.clone(), column_schema(column));
        if column.completeness >= 1.0 {
            required.push(Value::String(column.name.clone()));
        }
    }

    let mut schema = Map::new();
    schema.insert("$schema".into(), json!(JSON_SCHEMA_DIALECT));
    if let Some(title) = &options.title {
        schema.insert("title".into(), json!(title));
    }
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), Value::Array(required));
    }
    Value::Object(schema)
}

pub fn to_json_schema_from_rows(
    rows: &[Value],
    schema_options: &SchemaOptions,
    options: &JsonSchemaOptions,
) -> Value {
    to_json_schema(&get_schema(rows, schema_options), options)
}

fn column_schema(column: &ColumnDescriptor) -> Value {
    if column.is_empty() {
        return json!({ "type": ["string", "null"] });
    }

    let mut schema = Map::new();
    let mut types: Vec<&str> = match column.column_type {
        ColumnType::Number => {
            let integral = column.format.as_deref() == Some(FORMAT_INTEGER);
            describe_bounds(column, integral, &mut schema);
            vec![if integral { "integer" } else { "number" }]
        }
        ColumnType::Boolean => vec!["boolean"],
        // Year columns keep native numbers through formatting, so both
        // representations are valid.
        ColumnType::Date if column.format.as_deref() == Some(YEAR_FORMAT) => {
            describe_bounds(column, true, &mut schema);
            schema.insert("pattern".into(), json!(token_pattern(YEAR_FORMAT)));
            vec!["integer", "string"]
        }
        ColumnType::Date => {
            if let Some(token) = column.format.as_deref() {
                describe_date(token, &mut schema);
            }
            vec!["string"]
        }
        ColumnType::String => {
            describe_string(column, &mut schema);
            vec!["string"]
        }
    };

    if column.completeness < 1.0 {
        types.push("null");
    }
    let type_value = match types.as_slice() {
        [single] => json!(single),
        _ => json!(types),
    };
    let mut ordered = Map::new();
    ordered.insert("type".into(), type_value);
    ordered.extend(schema);
    Value::Object(ordered)
}

fn describe_bounds(column: &ColumnDescriptor, integral: bool, schema: &mut Map<String, Value>) {
    if let Some(stats) = &column.num_stats {
        schema.insert("minimum".into(), bound(stats.min, integral));
        schema.insert("maximum".into(), bound(stats.max, integral));
    }
}

fn bound(value: f64, integral: bool) -> Value {
    if integral && value.fract() == 0.0 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

fn describe_date(token: &str, schema: &mut Map<String, Value>) {
    match token {
        MIXED_FORMAT => {}
        "%Y-%m-%d" => {
            schema.insert("format".into(), json!("date"));
        }
        "%Y-%m-%dT%H:%M:%S%z" | "%Y-%m-%dT%H:%M:%S.%f%z" => {
            schema.insert("format".into(), json!("date-time"));
        }
        "%H:%M:%S" => {
            schema.insert("format".into(), json!("time"));
        }
        _ => {
            schema.insert("pattern".into(), json!(token_pattern(token)));
        }
    }
}

fn describe_string(column: &ColumnDescriptor, schema: &mut Map<String, Value>) {
    match column.format.as_deref() {
        Some(FORMAT_URL) => {
            schema.insert("format".into(), json!("uri"));
        }
        Some(FORMAT_EMAIL) => {
            schema.insert("format".into(), json!("email"));
        }
        Some(FORMAT_IP_ADDRESS) => {
            schema.insert("format".into(), json!("ipv4"));
        }
        Some(FORMAT_COLOR) => {
            schema.insert("pattern".into(), json!("^#[0-9A-Fa-f]{6}$"));
        }
        Some(FORMAT_FINANCIAL_YEAR) => {
            schema.insert("pattern".into(), json!("^(19|20)\\d{2}[-–]\\d{2}$"));
        }
        Some(FORMAT_OBJECT) => {
            schema.insert("contentMediaType".into(), json!("application/json"));
        }
        _ => {}
    }
    if let Some(stats) = &column.text_stats {
        schema.insert("minLength".into(), json!(stats.min_len));
        schema.insert("maxLength".into(), json!(stats.max_len));
    }
}

/// Translates a strftime token into an anchored regular expression.
fn token_pattern(token: &str) -> String {
    let mut pattern = String::from("^");
    let mut chars = token.chars();
    while let Some(ch) = chars.next() {
        if ch == '%' {
            let fragment = match chars.next() {
                Some('Y') => r"\d{4}",
                Some('m' | 'd' | 'H' | 'I') => r"\d{1,2}",
                Some('M' | 'S') => r"\d{2}",
                Some('f') => r"\d+",
                Some('p') => "[AaPp][Mm]",
                Some('z') => r"(Z|z|[+-]\d{2}:?\d{2})",
                Some(other) => {
                    pattern.push_str(&regex::escape(&other.to_string()));
                    continue;
                }
                None => break,
            };
            pattern.push_str(fragment);
        } else if ch == ' ' {
            pattern.push_str(r"\s*");
        } else {
            pattern.push_str(&regex::escape(&ch.to_string()));
        }
    }
    pattern.push('$');
    pattern
}
