//! Column descriptors and the resolver that derives them from accumulated
//! column state.

use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    accumulator::{Accumulation, ColumnAccumulator, accumulate},
    classify::{FORMAT_INTEGER, FORMAT_TEXT, TextShape},
    data::{Cell, rows_from_json},
    dates::{MIXED_FORMAT, YEAR_FORMAT, guess_column_date_format},
    error::InferResult,
    markers::NullMarkers,
};

pub const TOP_K: usize = 5;
pub const MAX_LISTED_CATEGORIES: usize = 9;
pub const ZERO_VARIANCE_LABEL: &str = "Zero-variance column";
pub const CATEGORIES_LABEL: &str = "Categories";
pub const LIST_LABEL: &str = "List";
pub const PERCENTAGE_LABEL: &str = "Percentage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    Date,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "String",
            ColumnType::Number => "Number",
            ColumnType::Boolean => "Boolean",
            ColumnType::Date => "Date",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stdev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStats {
    pub min_len: usize,
    pub max_len: usize,
    pub avg_len: f64,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub shapes: IndexMap<TextShape, usize>,
}

/// Finalized inference result for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeating: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequential: Option<bool>,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probably: Option<String>,
    pub tally: IndexMap<String, usize>,
    pub completeness: f64,
    pub non_empty_count: usize,
    pub distinct_count: usize,
    pub cardinality: f64,
    pub top_k: Vec<(String, usize)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_stats: Option<NumStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_stats: Option<TextStats>,
    pub uniqueness_ratio: f64,
    pub is_unique: bool,
    pub is_primary_key: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub null_markers: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

impl ColumnDescriptor {
    /// Key the column is read from in the source rows.
    pub fn source_key(&self) -> &str {
        self.source_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_empty(&self) -> bool {
        self.non_empty_count == 0
    }

    pub fn is_mixed(&self) -> bool {
        self.format.as_deref() == Some(MIXED_FORMAT)
    }
}

/// Options shared by every inference entry point.
#[derive(Debug, Clone, Default)]
pub struct SchemaOptions {
    /// Skip numeric detection entirely: numerals, native or not, are
    /// classified as strings.
    pub prefer_string_numbers: bool,
    pub sanitize_keys: bool,
    pub use_null_markers_for_inference: bool,
    pub drop_empty_columns: bool,
    pub null_markers: NullMarkers,
}

impl SchemaOptions {
    pub(crate) fn is_null_marker(&self, cell: &Cell<'_>) -> bool {
        self.use_null_markers_for_inference
            && cell.as_text().is_some_and(|text| self.null_markers.matches(text))
    }

    /// Empty after trimming, or a null marker when markers are honoured.
    pub(crate) fn is_blank(&self, cell: &Cell<'_>) -> bool {
        cell.is_empty() || self.is_null_marker(cell)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guess {
    List,
    Percentage,
    Category,
    Text,
}

/// Candidates for a string column's best guess, most specific first. A later
/// entry only wins with a strictly higher ratio.
const GUESS_PRECEDENCE: &[Guess] = &[Guess::List, Guess::Percentage, Guess::Category, Guess::Text];

/// Infers one descriptor per column, in key encounter order.
pub fn get_schema(rows: &[Value], options: &SchemaOptions) -> Vec<ColumnDescriptor> {
    let Accumulation {
        columns,
        total_rows,
    } = accumulate(rows, options);

    let descriptors: Vec<ColumnDescriptor> = columns
        .into_iter()
        .filter(|(_, column)| !(options.drop_empty_columns && column.non_empty_count == 0))
        .map(|(name, column)| resolve_column(name, &column, rows, total_rows, options))
        .collect();

    debug!(
        "Resolved {} column(s) over {} row(s)",
        descriptors.len(),
        total_rows
    );
    descriptors
}

/// Parses `text` as a JSON array of row objects and infers its schema.
pub fn get_schema_from_json(
    text: &str,
    options: &SchemaOptions,
) -> InferResult<Vec<ColumnDescriptor>> {
    let rows = rows_from_json(text)?;
    Ok(get_schema(&rows, options))
}

/// Raw cells of one column across every object row, `Missing` where the key
/// is absent.
fn raw_cells<'a>(rows: &'a [Value], key: &'a str) -> impl Iterator<Item = Cell<'a>> + 'a {
    rows.iter()
        .filter_map(Value::as_object)
        .map(move |row| row.get(key).map_or(Cell::Missing, Cell::from_json))
}

fn resolve_column(
    name: String,
    column: &ColumnAccumulator,
    rows: &[Value],
    total_rows: usize,
    options: &SchemaOptions,
) -> ColumnDescriptor {
    let source_name = options
        .sanitize_keys
        .then(|| column.source_name.clone());

    if column.non_empty_count == 0 {
        debug!("Column '{name}' has no non-empty values");
        return empty_descriptor(name, source_name, column.null_marker_count);
    }

    let non_empty = column.non_empty_count as f64;
    let distinct_count = column.distinct_count();
    let completeness = if total_rows == 0 {
        0.0
    } else {
        non_empty / total_rows as f64
    };
    let is_unique = distinct_count == column.non_empty_count;

    let (top_label, top_count) = top_tally(&column.format_counts);
    let score = top_count as f64 / non_empty;
    let base_probably = (score < 1.0).then(|| top_label.to_string());

    let mut descriptor = ColumnDescriptor {
        name,
        source_name,
        column_type: ColumnType::String,
        format: Some(MIXED_FORMAT.to_string()),
        repeating: None,
        sequential: None,
        score,
        probably: base_probably,
        tally: column.format_counts.clone(),
        completeness,
        non_empty_count: column.non_empty_count,
        distinct_count,
        cardinality: distinct_count as f64 / non_empty,
        top_k: top_values(&column.value_counts),
        num_stats: None,
        text_stats: None,
        uniqueness_ratio: if total_rows == 0 {
            0.0
        } else {
            distinct_count as f64 / total_rows as f64
        },
        is_unique,
        is_primary_key: is_unique && column.non_empty_count == total_rows,
        null_markers: column.null_marker_count,
    };

    if column.types.len() == 1
        && let Some(column_type) = column.types.first().copied()
    {
        descriptor.column_type = column_type;
        descriptor.format = single_type_format(column, column_type);
        if column_type == ColumnType::Number && is_year_column(column) {
            descriptor.column_type = ColumnType::Date;
            descriptor.format = Some(YEAR_FORMAT.to_string());
            descriptor.sequential = Some(column.is_sequential());
            descriptor.num_stats = num_stats(column);
        } else if column_type == ColumnType::Date {
            let values = raw_cells(rows, &column.source_name)
                .filter(|cell| !options.is_blank(cell))
                .filter_map(|cell| cell.as_text());
            descriptor.format = guess_column_date_format(values);
        } else if column_type == ColumnType::Number {
            descriptor.sequential = Some(column.is_sequential());
            descriptor.num_stats = num_stats(column);
        }
    }

    if descriptor.column_type == ColumnType::String {
        descriptor.repeating = Some(column.has_duplicate());
        descriptor.text_stats = text_stats(column);
        if let Some(guess) = refine_string_guess(column, top_label) {
            descriptor.probably = Some(guess);
        }
    }

    debug!(
        "Column '{}' resolved to {} ({})",
        descriptor.name,
        descriptor.column_type,
        descriptor.format.as_deref().unwrap_or("-")
    );
    descriptor
}

fn empty_descriptor(
    name: String,
    source_name: Option<String>,
    null_markers: usize,
) -> ColumnDescriptor {
    ColumnDescriptor {
        name,
        source_name,
        column_type: ColumnType::String,
        format: None,
        repeating: None,
        sequential: None,
        score: 0.0,
        probably: None,
        tally: IndexMap::new(),
        completeness: 0.0,
        non_empty_count: 0,
        distinct_count: 0,
        cardinality: 0.0,
        top_k: Vec::new(),
        num_stats: None,
        text_stats: None,
        uniqueness_ratio: 0.0,
        is_unique: false,
        is_primary_key: false,
        null_markers,
    }
}

fn single_type_format(column: &ColumnAccumulator, column_type: ColumnType) -> Option<String> {
    match column.formats_by_type.get(&column_type) {
        Some(formats) if formats.len() == 1 => formats.first().cloned(),
        _ => Some(MIXED_FORMAT.to_string()),
    }
}

fn is_year_column(column: &ColumnAccumulator) -> bool {
    let integer_only = column
        .formats_by_type
        .get(&ColumnType::Number)
        .is_some_and(|formats| formats.len() == 1 && formats.contains(FORMAT_INTEGER));
    integer_only && column.all_years()
}

/// First label holding the highest count.
fn top_tally(tally: &IndexMap<String, usize>) -> (&str, usize) {
    tally
        .iter()
        .fold(("", 0), |best, (label, count)| {
            if *count > best.1 {
                (label.as_str(), *count)
            } else {
                best
            }
        })
}

/// Top values by descending count; equal counts keep first-seen order.
fn top_values(counts: &IndexMap<String, usize>) -> Vec<(String, usize)> {
    counts
        .iter()
        .sorted_by(|a, b| b.1.cmp(a.1))
        .take(TOP_K)
        .map(|(value, count)| (value.clone(), *count))
        .collect()
}

fn num_stats(column: &ColumnAccumulator) -> Option<NumStats> {
    let summary = &column.numbers;
    Some(NumStats {
        min: summary.min?,
        max: summary.max?,
        mean: summary.mean()?,
        stdev: summary.std_dev(),
    })
}

fn text_stats(column: &ColumnAccumulator) -> Option<TextStats> {
    let summary = &column.text;
    (summary.count > 0).then(|| TextStats {
        min_len: summary.min_len,
        max_len: summary.max_len,
        avg_len: summary.avg_len(),
        shapes: column.text_shapes.clone(),
    })
}

/// Picks the dominant string signal. Returns `None` when plain text wins,
/// which leaves the tally-derived label in place.
fn refine_string_guess(column: &ColumnAccumulator, top_label: &str) -> Option<String> {
    if column.str_obs_count == 0 {
        return None;
    }
    let observations = column.str_obs_count as f64;
    let category_applies = top_label == FORMAT_TEXT && column.has_string_duplicate();

    let ratio = |guess: Guess| -> f64 {
        match guess {
            Guess::List => column.list_count as f64 / observations,
            Guess::Percentage => column.percent_like_count as f64 / observations,
            Guess::Category if category_applies => {
                column.repeated_str_obs() as f64 / observations
            }
            Guess::Category => 0.0,
            Guess::Text => 0.0,
        }
    };
    let strongest_signal = GUESS_PRECEDENCE
        .iter()
        .filter(|guess| **guess != Guess::Text)
        .map(|guess| ratio(*guess))
        .fold(0.0, f64::max);
    let text_ratio = 1.0 - strongest_signal;

    let mut winner: Option<(Guess, f64)> = None;
    for guess in GUESS_PRECEDENCE {
        let value = match guess {
            Guess::Text => text_ratio,
            other => ratio(*other),
        };
        if value > 0.0 && winner.is_none_or(|(_, best)| value > best) {
            winner = Some((*guess, value));
        }
    }

    match winner?.0 {
        Guess::List => Some(LIST_LABEL.to_string()),
        Guess::Percentage => Some(PERCENTAGE_LABEL.to_string()),
        Guess::Category => Some(category_label(column)),
        Guess::Text => None,
    }
}

fn category_label(column: &ColumnAccumulator) -> String {
    if column.distinct_count() == 1 {
        return ZERO_VARIANCE_LABEL.to_string();
    }
    if column.str_value_counts.len() > MAX_LISTED_CATEGORIES {
        return CATEGORIES_LABEL.to_string();
    }
    let values = column
        .str_value_counts
        .iter()
        .sorted_by(|a, b| b.1.cmp(a.1))
        .map(|(value, _)| value)
        .join(", ");
    format!("{CATEGORIES_LABEL}: {values}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferError;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Value> {
        value.as_array().cloned().expect("array of rows")
    }

    fn single(value: Value) -> ColumnDescriptor {
        let mut schema = get_schema(&rows(value), &SchemaOptions::default());
        assert_eq!(schema.len(), 1);
        schema.remove(0)
    }

    #[test]
    fn top_tally_prefers_first_maximum() {
        let mut tally = IndexMap::new();
        tally.insert("Integer".to_string(), 2);
        tally.insert("Text".to_string(), 2);
        assert_eq!(top_tally(&tally), ("Integer", 2));
    }

    #[test]
    fn top_values_are_stable_on_ties() {
        let mut counts = IndexMap::new();
        for (value, count) in [("b", 1), ("a", 3), ("c", 1), ("d", 3)] {
            counts.insert(value.to_string(), count);
        }
        let top = top_values(&counts);
        assert_eq!(
            top,
            vec![
                ("a".to_string(), 3),
                ("d".to_string(), 3),
                ("b".to_string(), 1),
                ("c".to_string(), 1)
            ]
        );
    }

    #[test]
    fn mixed_types_resolve_to_mixed_string() {
        let descriptor = single(json!([{"v": "1"}, {"v": "2"}, {"v": "x"}]));
        assert_eq!(descriptor.column_type, ColumnType::String);
        assert!(descriptor.is_mixed());
        assert_eq!(descriptor.probably.as_deref(), Some(FORMAT_INTEGER));
        assert!((descriptor.score - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(descriptor.repeating, Some(false));
    }

    #[test]
    fn zero_variance_category() {
        let descriptor = single(json!([{"v": "same"}, {"v": "same"}]));
        assert_eq!(descriptor.probably.as_deref(), Some(ZERO_VARIANCE_LABEL));
        assert_eq!(descriptor.repeating, Some(true));
    }

    #[test]
    fn many_categories_are_not_listed() {
        let values: Vec<Value> = (0..24)
            .map(|i| json!({"v": format!("cat{}", i % 12)}))
            .collect();
        let schema = get_schema(&values, &SchemaOptions::default());
        assert_eq!(schema[0].probably.as_deref(), Some(CATEGORIES_LABEL));
    }

    #[test]
    fn list_signal_wins_over_text() {
        let descriptor = single(json!([
            {"v": "red, green"},
            {"v": "blue; black"},
            {"v": "plain words"}
        ]));
        assert_eq!(descriptor.probably.as_deref(), Some(LIST_LABEL));
    }

    #[test]
    fn unique_text_has_no_guess() {
        let descriptor = single(json!([{"v": "alpha"}, {"v": "beta"}]));
        assert_eq!(descriptor.format.as_deref(), Some(FORMAT_TEXT));
        assert_eq!(descriptor.probably, None);
        let stats = descriptor.text_stats.expect("text stats");
        assert_eq!((stats.min_len, stats.max_len), (4, 5));
        assert!((stats.avg_len - 4.5).abs() < 1e-9);
    }

    #[test]
    fn prefer_string_numbers_keeps_string_numerals() {
        let options = SchemaOptions {
            prefer_string_numbers: true,
            ..SchemaOptions::default()
        };
        let data = rows(json!([{"n": "1"}, {"n": "2"}]));
        let schema = get_schema(&data, &options);
        assert_eq!(schema[0].column_type, ColumnType::String);
        assert_eq!(schema[0].sequential, None);

        let data = rows(json!([{"n": 32}, {"n": 33}, {"n": ""}]));
        let schema = get_schema(&data, &options);
        assert_eq!(schema[0].column_type, ColumnType::String);
        assert_eq!(schema[0].format.as_deref(), Some(FORMAT_TEXT));
        assert_eq!(schema[0].sequential, None);
        assert_eq!(schema[0].num_stats, None);
        assert_eq!(
            schema[0].top_k,
            vec![("32".to_string(), 1), ("33".to_string(), 1)]
        );
    }

    #[test]
    fn number_columns_carry_stats() {
        let descriptor = single(json!([{"n": 2}, {"n": 4}, {"n": 6}]));
        assert_eq!(descriptor.column_type, ColumnType::Number);
        assert_eq!(descriptor.sequential, Some(false));
        let stats = descriptor.num_stats.expect("num stats");
        assert_eq!((stats.min, stats.max, stats.mean), (2.0, 6.0, 4.0));
        assert!((stats.stdev - 2.0).abs() < 1e-9);
    }

    #[test]
    fn json_text_must_be_an_array() {
        let err = get_schema_from_json(r#"{"a": 1}"#, &SchemaOptions::default())
            .expect_err("object is rejected");
        assert!(matches!(err, InferError::NotAnArray { found: "an object" }));
        assert!(get_schema_from_json("[", &SchemaOptions::default()).is_err());
    }
}
