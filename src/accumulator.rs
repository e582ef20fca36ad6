//! Single-pass, per-column accumulation of classification tallies and
//! running statistics.

use indexmap::{IndexMap, IndexSet};
use log::trace;
use serde_json::Value;

use crate::{
    classify::{
        ClassifyOptions, FORMAT_TEXT, TextShape, classify_cell, looks_like_list,
        looks_like_percentage, text_shape,
    },
    data::Cell,
    keys::KeySanitizer,
    normalize::numeric_value,
    schema::{ColumnType, SchemaOptions},
};

const YEAR_RANGE: std::ops::RangeInclusive<f64> = 1800.0..=2100.0;
const FOUR_DIGITS: std::ops::RangeInclusive<f64> = 1000.0..=9999.0;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NumericSummary {
    pub count: usize,
    pub sum: f64,
    pub sum_squares: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericSummary {
    fn update(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_squares += value * value;
        self.min = Some(self.min.map_or(value, |current| current.min(value)));
        self.max = Some(self.max.map_or(value, |current| current.max(value)));
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Sample standard deviation; zero below two observations.
    pub fn std_dev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        let variance = (self.sum_squares - (self.sum * self.sum) / n) / (n - 1.0);
        variance.max(0.0).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TextSummary {
    pub count: usize,
    pub min_len: usize,
    pub max_len: usize,
    pub sum_len: usize,
}

impl TextSummary {
    fn update(&mut self, length: usize) {
        if self.count == 0 {
            self.min_len = length;
            self.max_len = length;
        } else {
            self.min_len = self.min_len.min(length);
            self.max_len = self.max_len.max(length);
        }
        self.count += 1;
        self.sum_len += length;
    }

    pub fn avg_len(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_len as f64 / self.count as f64
        }
    }
}

/// Mutable per-column state for one inference pass.
#[derive(Debug, Clone)]
pub(crate) struct ColumnAccumulator {
    pub source_name: String,
    pub types: IndexSet<ColumnType>,
    pub formats_by_type: IndexMap<ColumnType, IndexSet<String>>,
    pub non_empty_count: usize,
    pub format_counts: IndexMap<String, usize>,
    pub type_counts: IndexMap<ColumnType, usize>,
    /// Keyed by normalized display string; its length is the distinct count.
    pub value_counts: IndexMap<String, usize>,
    pub str_value_counts: IndexMap<String, usize>,
    pub str_obs_count: usize,
    pub list_count: usize,
    pub percent_like_count: usize,
    pub text_shapes: IndexMap<TextShape, usize>,
    pub text: TextSummary,
    last_num: Option<f64>,
    pub num_count: usize,
    is_sequential: bool,
    pub four_digit_count: usize,
    pub year_range_count: usize,
    pub numbers: NumericSummary,
    pub null_marker_count: usize,
}

impl ColumnAccumulator {
    fn new(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            types: IndexSet::new(),
            formats_by_type: IndexMap::new(),
            non_empty_count: 0,
            format_counts: IndexMap::new(),
            type_counts: IndexMap::new(),
            value_counts: IndexMap::new(),
            str_value_counts: IndexMap::new(),
            str_obs_count: 0,
            list_count: 0,
            percent_like_count: 0,
            text_shapes: IndexMap::new(),
            text: TextSummary::default(),
            last_num: None,
            num_count: 0,
            is_sequential: true,
            four_digit_count: 0,
            year_range_count: 0,
            numbers: NumericSummary::default(),
            null_marker_count: 0,
        }
    }

    fn observe(&mut self, cell: &Cell<'_>, options: &SchemaOptions) {
        if cell.is_empty() {
            return;
        }
        if options.is_null_marker(cell) {
            self.null_marker_count += 1;
            return;
        }
        let classify_options = ClassifyOptions {
            prefer_string_numbers: options.prefer_string_numbers,
        };
        let Some(classification) = classify_cell(cell, &classify_options) else {
            return;
        };
        let column_type = classification.column_type;
        let format = classification.format.into_owned();
        let display = cell.as_display().into_owned();

        self.non_empty_count += 1;
        self.types.insert(column_type);
        *self.type_counts.entry(column_type).or_insert(0) += 1;
        *self.format_counts.entry(format.clone()).or_insert(0) += 1;
        *self.value_counts.entry(display.clone()).or_insert(0) += 1;

        match column_type {
            ColumnType::String => self.observe_string(&display, &format),
            ColumnType::Number => {
                if let Some(value) = numeric_value(cell) {
                    self.observe_number(value);
                }
            }
            ColumnType::Boolean | ColumnType::Date => {}
        }
        self.formats_by_type
            .entry(column_type)
            .or_default()
            .insert(format);
    }

    fn observe_string(&mut self, display: &str, format: &str) {
        self.str_obs_count += 1;
        *self.str_value_counts.entry(display.to_string()).or_insert(0) += 1;
        if looks_like_list(display) {
            self.list_count += 1;
        }
        if looks_like_percentage(display) {
            self.percent_like_count += 1;
        }
        if format == FORMAT_TEXT {
            *self.text_shapes.entry(text_shape(display)).or_insert(0) += 1;
        }
        self.text.update(display.chars().count());
    }

    fn observe_number(&mut self, value: f64) {
        if let Some(last) = self.last_num
            && value != last + 1.0
        {
            self.is_sequential = false;
        }
        self.last_num = Some(value);
        self.num_count += 1;
        if value.fract() == 0.0 && FOUR_DIGITS.contains(&value) {
            self.four_digit_count += 1;
        }
        if value.fract() == 0.0 && YEAR_RANGE.contains(&value) {
            self.year_range_count += 1;
        }
        self.numbers.update(value);
    }

    pub fn distinct_count(&self) -> usize {
        self.value_counts.len()
    }

    pub fn has_duplicate(&self) -> bool {
        self.value_counts.values().any(|count| *count > 1)
    }

    pub fn has_string_duplicate(&self) -> bool {
        self.max_str_value_count() > 1
    }

    pub fn max_str_value_count(&self) -> usize {
        self.str_value_counts.values().copied().max().unwrap_or(0)
    }

    /// String observations whose value occurs more than once.
    pub fn repeated_str_obs(&self) -> usize {
        self.str_value_counts
            .values()
            .filter(|count| **count > 1)
            .sum()
    }

    /// Strict `+1` run over every numeric observation; needs at least two.
    pub fn is_sequential(&self) -> bool {
        self.is_sequential && self.num_count >= 2
    }

    /// Every numeric observation is a whole four-digit value in 1800..=2100.
    pub fn all_years(&self) -> bool {
        self.num_count > 0
            && self.num_count == self.non_empty_count
            && self.four_digit_count == self.num_count
            && self.year_range_count == self.num_count
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Accumulation {
    pub columns: IndexMap<String, ColumnAccumulator>,
    pub total_rows: usize,
}

/// Walks every object row once. Columns are registered in key encounter
/// order the first time a key appears, even when its value is empty.
pub(crate) fn accumulate(rows: &[Value], options: &SchemaOptions) -> Accumulation {
    let mut accumulation = Accumulation::default();
    let mut sanitizer = options.sanitize_keys.then(KeySanitizer::new);

    for (index, row) in rows.iter().enumerate() {
        let Value::Object(fields) = row else {
            trace!("Skipping row {index}: not an object");
            continue;
        };
        accumulation.total_rows += 1;
        for (raw_key, value) in fields {
            let name = match sanitizer.as_mut() {
                Some(sanitizer) => sanitizer.resolve(raw_key),
                None => raw_key.clone(),
            };
            accumulation
                .columns
                .entry(name)
                .or_insert_with(|| ColumnAccumulator::new(raw_key))
                .observe(&Cell::from_json(value), options);
        }
    }
    accumulation
}
