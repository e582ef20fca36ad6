//! Plain-text summary table for `probe` output.

use std::borrow::Cow;
use std::fmt::Write as _;

use itertools::Itertools;

use crate::schema::ColumnDescriptor;

const SUMMARY_HEADERS: &[&str] = &[
    "#",
    "name",
    "type",
    "format",
    "complete",
    "distinct",
    "probably",
    "top values",
];

/// One line per column: index, name, resolved type and format, completeness,
/// distinct count, best guess and the leading top values.
pub fn render_schema_table(columns: &[ColumnDescriptor]) -> String {
    let headers: Vec<String> = SUMMARY_HEADERS.iter().map(|h| h.to_string()).collect();
    let rows: Vec<Vec<String>> = columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            vec![
                (idx + 1).to_string(),
                column.name.clone(),
                column.column_type.to_string(),
                column.format.clone().unwrap_or_else(|| "-".to_string()),
                format!("{:.0}%", column.completeness * 100.0),
                column.distinct_count.to_string(),
                column.probably.clone().unwrap_or_default(),
                column
                    .top_k
                    .iter()
                    .take(3)
                    .map(|(value, count)| format!("{value} ({count})"))
                    .join(", "),
            ]
        })
        .collect();
    render_table(&headers, &rows)
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h).max(1)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(&sanitize_cell(cell)));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
    let _ = writeln!(output, "{}", format_row(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cell = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .join("  ")
        .trim_end()
        .to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
