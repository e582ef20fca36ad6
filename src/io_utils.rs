//! Row sources and output sinks.
//!
//! Inputs are CSV files with a header row or JSON arrays of row objects;
//! both decode through `encoding_rs`, defaulting to UTF-8. Outputs go to a
//! file or to stdout when the path is `-` or absent.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;
use indexmap::IndexSet;
use log::debug;
use serde::Serialize;
use serde_json::Value;

use crate::data::{Row, rows_from_json};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    Csv,
    Json,
}

impl RowFormat {
    /// `.json` selects JSON; everything else, stdin included, is CSV.
    pub fn from_path(path: &Path) -> Self {
        if has_extension(path, "json") {
            RowFormat::Json
        } else {
            RowFormat::Csv
        }
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

fn has_extension(path: &Path, expected: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(expected))
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or(if has_extension(path, "tsv") {
        DEFAULT_TSV_DELIMITER
    } else {
        DEFAULT_CSV_DELIMITER
    })
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        )))
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Reads CSV records into row objects of strings keyed by header. Short
/// records omit their missing trailing keys; surplus fields are dropped.
pub fn read_csv_rows<R: Read>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<Value>> {
    let mut csv_reader = open_csv_reader(reader, delimiter);
    let headers = decode_record(csv_reader.byte_headers()?, encoding)?;
    let mut rows = Vec::new();
    for (index, record) in csv_reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading CSV record {}", index + 1))?;
        let fields = decode_record(&record, encoding)
            .with_context(|| format!("Decoding CSV record {}", index + 1))?;
        if fields.len() > headers.len() {
            debug!(
                "Record {} has {} fields for {} headers; dropping the surplus",
                index + 1,
                fields.len(),
                headers.len()
            );
        }
        let row: Row = headers
            .iter()
            .cloned()
            .zip(fields.into_iter().map(Value::String))
            .collect();
        rows.push(Value::Object(row));
    }
    Ok(rows)
}

pub fn read_json_rows<R: Read>(reader: R, encoding: &'static Encoding) -> Result<Vec<Value>> {
    let mut decoded = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(reader);
    let mut text = String::new();
    decoded
        .read_to_string(&mut text)
        .context("Decoding JSON input")?;
    Ok(rows_from_json(&text)?)
}

/// Loads every row of `path` into memory.
pub fn read_rows(
    path: &Path,
    format: RowFormat,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Vec<Value>> {
    let reader = open_input(path)?;
    let rows = match format {
        RowFormat::Csv => read_csv_rows(reader, resolve_delimiter(path, delimiter), encoding),
        RowFormat::Json => read_json_rows(reader, encoding),
    }
    .with_context(|| format!("Reading rows from {path:?}"))?;
    debug!("Loaded {} row(s) from {path:?}", rows.len());
    Ok(rows)
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) if !is_dash(p) => Ok(Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        ))),
        _ => Ok(Box::new(io::stdout())),
    }
}

/// Writes `text` in the requested encoding.
pub fn write_text(path: Option<&Path>, text: &str, encoding: &'static Encoding) -> Result<()> {
    let (encoded, _, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(anyhow!("Failed to encode output using {}", encoding.name()));
    }
    let mut writer = open_output(path)?;
    writer.write_all(encoded.as_ref())?;
    writer.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: Option<&Path>, value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).context("Serializing JSON output")?;
    text.push('\n');
    write_text(path, &text, UTF_8)
}

pub fn write_yaml<T: Serialize + ?Sized>(path: Option<&Path>, value: &T) -> Result<()> {
    let text = serde_yaml::to_string(value).context("Serializing YAML output")?;
    write_text(path, &text, UTF_8)
}

/// Writes formatted rows as CSV when the output path ends in `.csv` or
/// `.tsv`, as a pretty JSON array otherwise.
pub fn write_rows(
    path: Option<&Path>,
    rows: &[Row],
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<()> {
    let csv_target = path.filter(|p| has_extension(p, "csv") || has_extension(p, "tsv"));
    let text = match csv_target {
        Some(target) => render_csv(rows, resolve_delimiter(target, delimiter))?,
        None => {
            let mut text =
                serde_json::to_string_pretty(rows).context("Serializing formatted rows")?;
            text.push('\n');
            text
        }
    };
    write_text(path, &text, encoding)
}

/// Header is the union of row keys in first-seen order.
fn render_csv(rows: &[Row], delimiter: u8) -> Result<String> {
    let headers: IndexSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(&headers)?;
    for row in rows {
        writer.write_record(headers.iter().map(|header| csv_cell(row.get(*header))))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow!("Flushing CSV output: {}", err.error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn csv_rows_are_string_objects() {
        let data = "id,name\n1,Alice\n2\n3,Carol,extra\n";
        let rows = read_csv_rows(data.as_bytes(), b',', UTF_8).expect("csv parses");
        assert_eq!(
            Value::Array(rows),
            json!([
                {"id": "1", "name": "Alice"},
                {"id": "2"},
                {"id": "3", "name": "Carol"}
            ])
        );
    }

    #[test]
    fn latin1_csv_is_decoded() {
        let encoding = resolve_encoding(Some("latin1")).expect("known label");
        let bytes = b"city\nM\xfcnchen\n";
        let rows = read_csv_rows(&bytes[..], b',', encoding).expect("csv parses");
        assert_eq!(rows[0]["city"], json!("M\u{fc}nchen"));
    }

    #[test]
    fn json_rows_must_be_an_array() {
        let rows = read_json_rows(r#"[{"a": 1}]"#.as_bytes(), UTF_8).expect("json parses");
        assert_eq!(rows, vec![json!({"a": 1})]);
        assert!(read_json_rows(r#"{"a": 1}"#.as_bytes(), UTF_8).is_err());
    }

    #[test]
    fn delimiters_follow_extension() {
        assert_eq!(resolve_delimiter(Path::new("a.tsv"), None), b'\t');
        assert_eq!(resolve_delimiter(Path::new("a.csv"), None), b',');
        assert_eq!(resolve_delimiter(Path::new("a.tsv"), Some(b'|')), b'|');
        assert_eq!(RowFormat::from_path(Path::new("rows.JSON")), RowFormat::Json);
        assert_eq!(RowFormat::from_path(Path::new("-")), RowFormat::Csv);
    }

    #[test]
    fn csv_output_uses_key_union() {
        let rows: Vec<Row> = [json!({"a": 1, "b": null}), json!({"c": "x,y"})]
            .into_iter()
            .filter_map(|value| value.as_object().cloned())
            .collect();
        let text = render_csv(&rows, b',').expect("csv renders");
        assert_eq!(text, "a,b,c\n1,,\n,,\"x,y\"\n");
    }

    #[test]
    fn unknown_encodings_are_rejected() {
        assert!(resolve_encoding(Some("klingon")).is_err());
        assert_eq!(resolve_encoding(None).expect("default"), UTF_8);
    }
}
