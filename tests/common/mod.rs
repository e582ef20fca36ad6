#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use column_infer::{ColumnDescriptor, Row};
use serde_json::Value;
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).expect("write temp file bytes");
        path
    }
}

/// Unpacks a `json!` array literal into a row slice.
pub fn rows(value: Value) -> Vec<Value> {
    match value {
        Value::Array(rows) => rows,
        other => panic!("expected an array of rows, got {other}"),
    }
}

/// Single-column rows from a list of raw values.
pub fn column_rows(name: &str, values: &[Value]) -> Vec<Value> {
    values
        .iter()
        .map(|value| {
            let mut row = serde_json::Map::new();
            row.insert(name.to_string(), value.clone());
            Value::Object(row)
        })
        .collect()
}

pub fn find<'a>(schema: &'a [ColumnDescriptor], name: &str) -> &'a ColumnDescriptor {
    schema
        .iter()
        .find(|column| column.name == name)
        .unwrap_or_else(|| panic!("column {name} present"))
}

pub fn to_value(rows: Vec<Row>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}
