use thiserror::Error;

/// Convenience result type for fallible inference entry points.
pub type InferResult<T> = Result<T, InferError>;

/// Errors surfaced by the library.
///
/// Inference itself never fails: values that cannot be classified fall back to
/// a string classification. The only failure path is handing JSON text to
/// [`crate::schema::get_schema_from_json`] that is not a parseable row array.
#[derive(Debug, Error)]
pub enum InferError {
    /// The JSON text could not be parsed.
    #[error("failed to parse JSON rows: {0}")]
    Parse(#[from] serde_json::Error),

    /// The JSON text parsed, but its top level is not an array of rows.
    #[error("expected a JSON array of row objects, found {found}")]
    NotAnArray { found: &'static str },
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
