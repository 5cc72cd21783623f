//! Column/value mapping shared by executors and entity types.
//!
//! # Responsibility
//! - Carry row data between SQL statements and typed entities.
//! - Provide typed field accessors for entity materialization.
//!
//! # Invariants
//! - Iteration follows column-name order, so generated statements are stable.
//! - Accessors never coerce text to numbers; mismatches are `InvalidData`.

use crate::repo::{RepoError, RepoResult};
use std::collections::BTreeMap;

pub use rusqlite::types::Value;

/// Mapping from column name to scalar value, as read from or written to storage.
pub type Record = BTreeMap<String, Value>;

/// Builds a record from `(column, value)` pairs.
pub fn record<const N: usize>(fields: [(&str, Value); N]) -> Record {
    fields
        .into_iter()
        .map(|(column, value)| (column.to_string(), value))
        .collect()
}

/// Shorthand for `Value::Text`.
pub fn text(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

pub fn take_i64(record: &mut Record, column: &str) -> RepoResult<i64> {
    match record.remove(column) {
        Some(Value::Integer(value)) => Ok(value),
        other => Err(mismatch(column, "integer", other.as_ref())),
    }
}

pub fn take_opt_i64(record: &mut Record, column: &str) -> RepoResult<Option<i64>> {
    match record.remove(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Integer(value)) => Ok(Some(value)),
        Some(other) => Err(mismatch(column, "integer", Some(&other))),
    }
}

/// Reads a real column; integer storage is widened to `f64`.
pub fn take_f64(record: &mut Record, column: &str) -> RepoResult<f64> {
    match record.remove(column) {
        Some(Value::Real(value)) => Ok(value),
        Some(Value::Integer(value)) => Ok(value as f64),
        other => Err(mismatch(column, "real", other.as_ref())),
    }
}

pub fn take_text(record: &mut Record, column: &str) -> RepoResult<String> {
    match record.remove(column) {
        Some(Value::Text(value)) => Ok(value),
        other => Err(mismatch(column, "text", other.as_ref())),
    }
}

pub fn take_opt_text(record: &mut Record, column: &str) -> RepoResult<Option<String>> {
    match record.remove(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Text(value)) => Ok(Some(value)),
        Some(other) => Err(mismatch(column, "text", Some(&other))),
    }
}

pub fn take_blob(record: &mut Record, column: &str) -> RepoResult<Vec<u8>> {
    match record.remove(column) {
        Some(Value::Blob(value)) => Ok(value),
        other => Err(mismatch(column, "blob", other.as_ref())),
    }
}

/// Storage class name of a value, for diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Integer(_) => "integer",
        Value::Real(_) => "real",
        Value::Text(_) => "text",
        Value::Blob(_) => "blob",
    }
}

fn mismatch(column: &str, expected: &str, found: Option<&Value>) -> RepoError {
    let found = found.map_or("missing", value_kind);
    RepoError::InvalidData(format!(
        "column `{column}` expected {expected}, found {found}"
    ))
}
