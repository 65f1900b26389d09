use rusqlite::Statement;
use rusqlite::types::{Null, Value, ValueRef};

use crate::error::SqlWindowError;
use crate::types::BindArg;

/// Bind a single argument to the 1-based placeholder `position`.
///
/// Text and blobs are handed to `SQLite` with their explicit length. Text
/// holding a NUL byte is refused because `SQLite` string functions would
/// silently stop at it.
///
/// # Errors
/// Returns `SqlWindowError::BindError` if the value is rejected or `SQLite`
/// refuses the binding.
pub(crate) fn bind_value(
    stmt: &mut Statement<'_>,
    position: usize,
    value: &BindArg,
) -> Result<(), SqlWindowError> {
    let bound = match value {
        BindArg::Null => stmt.raw_bind_parameter(position, Null),
        BindArg::Integer(i) => stmt.raw_bind_parameter(position, *i),
        BindArg::Float(f) => stmt.raw_bind_parameter(position, *f),
        BindArg::Text(s) => {
            if s.contains('\0') {
                return Err(SqlWindowError::bind(
                    position,
                    "text contains an embedded NUL byte",
                ));
            }
            stmt.raw_bind_parameter(position, s.as_str())
        }
        BindArg::Blob(bytes) => stmt.raw_bind_parameter(position, bytes.as_slice()),
    };
    bound.map_err(|e| SqlWindowError::bind(position, e.to_string()))
}

/// Copy a borrowed engine value into an owned one; invalid UTF-8 text is
/// replaced rather than rejected.
pub(crate) fn owned_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

/// Name of an engine value's storage class, used in diagnostics.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Integer(_) => "integer",
        Value::Real(_) => "real",
        Value::Text(_) => "text",
        Value::Blob(_) => "blob",
    }
}
