use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::SqlWindowError;

/// A value bound to a positional placeholder of a compiled statement.
///
/// The set of storable shapes is closed; richer application types are
/// coerced at the boundary through the `From` impls below:
/// ```rust
/// use sql_window::prelude::*;
///
/// let args = vec![
///     BindArg::from(1_i64),
///     BindArg::from("alice"),
///     BindArg::from(true),
///     BindArg::from(None::<f64>),
/// ];
/// assert_eq!(args[2], BindArg::Integer(1));
/// assert!(args[3].is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum BindArg {
    /// SQL NULL
    Null,
    /// Integer value (64-bit)
    Integer(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text value, bound with explicit length
    Text(String),
    /// Binary data, bound with explicit length
    Blob(Vec<u8>),
}

impl BindArg {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let BindArg::Integer(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let BindArg::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let BindArg::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let BindArg::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Name of the variant, used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            BindArg::Null => "null",
            BindArg::Integer(_) => "integer",
            BindArg::Float(_) => "float",
            BindArg::Text(_) => "text",
            BindArg::Blob(_) => "blob",
        }
    }
}

impl From<i64> for BindArg {
    fn from(value: i64) -> Self {
        BindArg::Integer(value)
    }
}

impl From<i32> for BindArg {
    fn from(value: i32) -> Self {
        BindArg::Integer(i64::from(value))
    }
}

impl From<u32> for BindArg {
    fn from(value: u32) -> Self {
        BindArg::Integer(i64::from(value))
    }
}

impl TryFrom<u64> for BindArg {
    type Error = SqlWindowError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value).map(BindArg::Integer).map_err(|_| {
            SqlWindowError::bind(0, format!("{value} does not fit in a 64-bit signed integer"))
        })
    }
}

impl TryFrom<usize> for BindArg {
    type Error = SqlWindowError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        i64::try_from(value).map(BindArg::Integer).map_err(|_| {
            SqlWindowError::bind(0, format!("{value} does not fit in a 64-bit signed integer"))
        })
    }
}

impl From<bool> for BindArg {
    fn from(value: bool) -> Self {
        BindArg::Integer(i64::from(value))
    }
}

impl From<f64> for BindArg {
    fn from(value: f64) -> Self {
        BindArg::Float(value)
    }
}

impl From<f32> for BindArg {
    fn from(value: f32) -> Self {
        BindArg::Float(f64::from(value))
    }
}

impl From<&str> for BindArg {
    fn from(value: &str) -> Self {
        BindArg::Text(value.to_owned())
    }
}

impl From<String> for BindArg {
    fn from(value: String) -> Self {
        BindArg::Text(value)
    }
}

impl From<Vec<u8>> for BindArg {
    fn from(value: Vec<u8>) -> Self {
        BindArg::Blob(value)
    }
}

impl From<&[u8]> for BindArg {
    fn from(value: &[u8]) -> Self {
        BindArg::Blob(value.to_vec())
    }
}

// Timestamps are stored as text, matching SQLite's date/time functions.
impl From<NaiveDateTime> for BindArg {
    fn from(value: NaiveDateTime) -> Self {
        BindArg::Text(value.format("%F %T%.f").to_string())
    }
}

impl From<JsonValue> for BindArg {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => BindArg::Null,
            other => BindArg::Text(other.to_string()),
        }
    }
}

impl<T: Into<BindArg>> From<Option<T>> for BindArg {
    fn from(value: Option<T>) -> Self {
        value.map_or(BindArg::Null, Into::into)
    }
}

/// Storage class of a cell held in a [`crate::window::ResultWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Null,
    Integer,
    Float,
    String,
    Blob,
}

impl FieldType {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Null => "null",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Blob => "blob",
        }
    }
}
