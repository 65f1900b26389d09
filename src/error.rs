use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlWindowError {
    #[error("SQL compile error: {0}")]
    CompileError(String),

    #[error("Bind error at position {position}: {message}")]
    BindError { position: usize, message: String },

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    /// The engine reported `SQLITE_BUSY` or `SQLITE_LOCKED`; the caller may retry.
    #[error("Database busy: {0}")]
    Busy(String),

    #[error("Query returned no rows")]
    NoData,

    #[error("Unexpected result shape: {0}")]
    ShapeMismatch(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Window(#[from] WindowError),
}

impl SqlWindowError {
    /// Whether the failure is transient contention that a higher layer may retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SqlWindowError::Busy(_))
    }

    pub(crate) fn bind(position: usize, message: impl Into<String>) -> Self {
        SqlWindowError::BindError {
            position,
            message: message.into(),
        }
    }
}

/// Errors raised by [`crate::window::ResultWindow`] itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("window is full")]
    Full,

    #[error("column count is {current}, cannot change to {requested} while rows are present")]
    ColumnCountMismatch { current: usize, requested: usize },

    #[error("column count has not been set")]
    NoColumns,

    #[error("row {position} is outside the window (start {start}, rows {rows})")]
    RowOutOfRange {
        position: usize,
        start: usize,
        rows: usize,
    },

    #[error("column {column} out of range (window has {columns} columns)")]
    ColumnOutOfRange { column: usize, columns: usize },

    #[error("cannot read {found} as {wanted}")]
    TypeMismatch {
        found: &'static str,
        wanted: &'static str,
    },
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(ffi_err, _)
            if matches!(ffi_err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Map an engine error raised while stepping or executing.
///
/// Busy and locked conditions become [`SqlWindowError::Busy`] so callers can
/// tell them apart from hard failures.
pub(crate) fn classify(err: rusqlite::Error) -> SqlWindowError {
    if is_busy(&err) {
        SqlWindowError::Busy(err.to_string())
    } else {
        SqlWindowError::ExecutionError(err.to_string())
    }
}

/// Map an engine error raised while preparing SQL text.
pub(crate) fn classify_compile(err: rusqlite::Error, sql: &str) -> SqlWindowError {
    if is_busy(&err) {
        SqlWindowError::Busy(err.to_string())
    } else {
        SqlWindowError::CompileError(format!("{err} (sql: {sql})"))
    }
}
