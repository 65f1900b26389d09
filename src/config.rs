use std::time::Duration;

use serde::Deserialize;

use crate::database::Database;
use crate::error::SqlWindowError;
use crate::window::DEFAULT_WINDOW_CAPACITY;

/// Options for opening a [`Database`].
///
/// Deserializable so hosts can keep them next to the rest of their configuration:
/// ```rust
/// use sql_window::config::DatabaseOptions;
///
/// let json = r#"{ "db_path": ":memory:", "window_capacity": 4096 }"#;
/// let opts = DatabaseOptions::from_json_str(json).unwrap();
/// assert_eq!(opts.window_capacity, 4096);
/// assert!(!opts.wal);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    pub db_path: String,
    /// How long the engine waits on a locked database before reporting busy.
    pub busy_timeout_ms: u64,
    /// Switch the journal to WAL after opening.
    pub wal: bool,
    /// Byte capacity of windows handed out by [`Database::new_window`].
    pub window_capacity: usize,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            db_path: ":memory:".to_string(),
            busy_timeout_ms: 0,
            wal: false,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

impl DatabaseOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> DatabaseOptionsBuilder {
        DatabaseOptionsBuilder::new(db_path)
    }

    /// Parse options from a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns `SqlWindowError::ConfigError` if the document is malformed or
    /// the resulting options are invalid.
    pub fn from_json_str(json: &str) -> Result<Self, SqlWindowError> {
        let opts: Self = serde_json::from_str(json)
            .map_err(|e| SqlWindowError::ConfigError(format!("invalid options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// # Errors
    /// Returns `SqlWindowError::ConfigError` for an empty path or a zero window capacity.
    pub fn validate(&self) -> Result<(), SqlWindowError> {
        if self.db_path.trim().is_empty() {
            return Err(SqlWindowError::ConfigError(
                "db_path must not be empty".into(),
            ));
        }
        if self.window_capacity == 0 {
            return Err(SqlWindowError::ConfigError(
                "window_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Fluent builder for [`DatabaseOptions`].
#[derive(Debug, Clone)]
pub struct DatabaseOptionsBuilder {
    opts: DatabaseOptions,
}

impl DatabaseOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: DatabaseOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn window_capacity(mut self, bytes: usize) -> Self {
        self.opts.window_capacity = bytes;
        self
    }

    #[must_use]
    pub fn finish(self) -> DatabaseOptions {
        self.opts
    }

    /// Open a [`Database`] with the accumulated options.
    ///
    /// # Errors
    /// Returns `SqlWindowError` if the options are invalid or the file cannot be opened.
    pub fn open(self) -> Result<Database, SqlWindowError> {
        Database::open(self.finish())
    }
}
