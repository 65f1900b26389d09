use std::fmt;

use rusqlite::{Connection, InterruptHandle};

use crate::config::DatabaseOptions;
use crate::error::{SqlWindowError, classify};
use crate::window::ResultWindow;

/// An open `SQLite` database, the connection that statements compile against.
///
/// The connection is not thread-safe; share it through
/// [`crate::connection::SharedDatabase`] when more than one task needs it.
/// Statements borrow the database, so it cannot be closed while any of
/// them is alive.
pub struct Database {
    conn: Option<Connection>,
    options: DatabaseOptions,
}

impl Database {
    /// Open (or create) the database described by `options`.
    ///
    /// # Errors
    /// Returns `SqlWindowError::ConfigError` for invalid options, or
    /// `SqlWindowError::ConnectionError` if the file cannot be opened or the
    /// initial pragmas fail.
    pub fn open(options: DatabaseOptions) -> Result<Self, SqlWindowError> {
        options.validate()?;
        let conn = Connection::open(&options.db_path).map_err(|e| {
            SqlWindowError::ConnectionError(format!(
                "failed to open {}: {e}",
                options.db_path
            ))
        })?;
        conn.busy_timeout(options.busy_timeout())
            .map_err(|e| SqlWindowError::ConnectionError(format!("busy timeout: {e}")))?;
        if options.wal {
            apply_wal_pragmas(&conn)?;
        }
        tracing::info!(path = %options.db_path, wal = options.wal, "opened database");
        Ok(Self {
            conn: Some(conn),
            options,
        })
    }

    /// Open a private in-memory database with default options.
    ///
    /// # Errors
    /// Returns `SqlWindowError::ConnectionError` if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, SqlWindowError> {
        Self::open(DatabaseOptions::default())
    }

    #[must_use]
    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub(crate) fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    fn open_connection(&self, ctx: &str) -> Result<&Connection, SqlWindowError> {
        self.conn.as_ref().ok_or_else(|| {
            SqlWindowError::ConnectionError(format!("database is closed ({ctx})"))
        })
    }

    /// Close the connection. Calling this on a closed database is a no-op.
    ///
    /// # Errors
    /// Returns `SqlWindowError::ConnectionError` if `SQLite` refuses to close; the
    /// database is considered closed either way.
    pub fn close(&mut self) -> Result<(), SqlWindowError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        tracing::debug!(path = %self.options.db_path, "closing database");
        conn.close()
            .map_err(|(_, e)| SqlWindowError::ConnectionError(format!("close failed: {e}")))
    }

    /// Handle that interrupts whatever statement is running on this connection.
    ///
    /// Safe to use from another thread; the interrupted call fails with
    /// `SqlWindowError::ExecutionError`.
    ///
    /// # Errors
    /// Returns `SqlWindowError::ConnectionError` if the database is closed.
    pub fn interrupt_handle(&self) -> Result<InterruptHandle, SqlWindowError> {
        Ok(self.open_connection("interrupt handle")?.get_interrupt_handle())
    }

    /// Execute a batch of statements; wraps in a transaction when not already inside one.
    ///
    /// # Errors
    /// Returns `SqlWindowError` if the database is closed or any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<(), SqlWindowError> {
        let conn = self.open_connection("execute batch")?;
        if conn.is_autocommit() {
            let tx = conn.unchecked_transaction().map_err(classify)?;
            tx.execute_batch(sql).map_err(classify)?;
            tx.commit().map_err(classify)
        } else {
            conn.execute_batch(sql).map_err(classify)
        }
    }

    /// Row id of the most recent successful INSERT on this connection.
    ///
    /// # Errors
    /// Returns `SqlWindowError::ConnectionError` if the database is closed.
    pub fn last_insert_rowid(&self) -> Result<i64, SqlWindowError> {
        Ok(self.open_connection("last insert rowid")?.last_insert_rowid())
    }

    /// Rows changed by the most recent INSERT, UPDATE or DELETE.
    ///
    /// # Errors
    /// Returns `SqlWindowError::ConnectionError` if the database is closed.
    pub fn changes(&self) -> Result<u64, SqlWindowError> {
        changes_of(self.open_connection("changes")?)
    }

    /// A window sized by [`DatabaseOptions::window_capacity`].
    #[must_use]
    pub fn new_window(&self) -> ResultWindow {
        ResultWindow::new(self.options.window_capacity)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("db_path", &self.options.db_path)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

pub(crate) fn changes_of(conn: &Connection) -> Result<u64, SqlWindowError> {
    u64::try_from(conn.changes())
        .map_err(|e| SqlWindowError::ExecutionError(format!("change count out of range: {e}")))
}

/// Apply WAL pragmas to an open connection.
///
/// # Errors
/// Returns `SqlWindowError::ConnectionError` if the PRAGMA cannot be executed.
pub fn apply_wal_pragmas(conn: &Connection) -> Result<(), SqlWindowError> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")
        .map_err(|e| SqlWindowError::ConnectionError(format!("failed to enable WAL: {e}")))
}
