use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::DatabaseOptions;
use crate::database::Database;
use crate::error::SqlWindowError;

/// Shared handle to a [`Database`] whose operations are serialized by a lock.
///
/// Statements and windows are synchronous and tied to one thread of control;
/// `with_database` runs a closure holding the lock on a blocking worker so async
/// callers never stall the runtime:
/// ```rust
/// use sql_window::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), SqlWindowError> {
/// let shared = SharedDatabase::open(DatabaseOptions::new(":memory:")).await?;
/// let answer = shared
///     .with_database(|db| ActionStatement::new(db, "SELECT 6 * 7", &[])?.simple_query_for_long())
///     .await?;
/// assert_eq!(answer, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    /// Open a database on a blocking worker and wrap it.
    ///
    /// # Errors
    /// Returns `SqlWindowError` if the options are invalid or opening fails.
    pub async fn open(options: DatabaseOptions) -> Result<Self, SqlWindowError> {
        let db = tokio::task::spawn_blocking(move || Database::open(options))
            .await
            .map_err(|e| {
                SqlWindowError::ConnectionError(format!("sqlite spawn_blocking join error: {e}"))
            })??;
        Ok(Self::new(db))
    }

    /// Run synchronous logic against the database while holding its lock.
    ///
    /// # Errors
    /// Returns whatever `func` returns, or `SqlWindowError::ConnectionError` if the
    /// database is closed or the blocking task fails.
    pub async fn with_database<F, R>(&self, func: F) -> Result<R, SqlWindowError>
    where
        F: FnOnce(&Database) -> Result<R, SqlWindowError> + Send + 'static,
        R: Send + 'static,
    {
        run_blocking(Arc::clone(&self.inner), move |db| {
            if !db.is_open() {
                return Err(SqlWindowError::ConnectionError(
                    "database is closed (with database)".into(),
                ));
            }
            func(db)
        })
        .await
    }

    /// Close the underlying database once in-flight work releases the lock.
    ///
    /// # Errors
    /// Returns `SqlWindowError::ConnectionError` if `SQLite` reports a close failure.
    pub async fn close(&self) -> Result<(), SqlWindowError> {
        run_blocking(Arc::clone(&self.inner), Database::close).await
    }

    /// Whether the underlying database is still open.
    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.is_open()
    }
}

impl fmt::Debug for SharedDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedDatabase").finish_non_exhaustive()
    }
}

pub(crate) async fn run_blocking<F, R>(
    db: Arc<Mutex<Database>>,
    func: F,
) -> Result<R, SqlWindowError>
where
    F: FnOnce(&mut Database) -> Result<R, SqlWindowError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = db.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| {
        SqlWindowError::ConnectionError(format!("sqlite spawn_blocking join error: {e}"))
    })?
}
