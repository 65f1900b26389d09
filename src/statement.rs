use std::fmt;

use rusqlite::Statement;
use rusqlite::types::Value;

use crate::database::{Database, changes_of};
use crate::error::{SqlWindowError, classify};
use crate::params::{owned_value, value_kind};
use crate::program::CompiledProgram;
use crate::types::BindArg;

/// Returned by [`execute_insert`] when the statement inserted nothing.
pub const NO_ROW_INSERTED: i64 = -1;

/// A compiled statement executed for its effect rather than for its rows.
///
/// ```rust
/// use sql_window::prelude::*;
///
/// # fn main() -> Result<(), SqlWindowError> {
/// let db = Database::open_in_memory()?;
/// db.execute_batch("CREATE TABLE t (a INTEGER);")?;
///
/// let args = [BindArg::from(42)];
/// let mut insert = ActionStatement::new(&db, "INSERT INTO t(a) VALUES (?)", &args)?;
/// assert_eq!(insert.execute_insert()?, 1);
///
/// let mut count = ActionStatement::new(&db, "SELECT COUNT(*) FROM t", &[])?;
/// assert_eq!(count.simple_query_for_long()?, 1);
/// # Ok(())
/// # }
/// ```
pub struct ActionStatement<'db> {
    program: CompiledProgram<'db>,
}

impl<'db> ActionStatement<'db> {
    /// Compile `sql` and bind `args` to positions `1..=args.len()`.
    ///
    /// # Errors
    /// Returns `SqlWindowError::CompileError` or `SqlWindowError::BindError`.
    pub fn new(db: &'db Database, sql: &str, args: &[BindArg]) -> Result<Self, SqlWindowError> {
        let mut program = CompiledProgram::compile_as(db, sql, "ActionStatement")?;
        program.bind_all(args)?;
        Ok(Self { program })
    }

    #[must_use]
    pub fn program(&self) -> &CompiledProgram<'db> {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut CompiledProgram<'db> {
        &mut self.program
    }

    /// # Errors
    /// See [`CompiledProgram::bind`].
    pub fn bind(
        &mut self,
        position: usize,
        value: impl Into<BindArg>,
    ) -> Result<(), SqlWindowError> {
        self.program.bind(position, value)
    }

    /// # Errors
    /// See [`CompiledProgram::clear_bindings`].
    pub fn clear_bindings(&mut self) -> Result<(), SqlWindowError> {
        self.program.clear_bindings()
    }

    /// # Errors
    /// See [`execute`].
    pub fn execute(&mut self) -> Result<(), SqlWindowError> {
        execute(&mut self.program)
    }

    /// # Errors
    /// See [`execute_insert`].
    pub fn execute_insert(&mut self) -> Result<i64, SqlWindowError> {
        execute_insert(&mut self.program)
    }

    /// # Errors
    /// See [`execute_update_delete`].
    pub fn execute_update_delete(&mut self) -> Result<usize, SqlWindowError> {
        execute_update_delete(&mut self.program)
    }

    /// # Errors
    /// See [`simple_query_for_long`].
    pub fn simple_query_for_long(&mut self) -> Result<i64, SqlWindowError> {
        simple_query_for_long(&mut self.program)
    }

    /// # Errors
    /// See [`simple_query_for_string`].
    pub fn simple_query_for_string(&mut self) -> Result<Option<String>, SqlWindowError> {
        simple_query_for_string(&mut self.program)
    }

    /// Finalize the statement; idempotent.
    pub fn close(&mut self) {
        self.program.close();
    }
}

impl fmt::Display for ActionStatement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.program, f)
    }
}

impl fmt::Debug for ActionStatement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionStatement")
            .field("program", &self.program)
            .finish()
    }
}

// Step until SQLITE_DONE; dropping the rows resets the statement.
fn run_to_completion(stmt: &mut Statement<'_>) -> Result<(), SqlWindowError> {
    let mut rows = stmt.raw_query();
    while rows.next().map_err(classify)?.is_some() {}
    Ok(())
}

/// Run the statement once, discarding any rows it produces.
///
/// # Errors
/// Returns `SqlWindowError::IllegalState` if the program is closed or was
/// already executed in this bind cycle, `SqlWindowError::Busy` on lock
/// contention, and `SqlWindowError::ExecutionError` for any other engine failure.
pub fn execute(program: &mut CompiledProgram<'_>) -> Result<(), SqlWindowError> {
    let (_, stmt) = program.begin_execution("execute")?;
    run_to_completion(stmt)
}

/// Run an INSERT and return the engine-assigned row id, or
/// [`NO_ROW_INSERTED`] when no row was inserted.
///
/// # Errors
/// Same as [`execute`].
pub fn execute_insert(program: &mut CompiledProgram<'_>) -> Result<i64, SqlWindowError> {
    let (conn, stmt) = program.begin_execution("execute insert")?;
    run_to_completion(stmt)?;
    if changes_of(conn)? > 0 {
        Ok(conn.last_insert_rowid())
    } else {
        Ok(NO_ROW_INSERTED)
    }
}

/// Run an UPDATE or DELETE and return the number of rows it changed.
///
/// # Errors
/// Same as [`execute`].
pub fn execute_update_delete(program: &mut CompiledProgram<'_>) -> Result<usize, SqlWindowError> {
    let (conn, stmt) = program.begin_execution("execute update/delete")?;
    run_to_completion(stmt)?;
    let changes = changes_of(conn)?;
    usize::try_from(changes)
        .map_err(|e| SqlWindowError::ExecutionError(format!("change count out of range: {e}")))
}

// Exactly one row with exactly one column, or a shape error.
fn single_value(program: &mut CompiledProgram<'_>, ctx: &str) -> Result<Value, SqlWindowError> {
    let columns = program.column_count();
    let (_, stmt) = program.begin_execution(ctx)?;
    if columns != 1 {
        return Err(SqlWindowError::ShapeMismatch(format!(
            "expected exactly one column, statement returns {columns}"
        )));
    }
    let mut rows = stmt.raw_query();
    let value = match rows.next().map_err(classify)? {
        Some(row) => owned_value(row.get_ref(0).map_err(classify)?),
        None => return Err(SqlWindowError::NoData),
    };
    if rows.next().map_err(classify)?.is_some() {
        return Err(SqlWindowError::ShapeMismatch(
            "expected exactly one row, query returned more".into(),
        ));
    }
    Ok(value)
}

#[allow(clippy::cast_possible_truncation)]
fn truncate_to_long(value: f64) -> i64 {
    value as i64
}

/// Run a query expected to yield one row with one column and read it as an integer.
///
/// Reals are truncated and numeric text is parsed; NULL, blobs and
/// non-numeric text are shape errors.
///
/// # Errors
/// Returns `SqlWindowError::NoData` if no row was produced,
/// `SqlWindowError::ShapeMismatch` for any other shape or a value that cannot
/// be read as an integer, plus the errors of [`execute`].
pub fn simple_query_for_long(program: &mut CompiledProgram<'_>) -> Result<i64, SqlWindowError> {
    let value = single_value(program, "simple query for long")?;
    match value {
        Value::Integer(i) => Ok(i),
        Value::Real(f) => Ok(truncate_to_long(f)),
        Value::Text(ref s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(truncate_to_long))
                .ok_or_else(|| {
                    SqlWindowError::ShapeMismatch(format!("text {s:?} is not a number"))
                })
        }
        other => Err(SqlWindowError::ShapeMismatch(format!(
            "cannot read {} as an integer",
            value_kind(&other)
        ))),
    }
}

/// Run a query expected to yield one row with one column and read it as text.
///
/// A NULL cell reads as `None`.
///
/// # Errors
/// Same as [`simple_query_for_long`], except that every storage class can be
/// read as text.
pub fn simple_query_for_string(
    program: &mut CompiledProgram<'_>,
) -> Result<Option<String>, SqlWindowError> {
    let value = single_value(program, "simple query for string")?;
    Ok(match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
        Value::Blob(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
    })
}
