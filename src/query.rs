//! Row-producing statements and the window paging loop.
//!
//! Every fill re-runs the statement from its first row and steps past the
//! rows before the requested start, so filling backwards yields exactly the
//! rows a fresh forward fill would.

use std::fmt;

use rusqlite::Row;
use rusqlite::types::ValueRef;

use crate::database::Database;
use crate::error::{SqlWindowError, WindowError, classify};
use crate::program::CompiledProgram;
use crate::types::BindArg;
use crate::window::ResultWindow;

/// A compiled row-producing statement that pages its result into windows.
pub struct RowQuery<'db> {
    program: CompiledProgram<'db>,
}

impl<'db> RowQuery<'db> {
    /// Compile `sql` and bind `args` to positions `1..=args.len()`.
    ///
    /// # Errors
    /// Returns `SqlWindowError::CompileError` or `SqlWindowError::BindError`.
    pub fn new(db: &'db Database, sql: &str, args: &[BindArg]) -> Result<Self, SqlWindowError> {
        let mut program = CompiledProgram::compile_as(db, sql, "RowQuery")?;
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

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.program.column_names()
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
    /// See [`fill_window`].
    pub fn fill_window(
        &mut self,
        window: &mut ResultWindow,
        start_pos: usize,
        required_pos: usize,
        count_all_rows: bool,
    ) -> Result<usize, SqlWindowError> {
        fill_window(&mut self.program, window, start_pos, required_pos, count_all_rows)
    }

    /// Finalize the statement; idempotent.
    pub fn close(&mut self) {
        self.program.close();
    }
}

impl fmt::Display for RowQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.program, f)
    }
}

impl fmt::Debug for RowQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowQuery")
            .field("program", &self.program)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CopyRow {
    Copied,
    Full,
}

fn put_value(
    window: &mut ResultWindow,
    position: usize,
    column: usize,
    value: ValueRef<'_>,
) -> Result<(), WindowError> {
    match value {
        ValueRef::Null => window.put_null(position, column),
        ValueRef::Integer(i) => window.put_long(position, column, i),
        ValueRef::Real(f) => window.put_double(position, column, f),
        ValueRef::Text(bytes) => window.put_string(position, column, bytes),
        ValueRef::Blob(bytes) => window.put_blob(position, column, bytes),
    }
}

/// Append `row` to the window. A row that does not fit is removed again, so
/// the window never holds a partially written row.
fn copy_row(
    window: &mut ResultWindow,
    row: &Row<'_>,
    num_columns: usize,
) -> Result<CopyRow, SqlWindowError> {
    match window.alloc_row() {
        Ok(()) => {}
        Err(WindowError::Full) => return Ok(CopyRow::Full),
        Err(e) => return Err(e.into()),
    }
    let position = window.start_position() + window.num_rows() - 1;
    for column in 0..num_columns {
        let stored = match row.get_ref(column) {
            Ok(value) => put_value(window, position, column, value),
            Err(e) => {
                window.free_last_row();
                return Err(classify(e));
            }
        };
        match stored {
            Ok(()) => {}
            Err(WindowError::Full) => {
                window.free_last_row();
                return Ok(CopyRow::Full);
            }
            Err(e) => {
                window.free_last_row();
                return Err(e.into());
            }
        }
    }
    Ok(CopyRow::Copied)
}

fn restart_window(
    window: &mut ResultWindow,
    start: usize,
    num_columns: usize,
) -> Result<(), SqlWindowError> {
    window.clear();
    window.set_start_position(start);
    window.set_num_columns(num_columns)?;
    Ok(())
}

/// Fill `window` with rows of the query starting at `start_pos`.
///
/// The window is cleared and refilled from `start_pos` until the result is
/// exhausted or the window runs out of space. If it fills up before
/// reaching `required_pos`, it is cleared and filling continues from the
/// row that did not fit, so the returned window always covers
/// `required_pos` when that row exists. A single row too large for an empty
/// window is skipped if it precedes `required_pos` and admitted on its own
/// otherwise. The window's start position reflects wherever filling
/// actually began.
///
/// With `count_all_rows` set, the rest of the result is stepped through and
/// the total number of result rows is returned. Otherwise the return value
/// is the number of rows materialized in the window, a lower bound on what
/// the result holds.
///
/// # Errors
/// Returns `SqlWindowError::IllegalState` if the program is closed or was
/// consumed by a one-shot execution, `SqlWindowError::ShapeMismatch` if the
/// statement produces no columns, and `SqlWindowError::Busy` or
/// `SqlWindowError::ExecutionError` if stepping fails. On error the window
/// keeps the complete rows copied so far.
pub fn fill_window(
    program: &mut CompiledProgram<'_>,
    window: &mut ResultWindow,
    start_pos: usize,
    required_pos: usize,
    count_all_rows: bool,
) -> Result<usize, SqlWindowError> {
    program.ensure_open("fill window")?;
    let num_columns = program.column_count();
    if num_columns == 0 {
        return Err(SqlWindowError::ShapeMismatch(format!(
            "{} does not produce rows",
            program.label()
        )));
    }
    let stmt = program.begin_streaming("fill window")?;
    restart_window(window, start_pos, num_columns)?;

    let mut start = start_pos;
    let mut total_rows = 0_usize;
    let mut added_rows = 0_usize;
    let mut window_full = false;

    let mut rows = stmt.raw_query();
    while !window_full || count_all_rows {
        let Some(row) = rows.next().map_err(classify)? else {
            break;
        };
        if total_rows < start || window_full {
            total_rows += 1;
            continue;
        }

        let mut copied = copy_row(window, row, num_columns)?;
        if copied == CopyRow::Full && added_rows > 0 && start + added_rows <= required_pos {
            // Filled up before reaching the row the caller needs: move the
            // window forward to the row that did not fit.
            start += added_rows;
            added_rows = 0;
            restart_window(window, start, num_columns)?;
            copied = copy_row(window, row, num_columns)?;
        }
        if copied == CopyRow::Full && added_rows == 0 {
            if total_rows < required_pos {
                start += 1;
                window.set_start_position(start);
                total_rows += 1;
                continue;
            }
            tracing::debug!(position = total_rows, "admitting oversized row");
            window.grow_for_single_row();
            copied = copy_row(window, row, num_columns)?;
        }

        match copied {
            CopyRow::Copied => added_rows += 1,
            CopyRow::Full => window_full = true,
        }
        total_rows += 1;
    }
    drop(rows);

    tracing::debug!(
        sql = %program.sql(),
        start,
        rows = added_rows,
        total_rows,
        window_full,
        "filled window"
    );
    if count_all_rows {
        Ok(total_rows)
    } else {
        Ok(window.num_rows())
    }
}
