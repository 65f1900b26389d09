//! Compiled statement handle shared by [`crate::statement::ActionStatement`]
//! and [`crate::query::RowQuery`].
//!
//! A program is compiled eagerly, bound by position, executed once per bind
//! cycle and finalized exactly once, either by [`CompiledProgram::close`]
//! or when it is dropped.

use std::fmt;

use rusqlite::{Connection, Statement};

use crate::database::Database;
use crate::error::{SqlWindowError, classify_compile};
use crate::params::bind_value;
use crate::types::BindArg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgramState {
    /// Compiled; arguments may be bound.
    Ready,
    /// Executed once; must be cleared before another bind cycle.
    Executed,
    /// Rows are being paged out; further fills are allowed, binds are not.
    Streaming,
}

/// Owns one compiled `SQLite` statement and its positional bind state.
pub struct CompiledProgram<'db> {
    conn: &'db Connection,
    stmt: Option<Statement<'db>>,
    sql: String,
    label: &'static str,
    bind_args: Vec<BindArg>,
    column_names: Vec<String>,
    state: ProgramState,
}

impl<'db> CompiledProgram<'db> {
    /// Compile `sql` against `db`.
    ///
    /// # Errors
    /// Returns `SqlWindowError::CompileError` if the database is closed or the
    /// text is not a single valid statement, or `SqlWindowError::Busy` if the
    /// schema is locked.
    pub fn compile(db: &'db Database, sql: &str) -> Result<Self, SqlWindowError> {
        Self::compile_as(db, sql, "CompiledProgram")
    }

    pub(crate) fn compile_as(
        db: &'db Database,
        sql: &str,
        label: &'static str,
    ) -> Result<Self, SqlWindowError> {
        let conn = db.connection().ok_or_else(|| {
            SqlWindowError::CompileError(format!("database is closed (sql: {sql})"))
        })?;
        if sql.trim().is_empty() {
            return Err(SqlWindowError::CompileError("empty SQL text".into()));
        }
        let stmt = conn.prepare(sql).map_err(|e| classify_compile(e, sql))?;
        let column_names = stmt
            .column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect();
        let bind_args = vec![BindArg::Null; stmt.parameter_count()];
        tracing::debug!(kind = label, sql, params = bind_args.len(), "compiled statement");
        Ok(Self {
            conn,
            stmt: Some(stmt),
            sql: sql.to_owned(),
            label,
            bind_args,
            column_names,
            state: ProgramState::Ready,
        })
    }

    /// The SQL text this program was compiled from.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of positional placeholders in the compiled SQL.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.bind_args.len()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Values currently bound, in placeholder order; unbound positions read as NULL.
    #[must_use]
    pub fn bind_args(&self) -> &[BindArg] {
        &self.bind_args
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.stmt.is_none()
    }

    pub(crate) fn ensure_open(&self, ctx: &str) -> Result<(), SqlWindowError> {
        if self.stmt.is_none() {
            return Err(SqlWindowError::IllegalState(format!(
                "{ctx}: program already closed"
            )));
        }
        Ok(())
    }

    fn stmt_mut(&mut self, ctx: &str) -> Result<&mut Statement<'db>, SqlWindowError> {
        self.stmt.as_mut().ok_or_else(|| {
            SqlWindowError::IllegalState(format!("{ctx}: program already closed"))
        })
    }

    /// Bind `value` to the 1-based placeholder `position`.
    ///
    /// # Errors
    /// Returns `SqlWindowError::IllegalState` after close or after execution,
    /// and `SqlWindowError::BindError` when `position` is outside
    /// `1..=parameter_count()` or the value is rejected.
    pub fn bind(
        &mut self,
        position: usize,
        value: impl Into<BindArg>,
    ) -> Result<(), SqlWindowError> {
        self.ensure_open("bind")?;
        if self.state != ProgramState::Ready {
            return Err(SqlWindowError::IllegalState(
                "bind after execution; call clear_bindings to start a new cycle".into(),
            ));
        }
        let count = self.bind_args.len();
        if position == 0 || position > count {
            return Err(SqlWindowError::bind(
                position,
                format!("index out of range, statement has {count} parameters"),
            ));
        }
        let value = value.into();
        bind_value(self.stmt_mut("bind")?, position, &value)?;
        self.bind_args[position - 1] = value;
        Ok(())
    }

    /// # Errors
    /// See [`Self::bind`].
    pub fn bind_null(&mut self, position: usize) -> Result<(), SqlWindowError> {
        self.bind(position, BindArg::Null)
    }

    /// # Errors
    /// See [`Self::bind`].
    pub fn bind_long(&mut self, position: usize, value: i64) -> Result<(), SqlWindowError> {
        self.bind(position, BindArg::Integer(value))
    }

    /// # Errors
    /// See [`Self::bind`].
    pub fn bind_double(&mut self, position: usize, value: f64) -> Result<(), SqlWindowError> {
        self.bind(position, BindArg::Float(value))
    }

    /// # Errors
    /// See [`Self::bind`].
    pub fn bind_string(&mut self, position: usize, value: &str) -> Result<(), SqlWindowError> {
        self.bind(position, BindArg::Text(value.to_owned()))
    }

    /// # Errors
    /// See [`Self::bind`].
    pub fn bind_blob(&mut self, position: usize, value: &[u8]) -> Result<(), SqlWindowError> {
        self.bind(position, BindArg::Blob(value.to_vec()))
    }

    /// Bind an ordered argument list to positions `1..=args.len()`.
    ///
    /// # Errors
    /// Returns `SqlWindowError::BindError` if there are more arguments than
    /// placeholders, or any single bind fails.
    pub fn bind_all(&mut self, args: &[BindArg]) -> Result<(), SqlWindowError> {
        self.ensure_open("bind all")?;
        if args.len() > self.bind_args.len() {
            return Err(SqlWindowError::bind(
                args.len(),
                format!(
                    "too many bind arguments: {} supplied, statement has {} parameters",
                    args.len(),
                    self.bind_args.len()
                ),
            ));
        }
        for (idx, arg) in args.iter().enumerate() {
            self.bind(idx + 1, arg.clone())?;
        }
        Ok(())
    }

    /// Bind every argument as text.
    ///
    /// # Errors
    /// See [`Self::bind_all`].
    pub fn bind_all_as_strings(&mut self, args: &[&str]) -> Result<(), SqlWindowError> {
        let args: Vec<BindArg> = args.iter().map(|s| BindArg::from(*s)).collect();
        self.bind_all(&args)
    }

    /// Reset every placeholder to NULL and start a new bind cycle.
    ///
    /// # Errors
    /// Returns `SqlWindowError::IllegalState` after close.
    pub fn clear_bindings(&mut self) -> Result<(), SqlWindowError> {
        self.stmt_mut("clear bindings")?.clear_bindings();
        self.bind_args.fill(BindArg::Null);
        self.state = ProgramState::Ready;
        Ok(())
    }

    /// Claim the single execution of the current bind cycle.
    pub(crate) fn begin_execution(
        &mut self,
        ctx: &str,
    ) -> Result<(&'db Connection, &mut Statement<'db>), SqlWindowError> {
        self.ensure_open(ctx)?;
        if self.state != ProgramState::Ready {
            return Err(SqlWindowError::IllegalState(format!(
                "{ctx}: statement already executed; call clear_bindings to rebind"
            )));
        }
        self.state = ProgramState::Executed;
        let conn = self.conn;
        Ok((conn, self.stmt_mut(ctx)?))
    }

    /// Enter (or stay in) row streaming; repeated fills share one bind cycle.
    pub(crate) fn begin_streaming(
        &mut self,
        ctx: &str,
    ) -> Result<&mut Statement<'db>, SqlWindowError> {
        self.ensure_open(ctx)?;
        if self.state == ProgramState::Executed {
            return Err(SqlWindowError::IllegalState(format!(
                "{ctx}: statement already executed; call clear_bindings to rebind"
            )));
        }
        self.state = ProgramState::Streaming;
        self.stmt_mut(ctx)
    }

    pub(crate) fn label(&self) -> &'static str {
        self.label
    }

    /// Finalize the compiled statement. Further calls are no-ops.
    pub fn close(&mut self) {
        if let Some(stmt) = self.stmt.take() {
            tracing::debug!(kind = self.label, sql = %self.sql, "finalizing statement");
            if let Err(e) = stmt.finalize() {
                // finalize reports the last step error; the handle is released regardless
                tracing::warn!(
                    kind = self.label,
                    sql = %self.sql,
                    error = %e,
                    "finalize reported an error"
                );
            }
        }
    }
}

impl Drop for CompiledProgram<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Display for CompiledProgram<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.sql)
    }
}

impl fmt::Debug for CompiledProgram<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("kind", &self.label)
            .field("sql", &self.sql)
            .field("bind_args", &self.bind_args)
            .field("state", &self.state)
            .field("closed", &self.stmt.is_none())
            .finish()
    }
}
