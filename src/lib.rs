//! Compiled-statement execution and result windowing for `SQLite`.
//!
//! A [`CompiledProgram`] owns one prepared statement: it is compiled once,
//! bound by position, executed and finalized exactly once. Two capabilities
//! sit on top of it:
//!
//! - [`ActionStatement`] runs statements for their effect (plain execution,
//!   inserts, updates/deletes and single-value reads).
//! - [`RowQuery`] pages the rows of a query into a fixed-capacity
//!   [`ResultWindow`] without materializing the whole result.
//!
//! ```rust
//! use sql_window::prelude::*;
//!
//! # fn main() -> Result<(), SqlWindowError> {
//! let db = Database::open_in_memory()?;
//! db.execute_batch("CREATE TABLE t (a INTEGER); INSERT INTO t VALUES (1), (2), (3);")?;
//!
//! let mut query = RowQuery::new(&db, "SELECT a FROM t ORDER BY a", &[])?;
//! let mut window = db.new_window();
//! let total = query.fill_window(&mut window, 0, 0, true)?;
//! assert_eq!(total, 3);
//! assert_eq!(window.get_long(2, 0)?, 3);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod database;
pub mod error;
mod params;
pub mod prelude;
pub mod program;
pub mod query;
pub mod statement;
pub mod types;
pub mod window;

pub use config::{DatabaseOptions, DatabaseOptionsBuilder};
pub use connection::SharedDatabase;
pub use database::Database;
pub use error::{SqlWindowError, WindowError};
pub use program::CompiledProgram;
pub use query::RowQuery;
pub use statement::{ActionStatement, NO_ROW_INSERTED};
pub use types::{BindArg, FieldType};
pub use window::ResultWindow;
