//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types so callers can get
//! started with a single `use`.

pub use crate::config::{DatabaseOptions, DatabaseOptionsBuilder};
pub use crate::connection::SharedDatabase;
pub use crate::database::Database;
pub use crate::error::{SqlWindowError, WindowError};
pub use crate::program::CompiledProgram;
pub use crate::query::RowQuery;
pub use crate::statement::{ActionStatement, NO_ROW_INSERTED};
pub use crate::types::{BindArg, FieldType};
pub use crate::window::ResultWindow;
