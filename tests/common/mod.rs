#![allow(dead_code)]

use sql_window::prelude::*;

/// Route library tracing output through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_target(false)
        .try_init();
}

/// In-memory database with an `items(id, name)` table holding `rows` rows.
pub fn items_db(rows: i64) -> Result<Database, SqlWindowError> {
    let db = Database::open_in_memory()?;
    db.execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")?;
    for id in 0..rows {
        ActionStatement::new(
            &db,
            "INSERT INTO items (id, name) VALUES (?, ?)",
            &[BindArg::from(id), BindArg::from(expected_name(id))],
        )?
        .execute()?;
    }
    Ok(db)
}

pub fn expected_name(id: i64) -> String {
    format!("item-{id}-{}", "x".repeat(usize::try_from(id % 7).unwrap_or(0)))
}
