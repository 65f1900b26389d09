mod common;

use sql_window::prelude::*;

const ROWS: i64 = 40;

fn page_through(capacity: usize) -> Result<Vec<(usize, i64, String)>, SqlWindowError> {
    let db = common::items_db(ROWS)?;
    let mut query = RowQuery::new(&db, "SELECT id, name FROM items ORDER BY id", &[])?;
    let mut window = ResultWindow::new(capacity);

    let mut seen = Vec::new();
    let mut next = 0;
    loop {
        let filled = query.fill_window(&mut window, next, next, false)?;
        assert_eq!(filled, window.num_rows());
        if window.is_empty() {
            break;
        }
        assert_eq!(window.start_position(), next);
        for position in next..next + window.num_rows() {
            let name = window
                .get_string(position, 1)?
                .map(|s| s.into_owned())
                .unwrap_or_default();
            seen.push((position, window.get_long(position, 0)?, name));
        }
        next += window.num_rows();
    }
    Ok(seen)
}

#[test]
fn five_rows_fit_in_one_window() -> Result<(), SqlWindowError> {
    common::init_tracing();
    let db = Database::open_in_memory()?;
    db.execute_batch(
        "CREATE TABLE t (n INTEGER);
         INSERT INTO t VALUES (1), (2), (3), (4), (5);",
    )?;
    let mut query = RowQuery::new(&db, "SELECT n FROM t ORDER BY n", &[])?;
    let mut window = db.new_window();

    assert_eq!(query.fill_window(&mut window, 0, 0, false)?, 5);
    assert_eq!(window.start_position(), 0);
    assert_eq!(window.num_rows(), 5);
    assert_eq!(window.num_columns(), 1);
    for position in 0..5 {
        assert_eq!(window.get_long(position, 0)?, i64::try_from(position + 1).unwrap_or(0));
    }
    Ok(())
}

#[test]
fn paging_yields_every_row_once_in_order() -> Result<(), SqlWindowError> {
    common::init_tracing();
    for capacity in [64, 100, 257, 1000, 1 << 20] {
        let seen = page_through(capacity)?;
        assert_eq!(seen.len(), usize::try_from(ROWS).unwrap_or(0), "capacity {capacity}");
        for (index, (position, id, name)) in seen.iter().enumerate() {
            assert_eq!(*position, index);
            assert_eq!(*id, i64::try_from(index).unwrap_or(-1));
            assert_eq!(name, &common::expected_name(*id));
        }
    }
    Ok(())
}

#[test]
fn backward_seek_matches_forward_fill() -> Result<(), SqlWindowError> {
    common::init_tracing();
    let db = common::items_db(ROWS)?;
    let mut query = RowQuery::new(&db, "SELECT id, name FROM items ORDER BY id", &[])?;
    let mut first = ResultWindow::new(300);
    let mut later = ResultWindow::new(300);
    let mut again = ResultWindow::new(300);

    query.fill_window(&mut first, 0, 0, false)?;
    query.fill_window(&mut later, 20, 20, false)?;
    query.fill_window(&mut again, 0, 0, false)?;

    assert_eq!(later.start_position(), 20);
    assert!(later.get_long(20, 0)? == 20);
    assert_eq!(first.num_rows(), again.num_rows());
    for position in 0..first.num_rows() {
        assert_eq!(first.get_long(position, 0)?, again.get_long(position, 0)?);
        assert_eq!(first.get_string(position, 1)?, again.get_string(position, 1)?);
    }
    Ok(())
}

#[test]
fn count_all_rows_reports_the_full_total() -> Result<(), SqlWindowError> {
    common::init_tracing();
    let db = common::items_db(ROWS)?;
    let mut query = RowQuery::new(
        &db,
        "SELECT id FROM items WHERE id >= ? ORDER BY id",
        &[BindArg::from(4)],
    )?;
    let mut window = ResultWindow::new(100);

    let counted = query.fill_window(&mut window, 0, 0, true)?;
    assert_eq!(counted, 36);
    assert!(window.num_rows() < 36);

    let filled = query.fill_window(&mut window, 0, 0, false)?;
    assert_eq!(filled, 4);
    assert_eq!(filled, window.num_rows());

    let mut window = ResultWindow::new(72);
    assert_eq!(query.fill_window(&mut window, 10, 10, false)?, 3);
    assert_eq!(window.start_position(), 10);
    assert_eq!(window.get_long(10, 0)?, 14);
    Ok(())
}

#[test]
fn window_slides_forward_to_cover_required_row() -> Result<(), SqlWindowError> {
    common::init_tracing();
    let db = common::items_db(10)?;
    let mut query = RowQuery::new(&db, "SELECT id FROM items ORDER BY id", &[])?;
    // 24 bytes per single-integer row, so three rows fit
    let mut window = ResultWindow::new(72);

    let filled = query.fill_window(&mut window, 0, 7, false)?;
    assert_eq!(filled, 3);
    assert_eq!(window.start_position(), 6);
    assert_eq!(window.num_rows(), 3);
    assert!(window.contains(7));
    assert_eq!(window.get_long(7, 0)?, 7);
    Ok(())
}

fn blobs_db() -> Result<Database, SqlWindowError> {
    common::init_tracing();
    let db = Database::open_in_memory()?;
    db.execute_batch("CREATE TABLE blobs (id INTEGER PRIMARY KEY, data BLOB);")?;
    for (id, len) in [(0_i64, 10_usize), (1, 500), (2, 10)] {
        ActionStatement::new(
            &db,
            "INSERT INTO blobs (id, data) VALUES (?, ?)",
            &[BindArg::from(id), BindArg::from(vec![u8::try_from(id).unwrap_or(0); len])],
        )?
        .execute()?;
    }
    Ok(db)
}

#[test]
fn oversized_row_stops_a_fill_after_smaller_rows() -> Result<(), SqlWindowError> {
    let db = blobs_db()?;
    let mut query = RowQuery::new(&db, "SELECT data FROM blobs ORDER BY id", &[])?;
    let mut window = ResultWindow::new(100);

    assert_eq!(query.fill_window(&mut window, 0, 0, false)?, 1);
    assert_eq!(window.start_position(), 0);
    assert_eq!(window.num_rows(), 1);
    assert_eq!(query.fill_window(&mut window, 0, 0, true)?, 3);
    assert_eq!(window.get_blob(0, 0)?.map(<[u8]>::len), Some(10));
    Ok(())
}

#[test]
fn oversized_required_row_is_admitted_alone() -> Result<(), SqlWindowError> {
    let db = blobs_db()?;
    let mut query = RowQuery::new(&db, "SELECT data FROM blobs ORDER BY id", &[])?;
    let mut window = ResultWindow::new(100);

    assert_eq!(query.fill_window(&mut window, 1, 1, false)?, 1);
    assert_eq!(window.start_position(), 1);
    assert_eq!(window.num_rows(), 1);
    assert_eq!(window.get_type(1, 0)?, FieldType::Blob);
    assert_eq!(window.get_blob(1, 0)?, Some(&[1_u8; 500][..]));
    assert!(window.used_bytes() > window.capacity());
    Ok(())
}

#[test]
fn oversized_row_before_required_row_is_skipped() -> Result<(), SqlWindowError> {
    let db = blobs_db()?;
    let mut query = RowQuery::new(&db, "SELECT data FROM blobs ORDER BY id", &[])?;
    let mut window = ResultWindow::new(100);

    assert_eq!(query.fill_window(&mut window, 0, 2, false)?, 1);
    assert_eq!(window.start_position(), 2);
    assert_eq!(window.num_rows(), 1);
    assert_eq!(window.get_blob(2, 0)?, Some(&[2_u8; 10][..]));
    Ok(())
}

#[test]
fn step_error_keeps_complete_rows() -> Result<(), SqlWindowError> {
    common::init_tracing();
    let db = Database::open_in_memory()?;
    // abs() of the smallest integer overflows on the third row
    let mut query = RowQuery::new(
        &db,
        "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 5)
         SELECT CASE WHEN x = 3 THEN abs(x - 3 - 9223372036854775807 - 1) ELSE x END FROM c",
        &[],
    )?;
    let mut window = db.new_window();

    let err = query.fill_window(&mut window, 0, 0, false);
    assert!(matches!(err, Err(SqlWindowError::ExecutionError(_))), "got {err:?}");
    assert_eq!(window.num_rows(), 2);
    assert_eq!(window.get_long(0, 0)?, 1);
    assert_eq!(window.get_long(1, 0)?, 2);
    Ok(())
}

#[test]
fn fill_and_one_shot_execution_do_not_mix() -> Result<(), SqlWindowError> {
    let db = common::items_db(3)?;
    let mut window = db.new_window();

    let mut query = RowQuery::new(&db, "SELECT id FROM items WHERE id < ?", &[BindArg::from(2)])?;
    query.fill_window(&mut window, 0, 0, false)?;
    assert!(matches!(query.bind(1, 3), Err(SqlWindowError::IllegalState(_))));
    assert_eq!(query.fill_window(&mut window, 0, 0, false)?, 2);

    query.program_mut().clear_bindings()?;
    query.bind(1, 3)?;
    assert_eq!(query.fill_window(&mut window, 0, 0, false)?, 3);

    let mut program = CompiledProgram::compile(&db, "SELECT id FROM items")?;
    sql_window::statement::execute(&mut program)?;
    assert!(matches!(
        sql_window::query::fill_window(&mut program, &mut window, 0, 0, false),
        Err(SqlWindowError::IllegalState(_))
    ));
    Ok(())
}

#[test]
fn statements_without_rows_cannot_fill() -> Result<(), SqlWindowError> {
    let db = common::items_db(1)?;
    let mut window = db.new_window();
    let mut query = RowQuery::new(&db, "DELETE FROM items", &[])?;
    assert!(matches!(
        query.fill_window(&mut window, 0, 0, false),
        Err(SqlWindowError::ShapeMismatch(_))
    ));
    let mut count = ActionStatement::new(&db, "SELECT COUNT(*) FROM items", &[])?;
    assert_eq!(count.simple_query_for_long()?, 1);

    query.close();
    assert!(matches!(
        query.fill_window(&mut window, 0, 0, false),
        Err(SqlWindowError::IllegalState(_))
    ));
    Ok(())
}

#[test]
fn empty_result_leaves_an_empty_window() -> Result<(), SqlWindowError> {
    let db = common::items_db(5)?;
    let mut query = RowQuery::new(&db, "SELECT id FROM items WHERE id > 100", &[])?;
    let mut window = db.new_window();
    assert_eq!(query.fill_window(&mut window, 0, 0, true)?, 0);
    assert!(window.is_empty());
    assert_eq!(window.start_position(), 0);

    let mut past_end = RowQuery::new(&db, "SELECT id FROM items", &[])?;
    assert_eq!(past_end.fill_window(&mut window, 9, 9, false)?, 0);
    assert!(window.is_empty());
    assert_eq!(window.start_position(), 9);
    assert_eq!(past_end.fill_window(&mut window, 9, 9, true)?, 5);
    Ok(())
}

#[test]
fn cells_keep_their_storage_class() -> Result<(), SqlWindowError> {
    common::init_tracing();
    let db = Database::open_in_memory()?;
    let mut query = RowQuery::new(
        &db,
        "SELECT NULL, 7, 2.5, 'héllo', x'c0ffee', '42abc'",
        &[],
    )?;
    let mut window = db.new_window();
    assert_eq!(query.fill_window(&mut window, 0, 0, false)?, 1);

    assert_eq!(window.get_type(0, 0)?, FieldType::Null);
    assert!(window.is_null(0, 0)?);
    assert_eq!(window.get_long(0, 0)?, 0);
    assert_eq!(window.get_string(0, 0)?, None);

    assert_eq!(window.get_type(0, 1)?, FieldType::Integer);
    assert!((window.get_double(0, 1)? - 7.0).abs() < f64::EPSILON);

    assert_eq!(window.get_type(0, 2)?, FieldType::Float);
    assert_eq!(window.get_long(0, 2)?, 2);
    assert_eq!(window.get_string(0, 2)?.as_deref(), Some("2.5"));

    assert_eq!(window.get_type(0, 3)?, FieldType::String);
    assert_eq!(window.get_string(0, 3)?.as_deref(), Some("héllo"));
    assert_eq!(window.get_blob(0, 3)?, Some("héllo".as_bytes()));

    assert_eq!(window.get_type(0, 4)?, FieldType::Blob);
    assert_eq!(window.get_blob(0, 4)?, Some(&[0xc0_u8, 0xff, 0xee][..]));
    assert!(matches!(
        window.get_string(0, 4),
        Err(WindowError::TypeMismatch { found: "blob", .. })
    ));

    assert_eq!(window.get_long(0, 5)?, 42);
    assert!(matches!(
        window.get_long(0, 6),
        Err(WindowError::ColumnOutOfRange { column: 6, columns: 6 })
    ));
    assert!(matches!(
        window.get_long(1, 0),
        Err(WindowError::RowOutOfRange { position: 1, .. })
    ));
    Ok(())
}
