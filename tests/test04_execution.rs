use std::cell::{Cell, RefCell};

use sql_binder::prelude::*;
use sql_binder::test_utils::{ScriptedBackend, counting_rows};

const THREE_ROWS: &str =
    "with recursive c(n) as (select 1 union all select n + 1 from c where n < 3) select n from c;";

#[test]
fn exec_consumes_only_the_first_row() {
    let backend = ScriptedBackend::new().with_rows(counting_rows(3));
    let script = backend.script();
    let db = Database::new(backend);
    let n = Cell::new(-1i64);
    let mut stmt = db.prepare("select n from t").unwrap();
    stmt.bind_result_i64(0, &n, None).unwrap();

    stmt.exec().unwrap();
    assert_eq!(n.get(), 0);
    assert_eq!(script.snapshot().fetches, vec![0]);

    n.set(-1);
    stmt.exec().unwrap();
    assert_eq!(n.get(), 0);
    let log = script.snapshot();
    assert_eq!(log.fetches, vec![0, 0]);
    assert_eq!(log.resets, 2);
}

#[test]
fn sqlite_exec_restarts_from_the_first_row() {
    let db = SqliteOptions::new(":memory:".into()).open().unwrap();
    let n = Cell::new(0i32);
    let mut stmt = db.prepare(THREE_ROWS).unwrap();
    stmt.bind_result_i32(0, &n, None).unwrap();

    stmt.exec().unwrap();
    assert_eq!(n.get(), 1);
    n.set(99);
    stmt.exec().unwrap();
    assert_eq!(n.get(), 1);
    assert_eq!(stmt.generation(), 2);
}

#[test]
fn callback_sees_every_row_in_order() {
    let db = SqliteOptions::new(":memory:".into()).open().unwrap();
    let n = Cell::new(0i32);
    let seen = RefCell::new(Vec::new());
    let mut stmt = db.prepare(THREE_ROWS).unwrap();
    stmt.bind_result_i32(0, &n, None).unwrap();

    stmt.exec_f(|_, row| {
        seen.borrow_mut().push((row, n.get()));
        RecordFlow::Continue
    })
    .unwrap();
    assert_eq!(*seen.borrow(), vec![(0, 1), (1, 2), (2, 3)]);
}

#[test]
fn positive_return_stops_quietly() {
    let backend = ScriptedBackend::new().with_rows(counting_rows(5));
    let script = backend.script();
    let db = Database::new(backend);
    let calls = Cell::new(0);
    let mut stmt = db.prepare("select n from t").unwrap();

    stmt.exec_f(|_, row| {
        calls.set(calls.get() + 1);
        RecordFlow::from(if row == 1 { 1 } else { 0 })
    })
    .unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(script.snapshot().fetches, vec![0, 1]);
}

#[test]
fn negative_return_is_a_callback_error() {
    let db = Database::new(ScriptedBackend::new().with_rows(counting_rows(5)));
    let mut stmt = db.prepare("select n from t").unwrap();

    let err = stmt
        .exec_f(|_, row| RecordFlow::from(if row == 2 { -1 } else { 0 }))
        .unwrap_err();
    assert!(matches!(err, DbError::Callback { row: 2 }));
    assert_eq!(err.kind(), ErrorKind::Callback);
    assert_eq!(stmt.state(), StatementState::Prepared);

    // the statement runs again normally afterwards
    let rows = Cell::new(0);
    stmt.exec_f(|_, _| {
        rows.set(rows.get() + 1);
        RecordFlow::Continue
    })
    .unwrap();
    assert_eq!(rows.get(), 5);
}

#[test]
fn no_rows_means_no_callback() {
    let db = Database::new(ScriptedBackend::new());
    let mut stmt = db.prepare("delete from t").unwrap();
    stmt.exec_f(|_, _| panic!("no rows were scripted")).unwrap();
    assert!(stmt.row().is_empty());
}

#[test]
fn callback_reads_temporary_results() {
    let db = SqliteOptions::new(":memory:".into()).open().unwrap();
    let len = Cell::new(0usize);
    let names = RefCell::new(Vec::new());
    let mut stmt = db
        .prepare("select 'alpha' union all select 'be' union all select 'gamma';")
        .unwrap();
    stmt.bind_result_text(0, Some(&len), None).unwrap();

    stmt.exec_f(|stmt, _| {
        let text = stmt.result_text(0).unwrap().unwrap_or_default();
        assert_eq!(text.len(), len.get());
        names.borrow_mut().push(text.to_owned());
        RecordFlow::Continue
    })
    .unwrap();
    assert_eq!(names.borrow().len(), 3);
    assert!(names.borrow().contains(&"gamma".to_owned()));
}

#[test]
fn every_execution_bumps_the_generation() {
    let db = Database::new(ScriptedBackend::new().with_rows(counting_rows(1)));
    let mut stmt = db.prepare("select n from t").unwrap();
    assert_eq!(stmt.generation(), 0);
    stmt.exec().unwrap();
    stmt.exec().unwrap();
    assert_eq!(stmt.generation(), 2);
    assert_eq!(stmt.row(), &[Value::I64(0)]);
}
