use std::cell::{Cell, RefCell};

use sql_binder::prelude::*;
use sql_binder::test_utils::ScriptedBackend;

#[test]
fn reference_is_read_at_every_execution() {
    let db = SqliteOptions::new(":memory:".into()).open().unwrap();
    let input = Cell::new(1i32);
    let output = Cell::new(0i32);
    let mut stmt = db.prepare("select ? * 10;").unwrap();
    stmt.bind_i32_ref(0, &input, None).unwrap();
    stmt.bind_result_i32(0, &output, None).unwrap();

    assert_eq!(stmt.sql(SqlVariant::Expanded).unwrap(), "select 1 * 10;");
    stmt.exec().unwrap();
    assert_eq!(output.get(), 10);

    input.set(2);
    assert_eq!(stmt.sql(SqlVariant::Expanded).unwrap(), "select 2 * 10;");
    assert_eq!(
        stmt.sql(SqlVariant::ExpandedEscaped).unwrap(),
        "select 2 * 10;"
    );
    stmt.exec().unwrap();
    assert_eq!(output.get(), 20);
}

#[test]
fn backend_receives_the_sampled_values() {
    let backend = ScriptedBackend::new();
    let script = backend.script();
    let db = Database::new(backend);
    let input = Cell::new(1i32);
    let mut stmt = db.prepare("insert into t values (?)").unwrap();
    stmt.bind_i32_ref(0, &input, None).unwrap();

    stmt.exec().unwrap();
    input.set(2);
    stmt.exec().unwrap();
    assert_eq!(
        script.snapshot().executions,
        vec![vec![Value::I32(1)], vec![Value::I32(2)]]
    );
}

#[test]
fn null_flag_wins_over_the_stored_value() {
    let db = SqliteOptions::new(":memory:".into()).open().unwrap();
    let input = Cell::new(5i64);
    let is_null = Cell::new(true);
    let mut stmt = db.prepare("select ?;").unwrap();
    stmt.bind_i64_ref(0, &input, Some(&is_null)).unwrap();
    assert_eq!(stmt.sql(SqlVariant::Expanded).unwrap(), "select NULL;");

    is_null.set(false);
    assert_eq!(stmt.sql(SqlVariant::Expanded).unwrap(), "select 5;");
}

#[test]
fn text_reference_follows_its_length_cell() {
    let db = SqliteOptions::new(":memory:".into()).open().unwrap();
    let text = RefCell::new(String::from("foobarbaz"));
    let len = Cell::new(6usize);
    let mut stmt = db.prepare("select ?;").unwrap();
    stmt.bind_text_ref(0, &text, Some(&len), None).unwrap();
    assert_eq!(stmt.sql(SqlVariant::Expanded).unwrap(), "select 'foobar';");

    len.set(3);
    assert_eq!(stmt.sql(SqlVariant::Expanded).unwrap(), "select 'foo';");

    text.borrow_mut().clear();
    assert_eq!(
        stmt.sql(SqlVariant::Expanded).unwrap_err().kind(),
        ErrorKind::OutOfRange
    );
    assert_eq!(stmt.exec().unwrap_err().kind(), ErrorKind::OutOfRange);
    assert_eq!(stmt.state(), StatementState::Prepared);
}

#[test]
fn blob_reference_is_copied_per_execution() {
    let backend = ScriptedBackend::new();
    let script = backend.script();
    let db = Database::new(backend);
    let bytes = RefCell::new(vec![1u8, 2]);
    let mut stmt = db.prepare("insert into t values (?)").unwrap();
    stmt.bind_blob_ref(0, &bytes, None).unwrap();

    stmt.exec().unwrap();
    bytes.borrow_mut().push(3);
    stmt.exec().unwrap();
    assert_eq!(
        script.snapshot().executions,
        vec![vec![Value::Blob(vec![1, 2])], vec![Value::Blob(vec![1, 2, 3])]]
    );
}

#[test]
fn sqlite_stores_referenced_rows() {
    let db = SqliteOptions::new(":memory:".into()).open().unwrap();
    let mut create = db
        .prepare("create table people(name text, age integer);")
        .unwrap();
    create.exec().unwrap();
    create.finalize().unwrap();

    let name = RefCell::new(String::new());
    let age = Cell::new(0u8);
    let mut insert = db.prepare("insert into people values (?, ?);").unwrap();
    insert.bind_text_ref(0, &name, None, None).unwrap();
    insert.bind_u8_ref(1, &age, None).unwrap();
    for (who, years) in [("ada", 36u8), ("alan", 41)] {
        *name.borrow_mut() = who.to_owned();
        age.set(years);
        insert.exec().unwrap();
    }

    let total = Cell::new(0i64);
    let mut sum = db.prepare("select sum(age) from people;").unwrap();
    sum.bind_result_i64(0, &total, None).unwrap();
    sum.exec().unwrap();
    assert_eq!(total.get(), 77);
}

#[test]
fn unbound_parameters_execute_as_null() {
    let backend = ScriptedBackend::new();
    let script = backend.script();
    let db = Database::new(backend);
    let mut stmt = db.prepare("insert into t values (?, ?)").unwrap();
    stmt.bind_i32(1, 4).unwrap();
    stmt.exec().unwrap();
    assert_eq!(
        script.snapshot().executions,
        vec![vec![Value::Null, Value::I32(4)]]
    );
}
