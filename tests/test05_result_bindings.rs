use std::cell::{Cell, RefCell};

use chrono::NaiveDate;
use sql_binder::prelude::*;
use sql_binder::test_utils::ScriptedBackend;

fn sqlite() -> Database {
    SqliteOptions::new(":memory:".into()).open().unwrap()
}

#[test]
fn fixed_text_truncates_but_reports_the_true_size() {
    let db = sqlite();
    let buf = RefCell::new([0xAAu8; 5]);
    let size = Cell::new(0usize);
    let null = Cell::new(true);
    let mut stmt = db.prepare("select 'foobar';").unwrap();
    let dest: &RefCell<[u8]> = &buf;
    stmt.bind_result_text_fix(0, Some(dest), Some(&size), Some(&null))
        .unwrap();

    stmt.exec().unwrap();
    assert_eq!(size.get(), 6);
    assert!(!null.get());
    assert_eq!(&*buf.borrow(), b"foob\0");
}

#[test]
fn fixed_text_null_leaves_an_empty_string() {
    let db = sqlite();
    let buf = RefCell::new([b'x'; 4]);
    let size = Cell::new(99usize);
    let null = Cell::new(false);
    let mut stmt = db.prepare("select null;").unwrap();
    let dest: &RefCell<[u8]> = &buf;
    stmt.bind_result_text_fix(0, Some(dest), Some(&size), Some(&null))
        .unwrap();

    stmt.exec().unwrap();
    assert!(null.get());
    assert_eq!(size.get(), 0);
    assert_eq!(buf.borrow()[0], 0);
}

#[test]
fn fixed_blob_fills_without_terminator() {
    let db = sqlite();
    let buf = RefCell::new([0u8; 4]);
    let size = Cell::new(0usize);
    let mut stmt = db.prepare("select X'010203040506';").unwrap();
    let dest: &RefCell<[u8]> = &buf;
    stmt.bind_result_blob_fix(0, Some(dest), Some(&size), None).unwrap();

    stmt.exec().unwrap();
    assert_eq!(size.get(), 6);
    assert_eq!(*buf.borrow(), [1, 2, 3, 4]);
}

#[test]
fn duplicate_blob_is_an_owned_copy() {
    let db = sqlite();
    let mut setup = db
        .prepare("create table blobs(b blob);")
        .unwrap();
    setup.exec().unwrap();
    setup.finalize().unwrap();
    let mut insert = db.prepare("insert into blobs values (?);").unwrap();
    insert.bind_blob(0, &[1, 2, 3, 4, 5]).unwrap();
    insert.exec().unwrap();
    insert.finalize().unwrap();

    let dup = RefCell::new(None);
    let size = Cell::new(0usize);
    let mut stmt = db.prepare("select b from blobs;").unwrap();
    stmt.bind_result_blob_dup(0, Some(&dup), Some(&size), None)
        .unwrap();

    stmt.exec().unwrap();
    let owned = dup.take();
    assert_eq!(owned, Some(vec![1, 2, 3, 4, 5]));
    assert_eq!(size.get(), 5);

    // releasing the copy does not disturb the next fetch
    drop(owned);
    stmt.exec().unwrap();
    assert_eq!(dup.borrow().as_deref(), Some(&[1u8, 2, 3, 4, 5][..]));
}

#[test]
fn duplicate_text_without_destination_still_reports_size() {
    let db = sqlite();
    let size = Cell::new(0usize);
    let mut stmt = db.prepare("select 'hello';").unwrap();
    stmt.bind_result_text_dup(0, None, Some(&size), None).unwrap();
    stmt.exec().unwrap();
    assert_eq!(size.get(), 5);
}

#[test]
fn temporary_text_is_read_from_the_statement() {
    let db = sqlite();
    let size = Cell::new(0usize);
    let mut stmt = db.prepare("select 'hello', null;").unwrap();
    stmt.bind_result_text(0, Some(&size), None).unwrap();
    stmt.bind_result_text(1, None, None).unwrap();

    assert_eq!(stmt.result_text(0).unwrap_err().kind(), ErrorKind::Illegal);
    stmt.exec().unwrap();
    assert_eq!(stmt.result_text(0).unwrap(), Some("hello"));
    assert_eq!(stmt.result_text(1).unwrap(), None);
    assert_eq!(size.get(), 5);
    assert_eq!(stmt.result_text(2).unwrap_err().kind(), ErrorKind::OutOfBounds);
}

#[test]
fn scalars_convert_and_flag_nulls() {
    let db = sqlite();
    let small = Cell::new(0i8);
    let real = Cell::new(0f64);
    let untouched = Cell::new(7i32);
    let untouched_null = Cell::new(false);
    let day = Cell::new(NaiveDate::default());
    let flag = Cell::new(false);
    let mut stmt = db
        .prepare("select 42, 2.5, null, '2024-01-02', 1;")
        .unwrap();
    stmt.bind_result_i8(0, &small, None).unwrap();
    stmt.bind_result_double(1, &real, None).unwrap();
    stmt.bind_result_i32(2, &untouched, Some(&untouched_null))
        .unwrap();
    stmt.bind_result_date(3, &day, None).unwrap();
    stmt.bind_result_bool(4, &flag, None).unwrap();

    stmt.exec().unwrap();
    assert_eq!(small.get(), 42);
    assert_eq!(real.get(), 2.5);
    assert_eq!(untouched.get(), 7);
    assert!(untouched_null.get());
    assert_eq!(day.get(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    assert!(flag.get());
}

#[test]
fn conversion_failures_surface_from_exec() {
    let db = sqlite();
    let narrow = Cell::new(0i8);
    let whole = Cell::new(0i32);
    let mut too_big = db.prepare("select 300;").unwrap();
    too_big.bind_result_i8(0, &narrow, None).unwrap();
    assert_eq!(too_big.exec().unwrap_err().kind(), ErrorKind::OutOfRange);

    let mut fractional = db.prepare("select 1.5;").unwrap();
    fractional.bind_result_i32(0, &whole, None).unwrap();
    assert_eq!(fractional.exec().unwrap_err().kind(), ErrorKind::TypeMismatch);
}

#[test]
fn unsigned_values_round_trip_through_signed_storage() {
    let db = sqlite();
    let out = Cell::new(0u32);
    let mut stmt = db.prepare("select ?;").unwrap();
    stmt.bind_u32(0, u32::MAX).unwrap();
    stmt.bind_result_u32(0, &out, None).unwrap();
    stmt.exec().unwrap();
    assert_eq!(out.get(), u32::MAX);
}

#[test]
fn scripted_rows_reach_every_destination_kind() {
    let backend = ScriptedBackend::new().with_rows(vec![vec![
        Value::Text("abc".into()),
        Value::Blob(vec![9, 8]),
        Value::I64(-3),
    ]]);
    let db = Database::new(backend);
    let text = RefCell::new(None);
    let blob_len = Cell::new(0usize);
    let num = Cell::new(0i16);
    let mut stmt = db.prepare("select a, b, c from t").unwrap();
    stmt.bind_result_text_dup(0, Some(&text), None, None).unwrap();
    stmt.bind_result_blob(1, Some(&blob_len), None).unwrap();
    stmt.bind_result_i16(2, &num, None).unwrap();

    stmt.exec().unwrap();
    assert_eq!(text.borrow().as_deref(), Some("abc"));
    assert_eq!(stmt.result_blob(1).unwrap(), Some(&[9u8, 8][..]));
    assert_eq!(blob_len.get(), 2);
    assert_eq!(num.get(), -3);
    assert_eq!(stmt.result_mode(0), Some(ResultMode::Duplicate));
}

#[test]
fn fixed_results_without_a_buffer_still_report_size_and_null() {
    let db = sqlite();
    let text_size = Cell::new(0usize);
    let text_null = Cell::new(true);
    let blob_size = Cell::new(0usize);
    let blob_null = Cell::new(false);
    let mut stmt = db.prepare("select 'foobar', null;").unwrap();
    stmt.bind_result_text_fix(0, None, Some(&text_size), Some(&text_null))
        .unwrap();
    stmt.bind_result_blob_fix(1, None, Some(&blob_size), Some(&blob_null))
        .unwrap();

    stmt.exec().unwrap();
    assert_eq!(text_size.get(), 6);
    assert!(!text_null.get());
    assert_eq!(blob_size.get(), 0);
    assert!(blob_null.get());

    let mut blob = db.prepare("select X'0102030405';").unwrap();
    blob.bind_result_blob_fix(0, None, Some(&blob_size), Some(&blob_null))
        .unwrap();
    blob.exec().unwrap();
    assert_eq!(blob_size.get(), 5);
    assert!(!blob_null.get());
}

#[test]
fn conversion_failure_leaves_every_destination_untouched() {
    let backend = ScriptedBackend::new().with_rows(vec![vec![
        Value::I64(5),
        Value::Text("abc".into()),
        Value::I64(300),
    ]]);
    let db = Database::new(backend);
    let first = Cell::new(-1i32);
    let text = RefCell::new(Some(String::from("old")));
    let size = Cell::new(99usize);
    let narrow = Cell::new(-1i8);
    let mut stmt = db.prepare("select a, b, c from t").unwrap();
    stmt.bind_result_i32(0, &first, None).unwrap();
    stmt.bind_result_text_dup(1, Some(&text), Some(&size), None)
        .unwrap();
    stmt.bind_result_i8(2, &narrow, None).unwrap();

    assert_eq!(stmt.exec().unwrap_err().kind(), ErrorKind::OutOfRange);
    assert_eq!(first.get(), -1);
    assert_eq!(text.borrow().as_deref(), Some("old"));
    assert_eq!(size.get(), 99);
    assert_eq!(narrow.get(), -1);
    assert!(stmt.row().is_empty());
}
