// SQLite backend built on rusqlite.
//
// - config: options, builder and connection setup
// - params: conversion of bound values into SQLite values
// - query: row extraction
// - error: mapping of rusqlite errors onto the shared taxonomy

pub mod config;
mod error;
pub mod params;
pub mod query;

use std::rc::Rc;

use rusqlite::{Batch, Connection};
use tracing::debug;

use crate::backend::{Backend, BackendStatement};
use crate::error::DbError;
use crate::sql_text::Dialect;
use crate::types::{ParamMode, ResultMode, SqlType, Value};

pub use config::{SqliteOptions, SqliteOptionsBuilder};

pub(crate) const BACKEND_NAME: &str = "sqlite";

/// A rusqlite connection behind the [`Backend`] seam.
///
/// Statements share the connection through an `Rc`; the connection is closed
/// explicitly once the last statement is gone.
pub struct SqliteBackend {
    conn: Option<Rc<Connection>>,
    dialect: Dialect,
    tracing: bool,
}

impl SqliteBackend {
    /// Wrap an open connection, rendering literals with `dialect`.
    #[must_use]
    pub fn new(conn: Connection, dialect: Dialect) -> Self {
        Self {
            conn: Some(Rc::new(conn)),
            dialect,
            tracing: false,
        }
    }

    /// An in-memory database, mostly for tests.
    ///
    /// # Errors
    /// Returns the driver error if SQLite cannot open the database.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Ok(Self::new(Connection::open_in_memory()?, Dialect::sqlite()))
    }

    /// Whether statement tracing has been switched on.
    #[must_use]
    pub fn is_tracing(&self) -> bool {
        self.tracing
    }

    fn conn(&self) -> Result<&Rc<Connection>, DbError> {
        self.conn
            .as_ref()
            .ok_or_else(|| DbError::Connection("sqlite connection already closed".into()))
    }
}

impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn prepare(&mut self, sql: &str) -> Result<Box<dyn BackendStatement>, DbError> {
        let conn = Rc::clone(self.conn()?);
        if holds_several_statements(&conn, sql)? {
            return Err(DbError::MultiStmt);
        }
        let (param_count, column_count) = {
            let stmt = conn.prepare_cached(sql)?;
            (stmt.parameter_count(), stmt.column_count())
        };
        Ok(Box::new(SqliteStatement {
            conn: Some(conn),
            sql: sql.to_owned(),
            param_count,
            column_count,
            rows: Vec::new(),
        }))
    }

    fn trace(&mut self, enable: bool) -> Result<(), DbError> {
        self.tracing = enable;
        debug!(enable, "sqlite tracing toggled");
        Ok(())
    }

    fn dialect(&self) -> Option<&Dialect> {
        Some(&self.dialect)
    }

    fn param_support(&self, ty: SqlType, _mode: ParamMode) -> Result<(), DbError> {
        match ty {
            SqlType::U64 | SqlType::LongDouble => Err(DbError::UnsupportedType(ty)),
            _ => Ok(()),
        }
    }

    fn result_support(&self, ty: SqlType, mode: ResultMode) -> Result<(), DbError> {
        match ty {
            SqlType::Null | SqlType::U64 | SqlType::LongDouble => Err(DbError::UnsupportedType(ty)),
            SqlType::Text | SqlType::Blob => Ok(()),
            _ if mode == ResultMode::Fixed => Ok(()),
            _ => Err(DbError::UnsupportedMode {
                ty,
                mode: mode.as_str(),
            }),
        }
    }

    fn close(&mut self) -> Result<(), DbError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        match Rc::try_unwrap(conn) {
            Ok(conn) => conn.close().map_err(|(_, err)| DbError::from(err)),
            Err(shared) => {
                self.conn = Some(shared);
                Err(DbError::illegal("sqlite connection still shared by a statement"))
            }
        }
    }
}

/// Let SQLite split `sql`: anything it compiles after the first statement is
/// a second one. Blank and comment-only tails compile to nothing, and the
/// `;` inside a trigger body does not end the statement.
fn holds_several_statements(conn: &Connection, sql: &str) -> Result<bool, DbError> {
    let mut batch = Batch::new(conn, sql);
    if batch.next()?.is_none() {
        return Ok(false);
    }
    // a tail that fails to compile is still a second statement
    Ok(!matches!(batch.next(), Ok(None)))
}

/// One prepared SQLite statement.
///
/// rusqlite statements borrow their connection, so the compiled form lives in
/// the connection's statement cache and is looked up again for each
/// execution. Rows are buffered at execution time.
struct SqliteStatement {
    conn: Option<Rc<Connection>>,
    sql: String,
    param_count: usize,
    column_count: usize,
    rows: Vec<Vec<Value>>,
}

impl BackendStatement for SqliteStatement {
    fn param_count(&self) -> usize {
        self.param_count
    }

    fn column_count(&self) -> usize {
        self.column_count
    }

    fn exec(&mut self, values: &[Value]) -> Result<(), DbError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| DbError::illegal("sqlite statement already finalized"))?;
        let params = params::Params::convert(values)?;
        let mut stmt = conn.prepare_cached(&self.sql)?;
        self.rows = if self.column_count == 0 {
            stmt.execute(params.as_params())?;
            Vec::new()
        } else {
            query::build_rows(&mut stmt, &params)?
        };
        Ok(())
    }

    fn fetch(&mut self, row: usize) -> Result<Option<Vec<Value>>, DbError> {
        Ok(self.rows.get_mut(row).map(std::mem::take))
    }

    fn reset(&mut self) {
        self.rows.clear();
    }

    fn finalize(&mut self) -> Result<(), DbError> {
        self.rows.clear();
        self.conn = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn capability_matrix_matches_sqlite_storage() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert!(backend.param_support(SqlType::U32, ParamMode::Reference).is_ok());
        assert_eq!(
            backend.param_support(SqlType::U64, ParamMode::Value).unwrap_err().kind(),
            ErrorKind::UnsupportedType
        );
        assert_eq!(
            backend
                .param_support(SqlType::LongDouble, ParamMode::Value)
                .unwrap_err()
                .kind(),
            ErrorKind::UnsupportedType
        );
        assert!(backend.result_support(SqlType::Text, ResultMode::Temporary).is_ok());
        assert!(backend.result_support(SqlType::I8, ResultMode::Fixed).is_ok());
        assert_eq!(
            backend
                .result_support(SqlType::I8, ResultMode::Duplicate)
                .unwrap_err()
                .kind(),
            ErrorKind::UnsupportedMode
        );
    }

    #[test]
    fn prepare_reports_counts() {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        let stmt = backend.prepare("select ?, ?2, :x").unwrap();
        assert_eq!(stmt.param_count(), 3);
        assert_eq!(stmt.column_count(), 3);
    }

    #[test]
    fn prepare_rejects_multiple_statements() {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        let err = backend.prepare("select 1; select 2").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MultiStmt);
        assert!(backend.prepare("select 1;").is_ok());
        assert!(backend.prepare("select ';x'; -- done\n ; /* c */").is_ok());
        let err = backend.prepare("select 1; selec 2").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MultiStmt);
    }

    #[test]
    fn trigger_bodies_are_one_statement() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("create table x(a); create table y(a);").unwrap();
        assert!(!holds_several_statements(
            &conn,
            "create trigger t after insert on x begin insert into y values (new.a); end;"
        )
        .unwrap());
        assert!(holds_several_statements(&conn, "create table z(a); select 1").unwrap());
    }

    #[test]
    fn close_refuses_while_statements_hold_the_connection() {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        let mut stmt = backend.prepare("select 1").unwrap();
        assert_eq!(backend.close().unwrap_err().kind(), ErrorKind::Illegal);
        stmt.finalize().unwrap();
        drop(stmt);
        backend.close().unwrap();
        assert!(backend.close().is_ok());
    }
}
