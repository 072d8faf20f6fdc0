use rusqlite::ErrorCode;

use crate::error::{BackendError, DbError, ErrorKind};

use super::BACKEND_NAME;

fn kind_for_code(code: ErrorCode) -> ErrorKind {
    match code {
        ErrorCode::PermissionDenied
        | ErrorCode::ReadOnly
        | ErrorCode::AuthorizationForStatementDenied => ErrorKind::AccessDenied,
        ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => ErrorKind::Busy,
        ErrorCode::OutOfMemory => ErrorKind::Oom,
        ErrorCode::DiskFull | ErrorCode::TooBig => ErrorKind::Full,
        ErrorCode::ConstraintViolation => ErrorKind::Constraint,
        ErrorCode::TypeMismatch => ErrorKind::TypeMismatch,
        ErrorCode::ParameterOutOfRange => ErrorKind::OutOfRange,
        ErrorCode::ApiMisuse => ErrorKind::Illegal,
        // SQLITE_ERROR: syntax errors, missing tables and columns.
        ErrorCode::Unknown => ErrorKind::MalformedSql,
        _ => ErrorKind::Connection,
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        let (kind, code) = match &err {
            rusqlite::Error::MultipleStatement => return DbError::MultiStmt,
            rusqlite::Error::SqliteFailure(ffi, _) => (kind_for_code(ffi.code), ffi.extended_code),
            rusqlite::Error::SqlInputError { error, .. } => {
                (kind_for_code(error.code), error.extended_code)
            }
            rusqlite::Error::InvalidParameterCount(..) | rusqlite::Error::InvalidColumnIndex(_) => {
                (ErrorKind::OutOfBounds, -1)
            }
            rusqlite::Error::IntegralValueOutOfRange(..) => (ErrorKind::OutOfRange, -1),
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::ToSqlConversionFailure(_)
            | rusqlite::Error::Utf8Error(_) => (ErrorKind::TypeMismatch, -1),
            rusqlite::Error::InvalidPath(_) => (ErrorKind::UnknownDb, -1),
            _ => (ErrorKind::Connection, -1),
        };
        DbError::extended(kind, BackendError::new(BACKEND_NAME, code, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_failures_keep_the_native_code() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("create table t(id integer primary key)").unwrap();
        conn.execute("insert into t values (1)", []).unwrap();
        let err: DbError = conn
            .execute("insert into t values (1)", [])
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Constraint);
        assert!(err.is_extended());
        let native = err.backend_error().unwrap();
        assert_eq!(native.backend, "sqlite");
        // SQLITE_CONSTRAINT_PRIMARYKEY
        assert_eq!(native.code, 1555);
    }

    #[test]
    fn syntax_errors_are_malformed_sql() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err: DbError = conn.prepare("selec 1").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::MalformedSql);
    }
}
