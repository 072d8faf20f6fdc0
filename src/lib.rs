//! A thin, backend-neutral client layer over SQL drivers.
//!
//! A [`Database`] owns a connected [`Backend`]; statements prepared on it
//! carry typed parameter and result bindings, can render their SQL with bound
//! values substituted, and execute row by row with an optional callback.
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! # fn demo() -> Result<(), sql_binder::DbError> {
//! use std::cell::Cell;
//! use sql_binder::prelude::*;
//!
//! let db = SqliteOptions::new(":memory:".into()).open()?;
//! let answer = Cell::new(0i32);
//! let mut stmt = db.prepare("select ? * 2;")?;
//! stmt.bind_i32(0, 21)?;
//! stmt.bind_result_i32(0, &answer, None)?;
//! assert_eq!(stmt.sql(SqlVariant::Expanded)?, "select 21 * 2;");
//! stmt.exec()?;
//! assert_eq!(answer.get(), 42);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod convert;
pub mod database;
pub mod error;
pub mod prelude;
pub mod sql_text;
pub mod statement;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use backend::{Backend, BackendStatement};
pub use database::{Database, TraceHook};
pub use error::{BackendError, DbError, ErrorKind};
pub use sql_text::{Dialect, DialectKind, expand_sql};
pub use statement::{RecordFlow, Statement, StatementState};
pub use types::{
    LongDouble, ParamMode, ResultMode, Scalar, SqlType, SqlVariant, UnixTimestamp, Value,
};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteBackend, SqliteOptions, SqliteOptionsBuilder};
