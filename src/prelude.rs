//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::backend::{Backend, BackendStatement};
pub use crate::database::{Database, TraceHook};
pub use crate::error::{DbError, ErrorKind};
pub use crate::sql_text::{Dialect, DialectKind};
pub use crate::statement::{RecordFlow, Statement, StatementState};
pub use crate::types::{
    LongDouble, ParamMode, ResultMode, Scalar, SqlType, SqlVariant, UnixTimestamp, Value,
};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteBackend, SqliteOptions, SqliteOptionsBuilder};
