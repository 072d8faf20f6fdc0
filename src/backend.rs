//! The seam between the statement engine and a concrete driver.
//!
//! Every method has a default, so a backend implements only what it can
//! actually do. Missing capabilities are discovered lazily: the public call
//! that needs them fails with `Unsupported`, `UnsupportedType` or
//! `UnsupportedMode`.

use crate::error::DbError;
use crate::sql_text::Dialect;
use crate::types::{ParamMode, ResultMode, SqlType, Value};

/// A connected backend instance, owned by a [`crate::Database`].
pub trait Backend {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Compile `sql` into a backend statement.
    ///
    /// # Errors
    /// `Connection`, `MalformedSql`, `MultiStmt`, `NoDb`, `Oom` as reported by
    /// the driver; `Unsupported` when the backend cannot prepare at all.
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn BackendStatement>, DbError> {
        let _ = sql;
        Err(DbError::unsupported(self.name(), "prepare"))
    }

    /// Switch driver-level statement tracing on or off.
    ///
    /// # Errors
    /// `Unsupported` when the backend has no trace hook.
    fn trace(&mut self, enable: bool) -> Result<(), DbError> {
        let _ = enable;
        Err(DbError::unsupported(self.name(), "trace"))
    }

    /// Literal rendering rules. `None` means expanded SQL is unavailable.
    fn dialect(&self) -> Option<&Dialect> {
        None
    }

    /// Whether parameters of `ty` can be bound in `mode`.
    ///
    /// # Errors
    /// `UnsupportedType` if the type cannot be marshalled at all,
    /// `UnsupportedMode` if only this mode is missing.
    fn param_support(&self, ty: SqlType, mode: ParamMode) -> Result<(), DbError> {
        let _ = mode;
        Err(DbError::UnsupportedType(ty))
    }

    /// Whether columns can be fetched as `ty` in `mode`.
    ///
    /// # Errors
    /// Same contract as [`Backend::param_support`].
    fn result_support(&self, ty: SqlType, mode: ResultMode) -> Result<(), DbError> {
        let _ = mode;
        Err(DbError::UnsupportedType(ty))
    }

    /// Release the connection.
    ///
    /// # Errors
    /// Whatever the driver reports while disconnecting.
    fn close(&mut self) -> Result<(), DbError> {
        Ok(())
    }
}

/// A prepared statement owned by a [`crate::Statement`].
pub trait BackendStatement {
    /// Number of placeholders the statement declares.
    fn param_count(&self) -> usize;

    /// Number of columns each produced row has.
    fn column_count(&self) -> usize;

    /// Run the statement with one value per placeholder. Rows, if any, are
    /// then pulled with [`BackendStatement::fetch`].
    ///
    /// # Errors
    /// `Constraint`, `Full`, `Busy`, `Oom`, ... as reported by the driver.
    fn exec(&mut self, params: &[Value]) -> Result<(), DbError> {
        let _ = params;
        Err(DbError::Unsupported("exec".into()))
    }

    /// Produce row `row` of the current execution, or `None` once exhausted.
    /// The engine asks for rows in ascending order starting at zero.
    ///
    /// # Errors
    /// `OutOfBounds` if the backend cannot position at `row`; driver errors.
    fn fetch(&mut self, row: usize) -> Result<Option<Vec<Value>>, DbError> {
        let _ = row;
        Err(DbError::Unsupported("fetch".into()))
    }

    /// Discard whatever is left of the current execution.
    fn reset(&mut self) {}

    /// Release driver resources.
    ///
    /// # Errors
    /// Whatever the driver reports while finalizing.
    fn finalize(&mut self) -> Result<(), DbError> {
        Ok(())
    }
}
