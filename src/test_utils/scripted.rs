use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::backend::{Backend, BackendStatement};
use crate::error::{BackendError, DbError, ErrorKind};
use crate::sql_text::{Dialect, count_placeholders};
use crate::types::{ParamMode, ResultMode, SqlType, Value};

const NAME: &str = "scripted";

/// Everything a [`ScriptedBackend`] has been asked to do.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScriptLog {
    pub prepared: Vec<String>,
    /// Parameters sent with each execution.
    pub executions: Vec<Vec<Value>>,
    /// Row hints passed to `fetch`, across all executions.
    pub fetches: Vec<usize>,
    pub resets: usize,
    pub finalized: usize,
    pub trace_calls: Vec<bool>,
    pub closed: bool,
}

/// State shared between a scripted backend, its statements and the test.
#[derive(Debug, Default)]
pub struct Script {
    /// Rows every execution produces.
    pub rows: RefCell<Vec<Vec<Value>>>,
    /// When set, executions fail with an extended error of this kind.
    pub exec_failure: Cell<Option<ErrorKind>>,
    /// When set, closing the backend fails with an extended error of this
    /// kind.
    pub close_failure: Cell<Option<ErrorKind>>,
    pub log: RefCell<ScriptLog>,
}

impl Script {
    /// A copy of the log so far.
    #[must_use]
    pub fn snapshot(&self) -> ScriptLog {
        self.log.borrow().clone()
    }
}

fn scripted_error(kind: ErrorKind) -> DbError {
    DbError::extended(kind, BackendError::new(NAME, 1, format!("scripted {kind}")))
}

/// An in-process backend driven by a script, with a configurable capability
/// matrix. Placeholders are counted with the SQL scanner.
pub struct ScriptedBackend {
    script: Rc<Script>,
    dialect: Option<Dialect>,
    trace: bool,
    columns: Option<usize>,
    prepare_failure: Option<ErrorKind>,
    unsupported_types: Vec<SqlType>,
    unsupported_params: Vec<(SqlType, ParamMode)>,
    unsupported_results: Vec<(SqlType, ResultMode)>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    /// Supports every type in every mode, tracing and `SQLite` literals.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Rc::new(Script::default()),
            dialect: Some(Dialect::sqlite()),
            trace: true,
            columns: None,
            prepare_failure: None,
            unsupported_types: Vec::new(),
            unsupported_params: Vec::new(),
            unsupported_results: Vec::new(),
        }
    }

    /// Handle on the shared script, usable after the backend has been moved
    /// into a `Database`.
    #[must_use]
    pub fn script(&self) -> Rc<Script> {
        Rc::clone(&self.script)
    }

    /// Rows produced by every execution. The column count is taken from the
    /// first row unless [`ScriptedBackend::with_columns`] overrides it.
    #[must_use]
    pub fn with_rows(self, rows: Vec<Vec<Value>>) -> Self {
        *self.script.rows.borrow_mut() = rows;
        self
    }

    #[must_use]
    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = Some(columns);
        self
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: Option<Dialect>) -> Self {
        self.dialect = dialect;
        self
    }

    #[must_use]
    pub fn without_trace(mut self) -> Self {
        self.trace = false;
        self
    }

    #[must_use]
    pub fn failing_prepare(mut self, kind: ErrorKind) -> Self {
        self.prepare_failure = Some(kind);
        self
    }

    #[must_use]
    pub fn without_type(mut self, ty: SqlType) -> Self {
        self.unsupported_types.push(ty);
        self
    }

    #[must_use]
    pub fn without_param_mode(mut self, ty: SqlType, mode: ParamMode) -> Self {
        self.unsupported_params.push((ty, mode));
        self
    }

    #[must_use]
    pub fn without_result_mode(mut self, ty: SqlType, mode: ResultMode) -> Self {
        self.unsupported_results.push((ty, mode));
        self
    }
}

impl Backend for ScriptedBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn prepare(&mut self, sql: &str) -> Result<Box<dyn BackendStatement>, DbError> {
        if let Some(kind) = self.prepare_failure {
            return Err(scripted_error(kind));
        }
        self.script.log.borrow_mut().prepared.push(sql.to_owned());
        let column_count = self
            .columns
            .unwrap_or_else(|| self.script.rows.borrow().first().map_or(0, Vec::len));
        Ok(Box::new(ScriptedStatement {
            script: Rc::clone(&self.script),
            param_count: count_placeholders(sql),
            column_count,
            executed: false,
        }))
    }

    fn trace(&mut self, enable: bool) -> Result<(), DbError> {
        if !self.trace {
            return Err(DbError::unsupported(NAME, "trace"));
        }
        self.script.log.borrow_mut().trace_calls.push(enable);
        Ok(())
    }

    fn dialect(&self) -> Option<&Dialect> {
        self.dialect.as_ref()
    }

    fn param_support(&self, ty: SqlType, mode: ParamMode) -> Result<(), DbError> {
        if self.unsupported_types.contains(&ty) {
            return Err(DbError::UnsupportedType(ty));
        }
        if self.unsupported_params.contains(&(ty, mode)) {
            return Err(DbError::UnsupportedMode {
                ty,
                mode: mode.as_str(),
            });
        }
        Ok(())
    }

    fn result_support(&self, ty: SqlType, mode: ResultMode) -> Result<(), DbError> {
        if self.unsupported_types.contains(&ty) {
            return Err(DbError::UnsupportedType(ty));
        }
        if self.unsupported_results.contains(&(ty, mode)) {
            return Err(DbError::UnsupportedMode {
                ty,
                mode: mode.as_str(),
            });
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), DbError> {
        if let Some(kind) = self.script.close_failure.get() {
            return Err(scripted_error(kind));
        }
        self.script.log.borrow_mut().closed = true;
        Ok(())
    }
}

struct ScriptedStatement {
    script: Rc<Script>,
    param_count: usize,
    column_count: usize,
    executed: bool,
}

impl BackendStatement for ScriptedStatement {
    fn param_count(&self) -> usize {
        self.param_count
    }

    fn column_count(&self) -> usize {
        self.column_count
    }

    fn exec(&mut self, params: &[Value]) -> Result<(), DbError> {
        self.script.log.borrow_mut().executions.push(params.to_vec());
        if let Some(kind) = self.script.exec_failure.get() {
            return Err(scripted_error(kind));
        }
        self.executed = true;
        Ok(())
    }

    fn fetch(&mut self, row: usize) -> Result<Option<Vec<Value>>, DbError> {
        if !self.executed {
            return Err(DbError::illegal("fetch before exec"));
        }
        self.script.log.borrow_mut().fetches.push(row);
        Ok(self.script.rows.borrow().get(row).cloned())
    }

    fn reset(&mut self) {
        self.executed = false;
        self.script.log.borrow_mut().resets += 1;
    }

    fn finalize(&mut self) -> Result<(), DbError> {
        self.script.log.borrow_mut().finalized += 1;
        Ok(())
    }
}
