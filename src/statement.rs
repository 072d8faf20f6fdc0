//! Prepared statements: lifecycle, bindings and execution.

mod exec;
mod params;
mod results;

use std::fmt;

use tracing::{debug, warn};

use crate::backend::BackendStatement;
use crate::database::{SharedDb, release_statement};
use crate::error::DbError;
use crate::sql_text::{SqlCache, escape_control, expand_sql};
use crate::types::{ParamMode, SqlVariant, Value};

pub use exec::RecordFlow;

use params::ParamBinding;
use results::ResultBinding;

/// Where a statement is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Ready to bind and execute.
    Prepared,
    /// Inside `exec`/`exec_f`, including record callbacks.
    Executing,
    /// Terminal; every further call fails with `Illegal`.
    Finalized,
}

/// A prepared statement with its parameter and result bindings.
///
/// `'a` is the lifetime of caller storage bound by reference (parameter
/// cells, result destinations). The borrow checker therefore guarantees that
/// such storage outlives the statement.
pub struct Statement<'a> {
    db: SharedDb,
    backend: Option<Box<dyn BackendStatement>>,
    sql: String,
    cache: SqlCache,
    params: Vec<Option<ParamBinding<'a>>>,
    results: Vec<Option<ResultBinding<'a>>>,
    row: Vec<Value>,
    state: StatementState,
    generation: u64,
}

impl<'a> Statement<'a> {
    pub(crate) fn new(db: SharedDb, backend: Box<dyn BackendStatement>, sql: &str) -> Self {
        let param_count = backend.param_count();
        let column_count = backend.column_count();
        Self {
            db,
            backend: Some(backend),
            sql: sql.to_owned(),
            cache: SqlCache::default(),
            params: std::iter::repeat_with(|| None).take(param_count).collect(),
            results: std::iter::repeat_with(|| None).take(column_count).collect(),
            row: Vec::new(),
            state: StatementState::Prepared,
            generation: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Number of parameters the statement declares.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Number of columns in each result row.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.results.len()
    }

    /// Bumped by every execution. Temporary result values belong to the
    /// generation that fetched them.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Render the statement's SQL in the requested variant.
    ///
    /// The text is cached and borrowed from the statement, so it stays valid
    /// until the next call that needs `&mut self`.
    ///
    /// # Errors
    /// `Unsupported` for expanded variants when the backend declares no
    /// literal dialect; `Illegal` after finalize; `Oom`.
    pub fn sql(&mut self, variant: SqlVariant) -> Result<&str, DbError> {
        self.check_live("sql")?;
        if variant.is_expanded() && self.has_reference_params() {
            self.cache.invalidate_expanded();
        }
        if !self.cache.contains(variant) {
            let text = self.render_sql(variant)?;
            self.cache.insert(variant, text);
        }
        self.cache
            .get(variant)
            .ok_or_else(|| DbError::illegal("SQL cache slot vanished"))
    }

    fn render_sql(&self, variant: SqlVariant) -> Result<String, DbError> {
        match variant {
            SqlVariant::Plain => Ok(self.sql.clone()),
            SqlVariant::Escaped => Ok(escape_control(&self.sql)),
            SqlVariant::Expanded => {
                let params = self.sample_params()?;
                let db = self.db.borrow();
                let dialect = db.backend.dialect().ok_or_else(|| {
                    DbError::unsupported(db.backend.name(), "expanded SQL")
                })?;
                expand_sql(&self.sql, &params, dialect)
            }
            SqlVariant::ExpandedEscaped => {
                let expanded = match self.cache.get(SqlVariant::Expanded) {
                    Some(text) if !self.has_reference_params() => text.to_owned(),
                    _ => self.render_sql(SqlVariant::Expanded)?,
                };
                Ok(escape_control(&expanded))
            }
        }
    }

    /// Release the bindings and the backend statement.
    ///
    /// # Errors
    /// `Illegal` when called from inside a record callback of this statement
    /// or on an already finalized statement. A backend failure is returned
    /// after the statement has been released anyway.
    pub fn finalize(&mut self) -> Result<(), DbError> {
        match self.state {
            StatementState::Finalized => {
                return Err(DbError::illegal("statement already finalized"));
            }
            StatementState::Executing => {
                return Err(DbError::illegal(
                    "finalize called while the statement is executing",
                ));
            }
            StatementState::Prepared => {}
        }

        let outcome = match self.backend.take() {
            Some(mut backend) => backend.finalize(),
            None => Ok(()),
        };
        self.params.clear();
        self.results.clear();
        self.row.clear();
        self.cache.clear();
        self.state = StatementState::Finalized;
        release_statement(&self.db);
        debug!(sql = %self.sql, "statement finalized");
        outcome
    }

    fn check_live(&self, operation: &str) -> Result<(), DbError> {
        if self.state == StatementState::Finalized {
            return Err(DbError::Illegal(format!("{operation} on a finalized statement")));
        }
        Ok(())
    }

    fn backend_mut(&mut self) -> Result<&mut Box<dyn BackendStatement>, DbError> {
        self.backend
            .as_mut()
            .ok_or_else(|| DbError::illegal("statement has no backend handle"))
    }

    fn has_reference_params(&self) -> bool {
        self.params
            .iter()
            .flatten()
            .any(|binding| binding.mode() == ParamMode::Reference)
    }

    /// Current value of every parameter; unbound parameters are NULL.
    fn sample_params(&self) -> Result<Vec<Value>, DbError> {
        self.params
            .iter()
            .map(|slot| match slot {
                Some(binding) => binding.sample(),
                None => Ok(Value::Null),
            })
            .collect()
    }
}

impl fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("state", &self.state)
            .field("params", &self.params.len())
            .field("columns", &self.results.len())
            .field("generation", &self.generation)
            .finish()
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        if self.state != StatementState::Finalized {
            if let Err(err) = self.finalize() {
                warn!(%err, sql = %self.sql, "finalize on drop failed");
            }
        }
    }
}
