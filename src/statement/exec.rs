use tracing::{debug, trace};

use crate::convert::convert;
use crate::database::fire_event;
use crate::error::DbError;
use crate::types::Value;

use super::{Statement, StatementState};

/// What a record callback wants after seeing a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFlow {
    /// Fetch the next row.
    Continue,
    /// Stop without error.
    Stop,
    /// Stop and fail the execution with `DbError::Callback`.
    Abort,
}

impl From<i32> for RecordFlow {
    fn from(code: i32) -> Self {
        match code {
            0 => RecordFlow::Continue,
            c if c < 0 => RecordFlow::Abort,
            _ => RecordFlow::Stop,
        }
    }
}

type RecordCallback<'s, 'a> = &'s mut dyn FnMut(&mut Statement<'a>, usize) -> RecordFlow;

impl<'a> Statement<'a> {
    /// Execute the statement. The first row produced, if any, is delivered to
    /// the result bindings; the remaining rows are discarded.
    ///
    /// # Errors
    /// `Illegal` when re-entered from a record callback or after finalize;
    /// otherwise whatever the backend reports. The statement stays usable.
    pub fn exec(&mut self) -> Result<(), DbError> {
        self.run(None)
    }

    /// Execute the statement and call `on_record` after each row has been
    /// delivered to the result bindings. `on_record` receives the statement
    /// itself, so it can read temporary results or change bindings.
    ///
    /// # Errors
    /// `Callback` when `on_record` returns [`RecordFlow::Abort`], plus the
    /// errors of [`Statement::exec`].
    pub fn exec_f<F>(&mut self, mut on_record: F) -> Result<(), DbError>
    where
        F: FnMut(&mut Statement<'a>, usize) -> RecordFlow,
    {
        let callback: RecordCallback<'_, 'a> = &mut on_record;
        self.run(Some(callback))
    }

    fn run(&mut self, on_record: Option<RecordCallback<'_, 'a>>) -> Result<(), DbError> {
        self.check_live("exec")?;
        if self.state == StatementState::Executing {
            return Err(DbError::illegal("exec re-entered while the statement is executing"));
        }

        let params = self.sample_params()?;
        self.generation += 1;
        self.row.clear();
        fire_event(&self.db, &self.sql);

        self.state = StatementState::Executing;
        debug!(sql = %self.sql, generation = self.generation, "executing");
        let outcome = self.drive(&params, on_record);
        if let Some(backend) = self.backend.as_mut() {
            backend.reset();
        }
        self.state = StatementState::Prepared;
        outcome
    }

    fn drive(
        &mut self,
        params: &[Value],
        mut on_record: Option<RecordCallback<'_, 'a>>,
    ) -> Result<(), DbError> {
        self.backend_mut()?.exec(params)?;

        let mut index = 0;
        while let Some(raw) = self.backend_mut()?.fetch(index)? {
            trace!(row = index, columns = raw.len(), "row fetched");
            self.store_row(raw)?;
            let Some(callback) = on_record.as_deref_mut() else {
                break;
            };
            match callback(self, index) {
                RecordFlow::Continue => index += 1,
                RecordFlow::Stop => break,
                RecordFlow::Abort => return Err(DbError::Callback { row: index }),
            }
        }
        Ok(())
    }

    /// Convert each bound column to its binding's type, then hand the values
    /// to their bindings. Unbound columns are kept as fetched. A conversion
    /// failure leaves every destination untouched.
    fn store_row(&mut self, raw: Vec<Value>) -> Result<(), DbError> {
        let mut row = Vec::new();
        row.try_reserve_exact(raw.len()).map_err(|_| DbError::Oom)?;
        for (index, value) in raw.into_iter().enumerate() {
            let value = match self.results.get(index).and_then(Option::as_ref) {
                Some(binding) => convert(value, binding.ty)?,
                None => value,
            };
            row.push(value);
        }
        for (binding, value) in self.results.iter().zip(&row) {
            if let Some(binding) = binding {
                binding.store(value)?;
            }
        }
        self.row = row;
        Ok(())
    }
}
