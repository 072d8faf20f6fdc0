use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::DbError;
use crate::statement::Statement;

/// Callback receiving the plain SQL of every statement about to execute.
pub type TraceHook = Box<dyn FnMut(&str)>;

/// State shared between a [`Database`] and the statements prepared on it.
pub(crate) struct DbShared {
    pub(crate) backend: Box<dyn Backend>,
    pub(crate) open_statements: usize,
    trace: Option<TraceHook>,
    trace_epoch: u64,
    closed: bool,
}

pub(crate) type SharedDb = Rc<RefCell<DbShared>>;

/// A connection handle: owns the backend and counts the statements that are
/// still open on it.
///
/// Handles are single-threaded (`!Send`); every call runs to completion on the
/// calling thread.
pub struct Database {
    shared: SharedDb,
    context: Option<Box<dyn Any>>,
}

impl Database {
    /// Wrap a connected backend.
    #[must_use]
    pub fn new<B: Backend + 'static>(backend: B) -> Self {
        Self::from_parts(Box::new(backend), None)
    }

    /// Wrap a connected backend together with an opaque per-connection value,
    /// retrievable later through [`Database::context`].
    #[must_use]
    pub fn with_context<B: Backend + 'static, C: Any>(backend: B, context: C) -> Self {
        Self::from_parts(Box::new(backend), Some(Box::new(context)))
    }

    fn from_parts(backend: Box<dyn Backend>, context: Option<Box<dyn Any>>) -> Self {
        debug!(backend = backend.name(), "database opened");
        Self {
            shared: Rc::new(RefCell::new(DbShared {
                backend,
                open_statements: 0,
                trace: None,
                trace_epoch: 0,
                closed: false,
            })),
            context,
        }
    }

    /// The value supplied to [`Database::with_context`], if it has type `C`.
    #[must_use]
    pub fn context<C: Any>(&self) -> Option<&C> {
        self.context.as_deref()?.downcast_ref::<C>()
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.shared.borrow().backend.name()
    }

    /// Number of statements prepared on this handle and not yet finalized.
    #[must_use]
    pub fn open_statements(&self) -> usize {
        self.shared.borrow().open_statements
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.borrow().closed
    }

    /// Compile `sql` into a statement.
    ///
    /// The statement's lifetime `'a` bounds any caller storage later bound to
    /// it by reference.
    ///
    /// # Errors
    /// `Illegal` on a closed handle; otherwise whatever the backend reports
    /// (`Connection`, `MalformedSql`, `MultiStmt`, `NoDb`, `Unsupported`, `Oom`).
    pub fn prepare<'a>(&self, sql: &str) -> Result<Statement<'a>, DbError> {
        let backend_stmt = {
            let mut db = self.shared.borrow_mut();
            if db.closed {
                return Err(DbError::illegal("prepare on a closed database"));
            }
            let stmt = db.backend.prepare(sql)?;
            db.open_statements += 1;
            debug!(
                backend = db.backend.name(),
                open = db.open_statements,
                sql,
                "statement prepared"
            );
            stmt
        };
        Ok(Statement::new(Rc::clone(&self.shared), backend_stmt, sql))
    }

    /// Install or remove the trace hook.
    ///
    /// # Errors
    /// `Unsupported` if the backend has no trace capability, `Illegal` on a
    /// closed handle.
    pub fn set_trace(&self, hook: Option<TraceHook>) -> Result<(), DbError> {
        let mut db = self.shared.borrow_mut();
        if db.closed {
            return Err(DbError::illegal("trace on a closed database"));
        }
        db.backend.trace(hook.is_some())?;
        db.trace = hook;
        db.trace_epoch += 1;
        Ok(())
    }

    /// Convenience for `set_trace(Some(Box::new(hook)))`.
    ///
    /// # Errors
    /// See [`Database::set_trace`].
    pub fn enable_trace<F: FnMut(&str) + 'static>(&self, hook: F) -> Result<(), DbError> {
        self.set_trace(Some(Box::new(hook)))
    }

    /// # Errors
    /// See [`Database::set_trace`].
    pub fn disable_trace(&self) -> Result<(), DbError> {
        self.set_trace(None)
    }

    /// Close the connection.
    ///
    /// Closing an already closed handle is a no-op.
    ///
    /// # Errors
    /// `Illegal` while any statement prepared on this handle is still open;
    /// otherwise whatever the backend reports. The handle stays open and
    /// usable after any failure, so the close can be retried.
    pub fn close(&mut self) -> Result<(), DbError> {
        let mut db = self.shared.borrow_mut();
        if db.closed {
            return Ok(());
        }
        if db.open_statements > 0 {
            return Err(DbError::Illegal(format!(
                "{} statement(s) still open",
                db.open_statements
            )));
        }
        db.backend.close()?;
        db.trace = None;
        db.closed = true;
        debug!(backend = db.backend.name(), "database closed");
        Ok(())
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let db = self.shared.borrow();
        f.debug_struct("Database")
            .field("backend", &db.backend.name())
            .field("open_statements", &db.open_statements)
            .field("tracing", &db.trace.is_some())
            .field("closed", &db.closed)
            .finish()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(%err, "close on drop failed");
        }
    }
}

/// Hand `sql` to the trace hook, if one is installed.
///
/// The hook is taken out of the shared state while it runs so that it may
/// itself use the database; it is put back unless it replaced itself.
pub(crate) fn fire_event(shared: &SharedDb, sql: &str) {
    let (hook, epoch) = {
        let mut db = shared.borrow_mut();
        (db.trace.take(), db.trace_epoch)
    };
    if let Some(mut hook) = hook {
        hook(sql);
        let mut db = shared.borrow_mut();
        if db.trace_epoch == epoch && !db.closed {
            db.trace = Some(hook);
        }
    }
}

/// Called by a statement when it is finalized.
pub(crate) fn release_statement(shared: &SharedDb) {
    let mut db = shared.borrow_mut();
    db.open_statements = db.open_statements.saturating_sub(1);
}
