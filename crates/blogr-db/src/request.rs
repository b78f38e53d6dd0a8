//! Request-scoped database access.
//!
//! A [`RequestDb`] is created for every incoming HTTP request. It holds no
//! connection until a handler first asks for one; from then on every call in
//! that request sees the same connection. The request middleware calls
//! [`RequestDb::close`] after the response is produced, which hands the
//! connection back to the pool. Clones share the same slot, so the handle can
//! be moved into `spawn_blocking` closures freely.

use crate::DbPool;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use thiserror::Error;

type SlotConnection = PooledConnection<SqliteConnectionManager>;

/// Errors raised while acquiring or using the request connection.
#[derive(Debug, Error)]
pub enum DbError {
    /// The pool could not hand out a connection.
    #[error("db connection failed: {0}")]
    Pool(#[from] r2d2::Error),

    /// A statement failed.
    #[error("db query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A thread panicked while holding the connection slot.
    #[error("request connection lock poisoned")]
    LockPoisoned,

    /// The blocking task running the query did not complete.
    #[error("task join error: {0}")]
    TaskJoin(String),
}

/// Lazily opened, request-scoped database connection.
#[derive(Clone)]
pub struct RequestDb {
    pool: DbPool,
    slot: Arc<Mutex<Option<SlotConnection>>>,
}

impl RequestDb {
    /// Creates an empty handle. No connection is checked out yet.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Runs `f` against this request's connection, opening it on first use.
    ///
    /// This blocks the calling thread on SQLite; async code should use
    /// [`RequestDb::run`] instead.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Pool` if a connection cannot be checked out, or
    /// whatever `f` returns.
    pub fn with_connection<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut slot = self.slot.lock().map_err(|_| DbError::LockPoisoned)?;
        let conn = match slot.take() {
            Some(conn) => conn,
            None => {
                let conn = self.pool.get().map_err(DbError::Pool)?;
                tracing::trace!("opened request connection");
                conn
            }
        };
        let result = f(&*conn);
        *slot = Some(conn);
        result
    }

    /// Runs `f` on the blocking thread pool against this request's connection.
    ///
    /// # Errors
    ///
    /// Returns `DbError::TaskJoin` if the blocking task panics or is
    /// cancelled, or anything [`RequestDb::with_connection`] returns.
    pub async fn run<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_connection(f))
            .await
            .map_err(|e| E::from(DbError::TaskJoin(e.to_string())))?
    }

    /// Releases the request connection if one was opened.
    ///
    /// Safe to call any number of times. Returns `true` if a connection was
    /// released by this call.
    pub fn close(&self) -> bool {
        let released = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match released {
            Some(conn) => {
                drop(conn);
                tracing::trace!("released request connection");
                true
            }
            None => false,
        }
    }

    /// Whether a connection is currently held by this request.
    pub fn is_open(&self) -> bool {
        match self.slot.lock() {
            Ok(slot) => slot.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}

impl std::fmt::Debug for RequestDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDb")
            .field("open", &self.is_open())
            .finish()
    }
}
