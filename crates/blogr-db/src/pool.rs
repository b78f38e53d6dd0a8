//! The SQLite connection pool behind every request.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a writer waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Upper bound on connections, and so on requests touching the database
    /// at the same time.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Applied to every connection the pool opens.
///
/// A file database must end up in WAL mode; `:memory:` reports "memory" and
/// is accepted as is.
fn prepare_connection(conn: &mut Connection, settings: DbRuntimeSettings) -> rusqlite::Result<()> {
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !matches!(journal_mode.as_str(), "wal" | "memory") {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal_mode stayed {journal_mode}, expected wal")),
        ));
    }
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(std::time::Duration::from_millis(settings.busy_timeout_ms))?;
    Ok(())
}

/// Builds the pool for the database file at `db_path`, creating the file if
/// needed.
///
/// No connection is opened here; the first `get()` opens one and idle
/// connections are reused after that. `:memory:` works, but each pooled
/// connection then has a private database, so it only suits code that holds
/// a single connection throughout.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if r2d2 rejects the configuration.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| prepare_connection(conn, settings));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .min_idle(Some(0))
        .build(manager)?;

    tracing::debug!(path = db_path, max_size = settings.pool_max_size, "database pool ready");
    Ok(pool)
}
