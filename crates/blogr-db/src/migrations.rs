//! Embedded SQL migration runner.
//!
//! Migrations are SQL files embedded at compile time. They run sequentially
//! on startup, tracked by the `_blogr_migrations` table. Each migration
//! runs exactly once; if it has already been applied, it is skipped.

use rusqlite::Connection;
use thiserror::Error;

/// A single embedded migration.
struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. New migrations are appended here.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "000_user",
        sql: include_str!("migrations/000_user.sql"),
    },
    Migration {
        name: "001_post",
        sql: include_str!("migrations/001_post.sql"),
    },
    Migration {
        name: "002_user_session",
        sql: include_str!("migrations/002_user_session.sql"),
    },
];

/// Tables dropped by [`init_db`], children before parents.
const APPLICATION_TABLES: &[&str] = &["user_session", "post", "user", "_blogr_migrations"];

/// Errors that can occur during migration execution.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A SQL statement within a migration failed.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        /// The name of the migration that failed.
        name: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// Failed to query migration state.
    #[error("failed to check migration state: {0}")]
    StateQuery(rusqlite::Error),

    /// Failed to drop existing tables while resetting the schema.
    #[error("failed to reset schema: {0}")]
    Reset(rusqlite::Error),
}

/// Runs all pending migrations against the given connection.
///
/// Migrations that have already been applied (tracked in `_blogr_migrations`)
/// are skipped. New migrations are applied in order and recorded.
///
/// # Errors
///
/// Returns `MigrationError` if any migration fails to execute or if the
/// migration tracking table cannot be queried.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    run_migrations_from_list(conn, MIGRATIONS)
}

/// Clears all existing data and recreates the schema from scratch.
///
/// Every application table and the migration ledger are dropped inside one
/// transaction, then all migrations are applied again. Returns the number of
/// migrations applied.
///
/// # Errors
///
/// Returns `MigrationError::Reset` if the tables cannot be dropped, or any
/// error [`run_migrations`] can produce.
pub fn init_db(conn: &Connection) -> Result<usize, MigrationError> {
    let tx = conn.unchecked_transaction().map_err(MigrationError::Reset)?;
    for table in APPLICATION_TABLES {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{table}\";"))
            .map_err(MigrationError::Reset)?;
    }
    tx.commit().map_err(MigrationError::Reset)?;

    tracing::info!("dropped existing tables, recreating schema");
    run_migrations(conn)
}

fn run_migrations_from_list(
    conn: &Connection,
    migrations: &[Migration],
) -> Result<usize, MigrationError> {
    // The ledger has to exist before we can ask it what has been applied.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _blogr_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| MigrationError::ExecutionFailed {
        name: "_blogr_migrations_bootstrap".to_string(),
        source: e,
    })?;

    let mut applied = 0;

    for migration in migrations {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _blogr_migrations WHERE name = ?1",
                [migration.name],
                |row| row.get(0),
            )
            .map_err(MigrationError::StateQuery)?;

        if already_applied {
            tracing::debug!(
                migration = migration.name,
                "migration already applied, skipping"
            );
            continue;
        }

        tracing::info!(migration = migration.name, "applying migration");

        let failed = |source| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source,
        };

        let tx = conn.unchecked_transaction().map_err(failed)?;
        tx.execute_batch(migration.sql).map_err(failed)?;
        tx.execute(
            "INSERT INTO _blogr_migrations (name) VALUES (?1)",
            [migration.name],
        )
        .map_err(failed)?;
        tx.commit().map_err(failed)?;

        applied += 1;
    }

    Ok(applied)
}
