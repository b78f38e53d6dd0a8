//! Database layer for Blogr.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, the destructive `init_db` reset used by the CLI,
//! and [`RequestDb`], the per-request connection handle every HTTP handler
//! goes through.
//!
//! The whole application lives in one SQLite file. WAL mode lets readers
//! proceed while one writer commits, and SQLite itself serializes writers,
//! so nothing above this crate needs locking around database access.

mod migrations;
mod pool;
mod request;

pub use migrations::{init_db, run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use request::{DbError, RequestDb};
