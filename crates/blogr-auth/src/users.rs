//! The credential store: the `user` table.

use blogr_types::User;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::password::{hash_password, verify_dummy, verify_password};
use crate::AuthError;

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        password_hash: row.get("password")?,
    })
}

/// Registers a new user and returns the stored record.
///
/// Usernames are matched exactly; no trimming or case folding is applied.
///
/// # Errors
///
/// - [`AuthError::Validation`] if `username` or `password` is empty
///   (username is checked first).
/// - [`AuthError::Conflict`] if the username is already registered. No row
///   is written in that case.
pub fn register(conn: &Connection, username: &str, password: &str) -> Result<User, AuthError> {
    if username.is_empty() {
        return Err(AuthError::Validation { field: "Username" });
    }
    if password.is_empty() {
        return Err(AuthError::Validation { field: "Password" });
    }

    let password_hash = hash_password(password)?;

    let inserted = conn.execute(
        "INSERT INTO user (username, password) VALUES (?1, ?2)",
        params![username, password_hash],
    );

    match inserted {
        Ok(_) => {
            let id = conn.last_insert_rowid();
            tracing::info!(user_id = id, username = %username, "registered user");
            Ok(User {
                id,
                username: username.to_string(),
                password_hash,
            })
        }
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            tracing::debug!(username = %username, "registration rejected, username taken");
            Err(AuthError::Conflict(username.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Checks a username/password pair.
///
/// Returns the user when the password matches the stored hash and `None`
/// otherwise. Unknown usernames also return `None`, after spending the same
/// hashing work, so callers cannot tell the two cases apart.
pub fn verify(
    conn: &Connection,
    username: &str,
    password: &str,
) -> Result<Option<User>, AuthError> {
    let Some(user) = find_by_username(conn, username)? else {
        verify_dummy(password);
        tracing::debug!("login attempt for unknown username");
        return Ok(None);
    };

    if verify_password(password, &user.password_hash)? {
        Ok(Some(user))
    } else {
        tracing::debug!(user_id = user.id, "login attempt with wrong password");
        Ok(None)
    }
}

/// Looks up a user by id.
pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, AuthError> {
    let user = conn
        .query_row(
            "SELECT id, username, password FROM user WHERE id = ?1",
            [id],
            map_user,
        )
        .optional()?;
    Ok(user)
}

/// Looks up a user by exact username.
pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>, AuthError> {
    let user = conn
        .query_row(
            "SELECT id, username, password FROM user WHERE username = ?1",
            [username],
            map_user,
        )
        .optional()?;
    Ok(user)
}
