use blogr_db::DbError;
use thiserror::Error;

/// Errors produced by the credential store and session layer.
///
/// The `Display` text of `Validation`, `Conflict` and `InvalidCredentials` is
/// written for end users and is rendered on the auth forms as-is.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required form field was empty.
    #[error("{field} is required.")]
    Validation { field: &'static str },

    /// The username is already taken.
    #[error("User {0} is already registered.")]
    Conflict(String),

    /// Unknown user or wrong password. Deliberately does not say which.
    #[error("Incorrect username or password.")]
    InvalidCredentials,

    /// Argon2 failed to hash or parse a stored hash.
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl AuthError {
    /// Whether the message is meant to be shown on a form rather than logged
    /// as a server fault.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AuthError::Validation { .. } | AuthError::Conflict(_) | AuthError::InvalidCredentials
        )
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(e: rusqlite::Error) -> Self {
        AuthError::Db(DbError::Sqlite(e))
    }
}
