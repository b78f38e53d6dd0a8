//! Credentials and sessions for Blogr.
//!
//! - [`users`]: the credential store. Registration with uniqueness checks,
//!   password verification, lookups by id and name.
//! - [`password`]: Argon2id hashing with per-password random salts.
//! - [`session`]: HMAC-signed session tokens, the `user_session` revocation
//!   table, and [`session::resolve_identity`], which turns a token into the
//!   request's current user.
//!
//! Every function takes a borrowed `rusqlite::Connection`; callers decide
//! where the connection comes from (in the server, the request's
//! `RequestDb`).

mod error;
pub mod password;
pub mod session;
pub mod users;

pub use error::AuthError;
pub use session::{resolve_identity, SessionSigner, SessionToken};
pub use users::{find_by_username, get_user, register, verify};
