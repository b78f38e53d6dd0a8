//! Shared record types for the Blogr workspace.
//!
//! These are plain data carriers read out of SQLite by `blogr-auth` and
//! `blogr-blog` and handed to the server for rendering. Keeping them here
//! lets both domain crates agree on one `User` without depending on each
//! other.

use serde::Serialize;

/// A registered account.
///
/// Users are created once by registration and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Row id in the `user` table.
    pub id: i64,
    /// Unique, non-empty login name.
    pub username: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
}

/// A blog post joined with its author's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    /// `CURRENT_TIMESTAMP` at insert, `YYYY-MM-DD HH:MM:SS` UTC.
    pub created: String,
    pub author_id: i64,
    pub username: String,
}

impl Post {
    /// Returns `true` when `user` wrote this post.
    pub fn is_authored_by(&self, user: &User) -> bool {
        self.author_id == user.id
    }

    /// Date part of the creation timestamp, for listings.
    pub fn created_date(&self) -> &str {
        self.created.split(' ').next().unwrap_or(&self.created)
    }
}
