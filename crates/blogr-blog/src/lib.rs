//! Blog posts: listing, creation, author-checked fetch, update and delete.
//!
//! Write operations take the acting [`User`] so ownership is checked in one
//! place ([`get_post`]) instead of in every handler.

use blogr_db::DbError;
use blogr_types::{Post, User};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

/// Errors that can occur during post operations.
#[derive(Debug, Error)]
pub enum BlogError {
    #[error("Post id {0} does not exist.")]
    NotFound(i64),
    #[error("post {0} belongs to another author")]
    Forbidden(i64),
    /// A required field was empty. Shown on the form.
    #[error("{field} is required.")]
    Validation { field: &'static str },
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<rusqlite::Error> for BlogError {
    fn from(e: rusqlite::Error) -> Self {
        BlogError::Db(DbError::Sqlite(e))
    }
}

/// Title and body as submitted on the create/update form.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub body: String,
}

impl PostDraft {
    /// A post needs a title; the body may be empty.
    pub fn validate(&self) -> Result<(), BlogError> {
        if self.title.is_empty() {
            return Err(BlogError::Validation { field: "Title" });
        }
        Ok(())
    }
}

const POST_COLUMNS: &str = "SELECT p.id, title, body, created, author_id, username
     FROM post p JOIN user u ON p.author_id = u.id";

fn map_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get("id")?,
        title: row.get("title")?,
        body: row.get("body")?,
        created: row.get("created")?,
        author_id: row.get("author_id")?,
        username: row.get("username")?,
    })
}

/// All posts with their author, most recent first.
pub fn list_posts(conn: &Connection) -> Result<Vec<Post>, BlogError> {
    let mut stmt = conn.prepare(&format!("{POST_COLUMNS} ORDER BY created DESC, p.id DESC"))?;
    let rows = stmt.query_map([], map_post)?;
    let mut posts = Vec::new();
    for row in rows {
        posts.push(row?);
    }
    Ok(posts)
}

/// Creates a post authored by `author`. Returns the new post id.
pub fn create_post(conn: &Connection, author: &User, draft: &PostDraft) -> Result<i64, BlogError> {
    draft.validate()?;
    conn.execute(
        "INSERT INTO post (title, body, author_id) VALUES (?1, ?2, ?3)",
        params![draft.title, draft.body, author.id],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(post_id = id, author_id = author.id, "post created");
    Ok(id)
}

/// Fetches a post, optionally requiring that `viewer` wrote it.
///
/// # Errors
///
/// [`BlogError::NotFound`] if no post has this id; [`BlogError::Forbidden`]
/// if `check_author` is set and `viewer` is not the author.
pub fn get_post(
    conn: &Connection,
    id: i64,
    viewer: &User,
    check_author: bool,
) -> Result<Post, BlogError> {
    let post = conn
        .query_row(&format!("{POST_COLUMNS} WHERE p.id = ?1"), [id], map_post)
        .optional()?
        .ok_or(BlogError::NotFound(id))?;

    if check_author && !post.is_authored_by(viewer) {
        return Err(BlogError::Forbidden(id));
    }

    Ok(post)
}

/// Updates title and body of a post `editor` owns.
pub fn update_post(
    conn: &Connection,
    id: i64,
    editor: &User,
    draft: &PostDraft,
) -> Result<(), BlogError> {
    get_post(conn, id, editor, true)?;
    draft.validate()?;
    conn.execute(
        "UPDATE post SET title = ?1, body = ?2 WHERE id = ?3",
        params![draft.title, draft.body, id],
    )?;
    tracing::info!(post_id = id, "post updated");
    Ok(())
}

/// Deletes a post `editor` owns.
pub fn delete_post(conn: &Connection, id: i64, editor: &User) -> Result<(), BlogError> {
    get_post(conn, id, editor, true)?;
    conn.execute("DELETE FROM post WHERE id = ?1", [id])?;
    tracing::info!(post_id = id, "post deleted");
    Ok(())
}
