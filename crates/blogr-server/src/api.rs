//! Shared handler plumbing: the error type and the trivial routes.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use blogr_auth::AuthError;
use blogr_blog::BlogError;
use blogr_db::DbError;
use serde_json::{json, Value};
use thiserror::Error;

use crate::pages;

/// Where anonymous visitors of protected pages are sent.
pub const LOGIN_PATH: &str = "/auth/login";

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// No user is identified for a page that needs one.
    #[error("login required")]
    LoginRequired,
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::LoginRequired => return Redirect::to(LOGIN_PATH).into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The server encountered an internal error.".to_string(),
                )
            }
        };

        let reason = status.canonical_reason().unwrap_or("Error");
        (
            status,
            Html(pages::error_page(status.as_u16(), reason, &message)),
        )
            .into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        ApiError::InternalServerError(e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation { .. } | AuthError::InvalidCredentials => {
                ApiError::BadRequest(e.to_string())
            }
            AuthError::Conflict(_) => ApiError::Conflict(e.to_string()),
            AuthError::Hash(_) | AuthError::Db(_) => ApiError::InternalServerError(e.to_string()),
        }
    }
}

impl From<BlogError> for ApiError {
    fn from(e: BlogError) -> Self {
        match e {
            BlogError::NotFound(_) => ApiError::NotFound(e.to_string()),
            BlogError::Forbidden(_) => {
                ApiError::Forbidden("You don't have permission to access this post.".to_string())
            }
            BlogError::Validation { .. } => ApiError::BadRequest(e.to_string()),
            BlogError::Db(_) => ApiError::InternalServerError(e.to_string()),
        }
    }
}

/// Health check handler.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// A simple page that says hello.
pub async fn hello() -> &'static str {
    "Hello, World!"
}
