//! Blogr server library logic.

pub mod api;
pub mod api_auth;
pub mod api_blog;
pub mod config;
pub mod middleware;
pub mod pages;
pub mod session;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Extension, Router,
};
use blogr_db::DbPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use config::SessionConfig;
use session::SessionSettings;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool. Requests check connections out lazily
    /// through `blogr_db::RequestDb`.
    pub pool: DbPool,
    /// Session cookie settings and signing key.
    pub session: SessionSettings,
}

impl AppState {
    pub fn new(pool: DbPool, session: &SessionConfig) -> Self {
        Self {
            pool,
            session: SessionSettings::from_config(session),
        }
    }
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/create",
            get(api_blog::create_form).post(api_blog::create_handler),
        )
        .route(
            "/{id}/update",
            get(api_blog::update_form).post(api_blog::update_handler),
        )
        .route("/{id}/delete", post(api_blog::delete_handler))
        .route_layer(from_fn(middleware::login_required));

    Router::new()
        .route("/health", get(api::health))
        .route("/hello", get(api::hello))
        .route("/", get(api_blog::index_handler))
        .route(
            "/auth/register",
            get(api_auth::register_form).post(api_auth::register_handler),
        )
        .route(
            "/auth/login",
            get(api_auth::login_form).post(api_auth::login_handler),
        )
        .route("/auth/logout", get(api_auth::logout_handler))
        .merge(protected_routes)
        .layer(from_fn(middleware::request_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
