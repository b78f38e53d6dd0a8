#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use blogr_db::{create_pool, DbPool, DbRuntimeSettings};
use blogr_server::{app, config::SessionConfig, AppState};
use tempfile::NamedTempFile;
use tower::ServiceExt; // for oneshot

pub const COOKIE_NAME: &str = "session";

/// A router over a throwaway database file. `:memory:` would give every
/// pooled connection its own empty database.
pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    _db_file: NamedTempFile,
}

pub fn test_app() -> TestApp {
    let db_file = NamedTempFile::new().unwrap();
    let db_path = db_file.path().to_str().unwrap();
    let pool = create_pool(db_path, DbRuntimeSettings::default()).unwrap();
    {
        let conn = pool.get().unwrap();
        blogr_db::run_migrations(&conn).unwrap();
    }

    let session = SessionConfig {
        secret_key: "integration-test-secret".to_string(),
        cookie_name: COOKIE_NAME.to_string(),
        ..SessionConfig::default()
    };

    TestApp {
        router: app(AppState::new(pool.clone(), &session)),
        pool,
        _db_file: db_file,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::from(form.to_string())).unwrap())
            .await
            .unwrap()
    }

    pub async fn register(&self, username: &str, password: &str) {
        let response = self
            .post_form(
                "/auth/register",
                &format!("username={username}&password={password}"),
                None,
            )
            .await;
        assert_eq!(location(&response).as_deref(), Some("/auth/login"));
    }

    /// Logs in and returns the `name=value` pair to send back as `Cookie`.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/auth/login",
                &format!("username={username}&password={password}"),
                None,
            )
            .await;
        assert_eq!(location(&response).as_deref(), Some("/"));
        session_cookie(&response).expect("login should set a session cookie")
    }

    /// Registers and logs in a user in one step.
    pub async fn sign_in(&self, username: &str, password: &str) -> String {
        self.register(username, password).await;
        self.login(username, password).await
    }

    pub fn count(&self, sql: &str) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    pub fn post_title(&self, id: i64) -> Option<String> {
        let conn = self.pool.get().unwrap();
        conn.query_row("SELECT title FROM post WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .ok()
    }
}

/// The `name=value` part of the session `Set-Cookie` header, if one was set.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{COOKIE_NAME}=")))
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
