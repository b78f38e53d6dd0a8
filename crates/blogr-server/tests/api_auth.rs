mod common;

use axum::http::StatusCode;
use common::{body_string, location, session_cookie, test_app};
use serde_json::Value;

#[tokio::test]
async fn health_and_hello() {
    let app = test_app();

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "ok");

    let response = app.get("/hello", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Hello, World!");
}

#[tokio::test]
async fn register_form_renders_for_anonymous_visitor() {
    let app = test_app();
    let response = app.get("/auth/register", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains(r#"action="/auth/register""#));
    assert!(html.contains(r#"name="password""#));
}

#[tokio::test]
async fn register_stores_user_and_redirects_to_login() {
    let app = test_app();

    let response = app
        .post_form("/auth/register", "username=alice&password=secret", None)
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/auth/login"));
    assert_eq!(app.count("SELECT COUNT(*) FROM user WHERE username = 'alice'"), 1);

    // The stored password is a hash, never the plain text.
    let conn = app.pool.get().unwrap();
    let stored: String = conn
        .query_row("SELECT password FROM user WHERE username = 'alice'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_ne!(stored, "secret");
    assert!(stored.starts_with("$argon2"));
}

#[tokio::test]
async fn duplicate_registration_is_rejected_on_the_form() {
    let app = test_app();
    app.register("alice", "secret").await;

    let response = app
        .post_form("/auth/register", "username=alice&password=other", None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("User alice is already registered."));
    assert_eq!(app.count("SELECT COUNT(*) FROM user"), 1);
}

#[tokio::test]
async fn empty_fields_are_required() {
    let app = test_app();

    let html = body_string(
        app.post_form("/auth/register", "username=&password=secret", None)
            .await,
    )
    .await;
    assert!(html.contains("Username is required."));

    let html = body_string(
        app.post_form("/auth/register", "username=alice&password=", None)
            .await,
    )
    .await;
    assert!(html.contains("Password is required."));

    // Username is checked first when both are missing.
    let html = body_string(app.post_form("/auth/register", "", None).await).await;
    assert!(html.contains("Username is required."));

    assert_eq!(app.count("SELECT COUNT(*) FROM user"), 0);
}

#[tokio::test]
async fn failed_login_does_not_say_which_part_was_wrong() {
    let app = test_app();
    app.register("alice", "secret").await;

    let wrong_password = app
        .post_form("/auth/login", "username=alice&password=nope", None)
        .await;
    assert_eq!(wrong_password.status(), StatusCode::OK);
    assert!(session_cookie(&wrong_password).is_none());
    let wrong_password = body_string(wrong_password).await;

    let unknown_user = app
        .post_form("/auth/login", "username=bob&password=secret", None)
        .await;
    assert_eq!(unknown_user.status(), StatusCode::OK);
    assert!(session_cookie(&unknown_user).is_none());
    let unknown_user = body_string(unknown_user).await;

    assert!(wrong_password.contains("Incorrect username or password."));
    assert!(unknown_user.contains("Incorrect username or password."));
    assert_eq!(app.count("SELECT COUNT(*) FROM user_session"), 0);
}

#[tokio::test]
async fn login_identifies_subsequent_requests() {
    let app = test_app();
    let cookie = app.sign_in("alice", "secret").await;

    let html = body_string(app.get("/", Some(&cookie)).await).await;
    assert!(html.contains("<span>alice</span>"));
    assert!(html.contains(r#"href="/auth/logout""#));

    let anonymous = body_string(app.get("/", None).await).await;
    assert!(!anonymous.contains("<span>alice</span>"));
    assert!(anonymous.contains(r#"href="/auth/login""#));
}

#[tokio::test]
async fn session_cookie_is_http_only() {
    let app = test_app();
    app.register("alice", "secret").await;

    let response = app
        .post_form("/auth/login", "username=alice&password=secret", None)
        .await;
    let header = response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(header.starts_with("session="));
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("Path=/"));
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = test_app();
    let cookie = app.sign_in("alice", "secret").await;

    let response = app.get("/auth/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/"));
    assert_eq!(app.count("SELECT COUNT(*) FROM user_session"), 0);

    // Replaying the old cookie no longer identifies anyone.
    let html = body_string(app.get("/", Some(&cookie)).await).await;
    assert!(!html.contains("<span>alice</span>"));

    let response = app.get("/create", Some(&cookie)).await;
    assert_eq!(location(&response).as_deref(), Some("/auth/login"));
}

#[tokio::test]
async fn logout_without_session_is_harmless() {
    let app = test_app();
    let response = app.get("/auth/logout", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/"));
}

#[tokio::test]
async fn logging_in_again_replaces_the_previous_session() {
    let app = test_app();
    let first = app.sign_in("alice", "secret").await;

    let response = app
        .post_form(
            "/auth/login",
            "username=alice&password=secret",
            Some(&first),
        )
        .await;
    let second = session_cookie(&response).unwrap();

    assert_ne!(first, second);
    assert_eq!(app.count("SELECT COUNT(*) FROM user_session"), 1);
    let html = body_string(app.get("/", Some(&first)).await).await;
    assert!(!html.contains("<span>alice</span>"));
    let html = body_string(app.get("/", Some(&second)).await).await;
    assert!(html.contains("<span>alice</span>"));
}

#[tokio::test]
async fn forged_cookie_is_treated_as_anonymous() {
    let app = test_app();
    app.sign_in("alice", "secret").await;

    let response = app.get("/", Some("session=not-a-real-token")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(!html.contains("<span>alice</span>"));
}

#[tokio::test]
async fn session_of_deleted_user_is_anonymous() {
    let app = test_app();
    let cookie = app.sign_in("alice", "secret").await;

    {
        let conn = app.pool.get().unwrap();
        conn.execute("DELETE FROM post", []).unwrap();
        conn.execute("DELETE FROM user WHERE username = 'alice'", [])
            .unwrap();
    }

    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_string(response).await.contains("<span>alice</span>"));
}
