use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use blogr_auth::{resolve_identity, AuthError, SessionToken};
use blogr_db::RequestDb;
use blogr_types::User;
use std::sync::Arc;

use crate::api::{ApiError, LOGIN_PATH};
use crate::AppState;

/// Per-request state handed to every handler through request extensions.
///
/// Built once by [`request_context_middleware`] before routing reaches a
/// handler. `user` is resolved exactly once here and never re-read from the
/// database during the request.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// This request's lazily opened database connection.
    pub db: RequestDb,
    /// The verified session token, if the request carried one.
    pub session: Option<SessionToken>,
    /// The identified user. `None` for anonymous requests.
    pub user: Option<User>,
}

impl RequestContext {
    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The identified user, or [`ApiError::LoginRequired`].
    ///
    /// Handlers behind [`login_required`] never see the error; it keeps them
    /// total if they are ever mounted without the guard.
    pub fn require_user(&self) -> Result<&User, ApiError> {
        self.user.as_ref().ok_or(ApiError::LoginRequired)
    }
}

/// Current time as Unix seconds.
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Opens the request scope: creates the request's [`RequestDb`], resolves the
/// session cookie to a user, runs the rest of the stack, then releases the
/// connection whatever the outcome.
pub async fn request_context_middleware(
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or_else(|| ApiError::InternalServerError("app state missing".to_string()))?
        .clone();

    let db = RequestDb::new(state.pool.clone());
    let now = now_unix();
    let session = state.session.read(&CookieJar::from_headers(req.headers()), now);

    let user = match session.clone() {
        Some(token) => {
            let resolved = db
                .run(move |conn| resolve_identity(conn, Some(&token), now))
                .await;
            match resolved {
                Ok(user) => user,
                Err(e) => {
                    db.close();
                    return Err(auth_failure(e));
                }
            }
        }
        None => None,
    };

    if let Some(user) = &user {
        tracing::trace!(user_id = user.id, "request identified");
    }

    req.extensions_mut().insert(RequestContext {
        db: db.clone(),
        session,
        user,
    });

    let response = next.run(req).await;
    db.close();
    Ok(response)
}

fn auth_failure(e: AuthError) -> ApiError {
    tracing::warn!(error = %e, "identity resolution failed");
    ApiError::from(e)
}

/// Guard for routes that need an identified user.
///
/// Anonymous requests are redirected to the login page and the wrapped
/// handler is never invoked. Applied with `Router::route_layer`, so the
/// handlers themselves and their routes are left as they are.
pub async fn login_required(req: Request<Body>, next: Next) -> Response {
    let identified = req
        .extensions()
        .get::<RequestContext>()
        .is_some_and(|ctx| ctx.user.is_some());

    if !identified {
        tracing::debug!(path = %req.uri().path(), "anonymous request to protected route");
        return Redirect::to(LOGIN_PATH).into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Extension, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn anonymous_context() -> RequestContext {
        let pool = blogr_db::create_pool(":memory:", blogr_db::DbRuntimeSettings::default())
            .expect("pool creation should succeed");
        RequestContext {
            db: RequestDb::new(pool),
            session: None,
            user: None,
        }
    }

    fn guarded(calls: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/guarded",
                get(move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        "ran"
                    }
                }),
            )
            .route_layer(middleware::from_fn(login_required))
    }

    #[tokio::test]
    async fn guard_redirects_without_running_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = guarded(calls.clone()).layer(Extension(anonymous_context()));

        let response = app
            .oneshot(Request::builder().uri("/guarded").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], LOGIN_PATH);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn guard_redirects_when_context_is_missing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let response = guarded(calls.clone())
            .oneshot(Request::builder().uri("/guarded").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn guard_passes_identified_requests_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctx = anonymous_context();
        ctx.user = Some(User {
            id: 1,
            username: "alice".to_string(),
            password_hash: String::new(),
        });
        let app = guarded(calls.clone()).layer(Extension(ctx));

        let response = app
            .oneshot(Request::builder().uri("/guarded").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn require_user_reports_login_required() {
        let ctx = anonymous_context();
        assert!(matches!(ctx.require_user(), Err(ApiError::LoginRequired)));
        assert!(ctx.current_user().is_none());
    }
}
