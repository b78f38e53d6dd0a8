//! Registration, login and logout.
//!
//! Form errors the user can fix (missing field, taken username, bad
//! credentials) re-render the form with a message and status 200; only
//! infrastructure failures become error responses.

use axum::{
    extract::{Extension, Form},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use blogr_auth::{
    session::{create_session, purge_expired_sessions, revoke_session},
    AuthError,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::{ApiError, LOGIN_PATH};
use crate::middleware::{now_unix, RequestContext};
use crate::{pages, AppState};

/// Submitted register/login form. Missing fields arrive as empty strings and
/// are rejected by validation.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Handler for `GET /auth/register`.
pub async fn register_form(Extension(ctx): Extension<RequestContext>) -> Html<String> {
    Html(pages::register_page(ctx.current_user(), None, ""))
}

/// Handler for `POST /auth/register`.
///
/// Redirects to the login page on success.
pub async fn register_handler(
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, ApiError> {
    let CredentialsForm { username, password } = form;
    let submitted = username.clone();

    let result = ctx
        .db
        .run(move |conn| blogr_auth::register(conn, &username, &password))
        .await;

    match result {
        Ok(_) => Ok(Redirect::to(LOGIN_PATH).into_response()),
        Err(e) if e.is_user_facing() => Ok(Html(pages::register_page(
            ctx.current_user(),
            Some(&e.to_string()),
            &submitted,
        ))
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// Handler for `GET /auth/login`.
pub async fn login_form(Extension(ctx): Extension<RequestContext>) -> Html<String> {
    Html(pages::login_page(ctx.current_user(), None, ""))
}

/// Handler for `POST /auth/login`.
///
/// On success any session the request already carried is revoked, a new one
/// is issued for the verified user, and the browser is sent to the index.
pub async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, ApiError> {
    let CredentialsForm { username, password } = form;
    let submitted = username.clone();
    let previous = ctx.session.clone();
    let signer = state.session.signer.clone();
    let now = now_unix();

    let outcome = ctx
        .db
        .run(move |conn| {
            let Some(user) = blogr_auth::verify(conn, &username, &password)? else {
                return Ok(None);
            };
            if let Some(previous) = previous {
                revoke_session(conn, &previous.sid)?;
            }
            purge_expired_sessions(conn, now)?;
            let token = create_session(conn, &signer, user.id, now)?;
            Ok::<_, AuthError>(Some((user, token)))
        })
        .await?;

    let Some((user, token)) = outcome else {
        let message = AuthError::InvalidCredentials.to_string();
        return Ok(Html(pages::login_page(
            ctx.current_user(),
            Some(&message),
            &submitted,
        ))
        .into_response());
    };

    tracing::info!(user_id = user.id, username = %user.username, "user logged in");
    let jar = jar.add(state.session.cookie(&token));
    Ok((jar, Redirect::to("/")).into_response())
}

/// Handler for `GET /auth/logout`.
///
/// Revokes the current session if there is one and clears the cookie. Safe
/// to call when already logged out.
pub async fn logout_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    if let Some(token) = ctx.session.clone() {
        let sid = token.sid.clone();
        ctx.db
            .run(move |conn| revoke_session(conn, &sid))
            .await?;
        tracing::info!(user_id = token.user_id, "user logged out");
    }

    let jar = jar.remove(state.session.removal_cookie());
    Ok((jar, Redirect::to("/")).into_response())
}
