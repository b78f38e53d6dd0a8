//! Post pages: the public index plus create, update and delete for authors.

use axum::{
    extract::{Extension, Form, Path},
    response::{Html, IntoResponse, Redirect, Response},
};
use blogr_blog::{BlogError, PostDraft};
use serde::Deserialize;

use crate::api::ApiError;
use crate::middleware::RequestContext;
use crate::pages;

#[derive(Debug, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl From<PostForm> for PostDraft {
    fn from(form: PostForm) -> Self {
        PostDraft {
            title: form.title,
            body: form.body,
        }
    }
}

/// Handler for `GET /`.
pub async fn index_handler(
    Extension(ctx): Extension<RequestContext>,
) -> Result<Html<String>, ApiError> {
    let posts = ctx.db.run(|conn| blogr_blog::list_posts(conn)).await?;
    Ok(Html(pages::index_page(ctx.current_user(), &posts)))
}

/// Handler for `GET /create`.
pub async fn create_form(Extension(ctx): Extension<RequestContext>) -> Html<String> {
    Html(pages::create_page(ctx.current_user(), None, "", ""))
}

/// Handler for `POST /create`.
///
/// An empty title re-renders the form with the submitted values; otherwise
/// the post is stored and the browser goes back to the index.
pub async fn create_handler(
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<PostForm>,
) -> Result<Response, ApiError> {
    let author = ctx.require_user()?.clone();
    let draft = PostDraft::from(form);

    if let Err(e @ BlogError::Validation { .. }) = draft.validate() {
        return Ok(Html(pages::create_page(
            Some(&author),
            Some(&e.to_string()),
            &draft.title,
            &draft.body,
        ))
        .into_response());
    }

    ctx.db
        .run(move |conn| blogr_blog::create_post(conn, &author, &draft))
        .await?;
    Ok(Redirect::to("/").into_response())
}

/// Handler for `GET /{id}/update`.
///
/// 404 if the post does not exist, 403 if it belongs to someone else.
pub async fn update_form(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Html<String>, ApiError> {
    let editor = ctx.require_user()?.clone();
    let post = ctx
        .db
        .run(move |conn| blogr_blog::get_post(conn, id, &editor, true))
        .await?;
    Ok(Html(pages::update_page(
        ctx.current_user(),
        &post,
        None,
        &post.title,
        &post.body,
    )))
}

/// Handler for `POST /{id}/update`.
///
/// Ownership is checked before the submitted values are validated, so a
/// foreign post answers 403 even for an empty title.
pub async fn update_handler(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> Result<Response, ApiError> {
    let editor = ctx.require_user()?.clone();
    let draft = PostDraft::from(form);
    let submitted = draft.clone();

    let outcome = ctx
        .db
        .run(move |conn| match blogr_blog::update_post(conn, id, &editor, &draft) {
            Ok(()) => Ok(None),
            Err(e @ BlogError::Validation { .. }) => {
                let post = blogr_blog::get_post(conn, id, &editor, true)?;
                Ok(Some((post, e.to_string())))
            }
            Err(e) => Err(e),
        })
        .await?;

    match outcome {
        None => Ok(Redirect::to("/").into_response()),
        Some((post, message)) => Ok(Html(pages::update_page(
            ctx.current_user(),
            &post,
            Some(&message),
            &submitted.title,
            &submitted.body,
        ))
        .into_response()),
    }
}

/// Handler for `POST /{id}/delete`.
pub async fn delete_handler(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let editor = ctx.require_user()?.clone();
    ctx.db
        .run(move |conn| blogr_blog::delete_post(conn, id, &editor))
        .await?;
    Ok(Redirect::to("/").into_response())
}
