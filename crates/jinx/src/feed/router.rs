use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::service::{CreatePostInput, FeedError, UpdatePostInput};
use crate::domain::Page;
use crate::http::{
    domain_error_response, error_response, internal_error, repository_error_response, ApiJson,
    ApiPath, ApiQuery, ApiState, AuthenticatedUser,
};

/// Post and curse endpoints; all require authentication.
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/posts", get(timeline_handler).post(create_handler))
        .route("/posts/:post_id", put(update_handler).delete(delete_handler))
        .route(
            "/posts/:post_id/curse",
            post(curse_handler).delete(uncurse_handler),
        )
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

pub(crate) async fn timeline_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Response, FeedError> {
    let page = Page::new(query.offset, query.limit);
    let posts = state.posts.timeline(user.id, page).await?;
    Ok((StatusCode::OK, Json(posts)).into_response())
}

pub(crate) async fn create_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<CreatePostInput>,
) -> Result<Response, FeedError> {
    let post = state.posts.create(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(post)).into_response())
}

pub(crate) async fn update_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(post_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdatePostInput>,
) -> Result<Response, FeedError> {
    state.posts.update(post_id, user.id, input).await?;
    Ok(message(StatusCode::OK, "post updated successfully"))
}

pub(crate) async fn delete_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Response, FeedError> {
    state.posts.delete(post_id, user.id).await?;
    Ok(message(StatusCode::OK, "post deleted successfully"))
}

pub(crate) async fn curse_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Response, FeedError> {
    state.curses.curse_post(user.id, post_id).await?;
    Ok(message(StatusCode::OK, "post cursed successfully"))
}

pub(crate) async fn uncurse_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Response, FeedError> {
    state.curses.uncurse_post(user.id, post_id).await?;
    Ok(message(StatusCode::OK, "post uncursed successfully"))
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        match &self {
            FeedError::Domain(error) => domain_error_response(error),
            FeedError::PostNotFound | FeedError::UserNotFound | FeedError::CurseNotFound => {
                error_response(StatusCode::NOT_FOUND, self.to_string())
            }
            FeedError::AlreadyCursed => error_response(StatusCode::CONFLICT, self.to_string()),
            FeedError::Repository(error) => repository_error_response(error),
            FeedError::CurseStyleNotFound(_) | FeedError::Lookup(_) => internal_error(&self),
        }
    }
}
