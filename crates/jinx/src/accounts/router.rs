use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;

use super::service::{AccountError, LoginInput, RefreshInput, RegisterInput, UpdateProfileInput};
use crate::http::{
    domain_error_response, error_response, internal_error, repository_error_response, ApiJson,
    ApiState, AuthenticatedUser,
};

/// Endpoints reachable without a bearer token.
pub fn public_routes() -> Router<ApiState> {
    Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/curse-styles", get(curse_styles_handler))
}

/// Endpoints about the authenticated user.
pub fn profile_routes() -> Router<ApiState> {
    Router::new()
        .route("/users/me", get(profile_handler).put(update_profile_handler))
        .route("/users/me/posts", get(my_posts_handler))
}

pub(crate) async fn register_handler(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<Response, AccountError> {
    let response = state.auth.register(input).await?;
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

pub(crate) async fn login_handler(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<Response, AccountError> {
    let response = state.auth.login(input).await?;
    Ok((StatusCode::OK, Json(response)).into_response())
}

pub(crate) async fn refresh_handler(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<RefreshInput>,
) -> Result<Response, AccountError> {
    let access_token = state.auth.refresh(&input.refresh_token).await?;
    Ok((StatusCode::OK, Json(json!({ "access_token": access_token }))).into_response())
}

pub(crate) async fn curse_styles_handler(
    State(state): State<ApiState>,
) -> Result<Response, AccountError> {
    let styles = state.profiles.curse_styles().await?;
    Ok((StatusCode::OK, Json(json!({ "curse_styles": styles }))).into_response())
}

pub(crate) async fn profile_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Response, AccountError> {
    let profile = state.profiles.profile(user.id).await?;
    Ok((StatusCode::OK, Json(profile)).into_response())
}

pub(crate) async fn update_profile_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<UpdateProfileInput>,
) -> Result<Response, AccountError> {
    let profile = state.profiles.update_profile(user.id, input).await?;
    Ok((StatusCode::OK, Json(profile)).into_response())
}

pub(crate) async fn my_posts_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Response, AccountError> {
    let posts = state.profiles.my_posts(user.id).await?;
    Ok((StatusCode::OK, Json(posts)).into_response())
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        match self {
            AccountError::Domain(ref error) => domain_error_response(error),
            AccountError::EmailTaken => error_response(StatusCode::CONFLICT, self.to_string()),
            AccountError::InvalidCredentials | AccountError::InvalidToken => {
                error_response(StatusCode::UNAUTHORIZED, self.to_string())
            }
            AccountError::UserNotFound => error_response(StatusCode::NOT_FOUND, self.to_string()),
            AccountError::UnknownCurseStyle(_) => {
                error_response(StatusCode::BAD_REQUEST, self.to_string())
            }
            AccountError::Repository(ref error) => repository_error_response(error),
            AccountError::Feed(error) => error.into_response(),
            AccountError::MissingCurseStyle(_)
            | AccountError::Token(_)
            | AccountError::Worker(_) => internal_error(&self),
        }
    }
}
