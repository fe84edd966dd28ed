//! Versioned API assembly, shared state, and JSON error plumbing.

pub mod auth;
pub mod extract;
mod state;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domain::DomainError;
use crate::storage::RepositoryError;
use crate::{accounts, feed, rituals, tracker};

pub use auth::AuthenticatedUser;
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use state::ApiState;

/// Every API route under `/api/v1`. Only registration, login, refresh and the curse
/// style catalog are reachable without a bearer token.
pub fn api_router(state: ApiState) -> Router {
    let protected = Router::new()
        .merge(accounts::router::profile_routes())
        .merge(feed::router::routes())
        .merge(tracker::router::routes())
        .merge(rituals::router::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let v1 = Router::new()
        .merge(accounts::router::public_routes())
        .merge(protected);

    Router::new()
        .nest("/api/v1", v1)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, Json(payload)).into_response()
}

/// Logs the cause and answers with a generic 500.
pub(crate) fn internal_error(error: &dyn std::error::Error) -> Response {
    tracing::error!(error = %error, "request failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

pub(crate) fn domain_error_response(error: &DomainError) -> Response {
    let status = match error {
        DomainError::PasswordHashing(_) => return internal_error(error),
        DomainError::Forbidden => StatusCode::FORBIDDEN,
        DomainError::InvalidTransition { .. }
        | DomainError::RitualAlreadyEnded
        | DomainError::RitualNotActive => StatusCode::CONFLICT,
        DomainError::InvalidEmail
        | DomainError::PasswordTooShort
        | DomainError::InvalidUsername
        | DomainError::InvalidAge
        | DomainError::InvalidPostContent
        | DomainError::InvalidCompanyName
        | DomainError::InvalidStageName
        | DomainError::InvalidReminderMessage
        | DomainError::UnknownVariant { .. }
        | DomainError::CannotCurseSelf => StatusCode::BAD_REQUEST,
    };
    error_response(status, error.to_string())
}

pub(crate) fn repository_error_response(error: &RepositoryError) -> Response {
    match error {
        RepositoryError::Conflict => error_response(StatusCode::CONFLICT, error.to_string()),
        RepositoryError::NotFound => error_response(StatusCode::NOT_FOUND, error.to_string()),
        RepositoryError::Corrupt(_) | RepositoryError::Unavailable(_) => internal_error(error),
    }
}
