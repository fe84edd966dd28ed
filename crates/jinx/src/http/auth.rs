use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use super::{error_response, ApiState};
use crate::accounts::service::AccountError;

/// Live account resolved from a valid access token, available to handlers as an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

/// Rejects the request with 401 unless it carries `Authorization: Bearer <access token>`
/// for an account that still exists.
pub async fn require_auth(
    State(state): State<ApiState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        tracing::warn!(path = %request.uri().path(), "missing bearer token");
        return error_response(StatusCode::UNAUTHORIZED, "authorization header required");
    };

    match state.auth.authenticate(&token).await {
        Ok(id) => {
            request.extensions_mut().insert(AuthenticatedUser { id });
            next.run(request).await
        }
        Err(AccountError::InvalidToken) => {
            error_response(StatusCode::UNAUTHORIZED, "invalid or expired token")
        }
        Err(err) => err.into_response(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
