use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use super::domain::RankingPeriod;
use super::service::{RitualError, RitualView};
use crate::http::{
    domain_error_response, error_response, repository_error_response, ApiQuery, ApiState,
};

/// Read-only ritual and ranking endpoints.
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/rituals/active", get(active_ritual_handler))
        .route("/rankings", get(leaderboard_handler))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LeaderboardQuery {
    pub period: Option<String>,
    pub limit: Option<i64>,
}

pub(crate) async fn active_ritual_handler(
    State(state): State<ApiState>,
) -> Result<Response, RitualError> {
    let ritual = state
        .rituals
        .active(Utc::now())
        .await?
        .ok_or(RitualError::NoActiveRitual)?;
    Ok((StatusCode::OK, Json(RitualView::from(&ritual))).into_response())
}

pub(crate) async fn leaderboard_handler(
    State(state): State<ApiState>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> Result<Response, RitualError> {
    let period = match query.period.as_deref().map(str::trim) {
        None | Some("") => RankingPeriod::Weekly,
        Some(raw) => raw.parse()?,
    };
    let leaderboard = state.rankings.leaderboard(period, query.limit).await?;
    Ok((StatusCode::OK, Json(leaderboard)).into_response())
}

impl IntoResponse for RitualError {
    fn into_response(self) -> Response {
        match self {
            RitualError::Domain(ref error) => domain_error_response(error),
            RitualError::RitualNotFound
            | RitualError::NoActiveRitual
            | RitualError::UserNotFound => error_response(StatusCode::NOT_FOUND, self.to_string()),
            RitualError::AlreadyScheduled(_)
            | RitualError::NotCompleted
            | RitualError::AlreadySettled => {
                error_response(StatusCode::CONFLICT, self.to_string())
            }
            RitualError::IncompleteStandings => {
                error_response(StatusCode::BAD_REQUEST, self.to_string())
            }
            RitualError::Repository(ref error) => repository_error_response(error),
        }
    }
}
