use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use serde_json::json;
use uuid::Uuid;

use super::service::{
    CompanyListParams, CreateApplicationInput, CreateCompanyInput, CreateReminderInput,
    CreateStageInput, TrackerError, UpdateApplicationInput, UpdateStageInput,
};
use crate::http::{
    domain_error_response, error_response, repository_error_response, ApiJson, ApiPath, ApiQuery,
    ApiState, AuthenticatedUser,
};

/// Company catalog and application tracking endpoints.
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route(
            "/companies",
            get(list_companies_handler).post(create_company_handler),
        )
        .route(
            "/applications",
            get(list_applications_handler).post(create_application_handler),
        )
        .route("/applications/:application_id", put(update_application_handler))
        .route(
            "/applications/:application_id/stages",
            get(list_stages_handler).post(create_stage_handler),
        )
        .route(
            "/applications/:application_id/stages/:stage_id",
            put(update_stage_handler),
        )
        .route(
            "/applications/:application_id/reminders",
            get(list_reminders_handler).post(create_reminder_handler),
        )
}

pub(crate) async fn list_companies_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiQuery(params): ApiQuery<CompanyListParams>,
) -> Result<Response, TrackerError> {
    let page = state.companies.list(user.id, params).await?;
    Ok((StatusCode::OK, Json(page)).into_response())
}

pub(crate) async fn create_company_handler(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<CreateCompanyInput>,
) -> Result<Response, TrackerError> {
    let company = state.companies.create(input).await?;
    Ok((StatusCode::CREATED, Json(company)).into_response())
}

pub(crate) async fn list_applications_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Response, TrackerError> {
    let applications = state.applications.list_mine(user.id).await?;
    Ok((StatusCode::OK, Json(json!({ "applications": applications }))).into_response())
}

pub(crate) async fn create_application_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<CreateApplicationInput>,
) -> Result<Response, TrackerError> {
    let outcome = state.applications.create(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(outcome)).into_response())
}

pub(crate) async fn update_application_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(application_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateApplicationInput>,
) -> Result<Response, TrackerError> {
    let outcome = state
        .applications
        .update(user.id, application_id, input)
        .await?;
    Ok((StatusCode::OK, Json(outcome)).into_response())
}

pub(crate) async fn list_stages_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(application_id): ApiPath<Uuid>,
) -> Result<Response, TrackerError> {
    let stages = state.applications.stages(user.id, application_id).await?;
    Ok((StatusCode::OK, Json(json!({ "stages": stages }))).into_response())
}

pub(crate) async fn create_stage_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(application_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CreateStageInput>,
) -> Result<Response, TrackerError> {
    let stage = state
        .applications
        .add_stage(user.id, application_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(stage)).into_response())
}

pub(crate) async fn update_stage_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath((application_id, stage_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<UpdateStageInput>,
) -> Result<Response, TrackerError> {
    let stage = state
        .applications
        .update_stage(user.id, application_id, stage_id, input)
        .await?;
    Ok((StatusCode::OK, Json(stage)).into_response())
}

pub(crate) async fn list_reminders_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(application_id): ApiPath<Uuid>,
) -> Result<Response, TrackerError> {
    let reminders = state.applications.reminders(user.id, application_id).await?;
    Ok((StatusCode::OK, Json(json!({ "reminders": reminders }))).into_response())
}

pub(crate) async fn create_reminder_handler(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(application_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CreateReminderInput>,
) -> Result<Response, TrackerError> {
    let reminder = state
        .applications
        .schedule_reminder(user.id, application_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(reminder)).into_response())
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        match self {
            TrackerError::Domain(ref error) => domain_error_response(error),
            TrackerError::CompanyNotFound
            | TrackerError::ApplicationNotFound
            | TrackerError::StageNotFound => error_response(StatusCode::NOT_FOUND, self.to_string()),
            TrackerError::DuplicateApplication => {
                error_response(StatusCode::CONFLICT, self.to_string())
            }
            TrackerError::InvalidTimestamp { .. } => {
                error_response(StatusCode::BAD_REQUEST, self.to_string())
            }
            TrackerError::Repository(ref error) => repository_error_response(error),
        }
    }
}
