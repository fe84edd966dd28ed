use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use super::common::*;
use crate::accounts::token::TokenKind;
use crate::config::{AuthConfig, RitualConfig};
use crate::http::{api_router, ApiState};

async fn router_with_tokens() -> (Router, String, String) {
    let harness = harness();
    let owner_id = harness.user("owner").await;
    let stranger_id = harness.user("stranger").await;
    let state = ApiState::new(
        harness.repos,
        &AuthConfig::development(),
        RitualConfig::default(),
    );
    let token = |id| state.tokens.issue(id, TokenKind::Access).expect("token");
    let owner = token(owner_id);
    let stranger = token(stranger_id);
    (api_router(state), owner, stranger)
}

async fn send(router: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> Response {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");
    router.clone().oneshot(request).await.expect("response")
}

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

async fn create_application(router: &Router, token: &str) -> (String, String) {
    let company = send(
        router,
        "POST",
        "/api/v1/companies",
        token,
        Some(json!({ "name": "Acme", "industry": "Rockets" })),
    )
    .await;
    assert_eq!(company.status(), StatusCode::CREATED);
    let company_id = read_json_body(company).await["id"]
        .as_str()
        .expect("company id")
        .to_string();

    let application = send(
        router,
        "POST",
        "/api/v1/applications",
        token,
        Some(json!({ "company_id": company_id, "category": "main" })),
    )
    .await;
    assert_eq!(application.status(), StatusCode::CREATED);
    let body = read_json_body(application).await;
    assert_eq!(body["status"], "todo");
    assert_eq!(body["color_tag"], "orange");
    assert_eq!(body["schedule_conflict"], false);
    (
        company_id,
        body["id"].as_str().expect("application id").to_string(),
    )
}

#[tokio::test]
async fn company_listing_embeds_my_application() {
    let (router, owner, _) = router_with_tokens().await;
    let (company_id, application_id) = create_application(&router, &owner).await;

    let response = send(&router, "GET", "/api/v1/companies?filter=my&limit=5", &owner, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["pagination"]["limit"], 5);
    assert_eq!(body["data"][0]["company"]["id"], company_id.as_str());
    assert_eq!(body["data"][0]["company"]["industry"], "Rockets");
    assert_eq!(
        body["data"][0]["my_application"]["id"],
        application_id.as_str()
    );

    let listed = send(&router, "GET", "/api/v1/applications", &owner, None).await;
    assert_eq!(
        read_json_body(listed).await["applications"]
            .as_array()
            .map(Vec::len),
        Some(1)
    );
}

#[tokio::test]
async fn duplicate_application_conflicts() {
    let (router, owner, _) = router_with_tokens().await;
    let (company_id, _) = create_application(&router, &owner).await;

    let response = send(
        &router,
        "POST",
        "/api/v1/applications",
        &owner,
        Some(json!({ "company_id": company_id, "category": "main" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        read_json_body(response).await["error"],
        "application already exists for this company and category"
    );
}

#[tokio::test]
async fn update_statuses_map_to_http_codes() {
    let (router, owner, stranger) = router_with_tokens().await;
    let (_, application_id) = create_application(&router, &owner).await;
    let uri = format!("/api/v1/applications/{application_id}");

    let skipped = send(&router, "PUT", &uri, &owner, Some(json!({ "status": "done" }))).await;
    assert_eq!(skipped.status(), StatusCode::CONFLICT);

    let foreign = send(&router, "PUT", &uri, &stranger, Some(json!({ "status": "scheduled" }))).await;
    assert_eq!(foreign.status(), StatusCode::FORBIDDEN);

    let bad_time = send(
        &router,
        "PUT",
        &uri,
        &owner,
        Some(json!({ "scheduled_at": "soon" })),
    )
    .await;
    assert_eq!(bad_time.status(), StatusCode::BAD_REQUEST);

    let missing = send(
        &router,
        "PUT",
        &format!("/api/v1/applications/{}", Uuid::new_v4()),
        &owner,
        Some(json!({ "status": "scheduled" })),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let ok = send(
        &router,
        "PUT",
        &uri,
        &owner,
        Some(json!({ "status": "scheduled", "scheduled_at": "2025-04-01T10:00:00Z" })),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);
    let body = read_json_body(ok).await;
    assert_eq!(body["status"], "scheduled");
    assert_eq!(body["scheduled_at"], "2025-04-01T10:00:00Z");
}

#[tokio::test]
async fn stages_and_reminders_round_trip_over_http() {
    let (router, owner, _) = router_with_tokens().await;
    let (_, application_id) = create_application(&router, &owner).await;

    let created = send(
        &router,
        "POST",
        &format!("/api/v1/applications/{application_id}/stages"),
        &owner,
        Some(json!({ "name": "First interview" })),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let stage_id = read_json_body(created).await["id"]
        .as_str()
        .expect("stage id")
        .to_string();

    let updated = send(
        &router,
        "PUT",
        &format!("/api/v1/applications/{application_id}/stages/{stage_id}"),
        &owner,
        Some(json!({ "status": "failed" })),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(read_json_body(updated).await["status"], "failed");

    let stages = send(
        &router,
        "GET",
        &format!("/api/v1/applications/{application_id}/stages"),
        &owner,
        None,
    )
    .await;
    assert_eq!(read_json_body(stages).await["stages"][0]["name"], "First interview");

    let reminder = send(
        &router,
        "POST",
        &format!("/api/v1/applications/{application_id}/reminders"),
        &owner,
        Some(json!({ "target_at": "2025-06-01T09:00:00Z", "message": "Follow up" })),
    )
    .await;
    assert_eq!(reminder.status(), StatusCode::CREATED);
    assert_eq!(read_json_body(reminder).await["channel"], "in_app");

    let reminders = send(
        &router,
        "GET",
        &format!("/api/v1/applications/{application_id}/reminders"),
        &owner,
        None,
    )
    .await;
    assert_eq!(
        read_json_body(reminders).await["reminders"]
            .as_array()
            .map(Vec::len),
        Some(1)
    );
}
