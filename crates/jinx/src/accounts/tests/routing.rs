use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use super::common::*;
use crate::config::{AuthConfig, RitualConfig};
use crate::http::{api_router, ApiState};

fn registration(email: &str) -> serde_json::Value {
    json!({
        "email": email,
        "username": "Kaori",
        "password": "correct horse",
        "age": "22",
        "gender": "female",
        "curseStyle": "shadow"
    })
}

#[tokio::test]
async fn register_route_accepts_string_age_and_camel_case_style() {
    let router = api_router(api_state());

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            registration("kaori@example.com"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["user"]["age"], 22);
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let router = api_router(api_state());

    let first = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            registration("kaori@example.com"),
        ))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = router
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            registration("kaori@example.com"),
        ))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(read_json_body(second).await["error"], "email already exists");
}

#[tokio::test]
async fn bad_login_is_unauthorized() {
    let router = api_router(api_state());

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            json!({ "email": "ghost@example.com", "password": "whatever123" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        read_json_body(response).await["error"],
        "invalid email or password"
    );
}

#[tokio::test]
async fn curse_style_catalog_is_public() {
    let router = api_router(api_state());

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/curse-styles")
                .body(axum::body::Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["curse_styles"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn profile_requires_an_access_token() {
    let router = api_router(api_state());

    let anonymous = router
        .clone()
        .oneshot(
            axum::http::Request::get("/api/v1/users/me")
                .body(axum::body::Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let registered = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            registration("kaori@example.com"),
        ))
        .await
        .expect("response");
    let body = read_json_body(registered).await;
    let access = body["access_token"].as_str().expect("access token").to_string();
    let refresh = body["refresh_token"].as_str().expect("refresh token").to_string();

    let with_refresh = router
        .clone()
        .oneshot(authorized("GET", "/api/v1/users/me", &refresh, None))
        .await
        .expect("response");
    assert_eq!(with_refresh.status(), StatusCode::UNAUTHORIZED);

    let with_access = router
        .oneshot(authorized("GET", "/api/v1/users/me", &access, None))
        .await
        .expect("response");
    assert_eq!(with_access.status(), StatusCode::OK);
    let profile = read_json_body(with_access).await;
    assert_eq!(profile["curse_style"]["name_en"], "Shadow Whisper");
    assert_eq!(profile["stats"]["posts"], 0);
}

#[tokio::test]
async fn deleted_accounts_are_locked_out_of_protected_routes() {
    let harness = harness();
    let router = api_router(ApiState::new(
        harness.repos.clone(),
        &AuthConfig::development(),
        RitualConfig::default(),
    ));

    let registered = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            registration("kaori@example.com"),
        ))
        .await
        .expect("response");
    let body = read_json_body(registered).await;
    let access = body["access_token"].as_str().expect("access token").to_string();
    let user_id = body["user"]["id"]
        .as_str()
        .and_then(|raw| raw.parse::<Uuid>().ok())
        .expect("user id");

    let mut user = harness
        .repos
        .users
        .find_by_id(user_id)
        .await
        .expect("lookup")
        .expect("user exists");
    user.delete();
    harness.repos.users.update(&user).await.expect("soft delete");

    let post = router
        .oneshot(authorized(
            "POST",
            "/api/v1/posts",
            &access,
            Some(json!({ "content": "Still here after deletion?" })),
        ))
        .await
        .expect("response");
    assert_eq!(post.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json_body(post).await["error"], "invalid or expired token");
}
