use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use jinx::config::{AuthConfig, RitualConfig};
use jinx::{api_router, ApiState, Repositories};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    api_router(ApiState::new(
        Repositories::in_memory(),
        &AuthConfig::development(),
        RitualConfig::default(),
    ))
}

async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json payload")
    };
    (status, payload)
}

async fn register(router: &Router, email: &str, username: &str, style: &str) -> (String, String) {
    let (status, body) = call(
        router,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "email": email,
            "username": username,
            "password": "hunter2hunter2",
            "age": 27,
            "gender": "male",
            "curse_style": style,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["access_token"].as_str().expect("access token").to_string(),
        body["refresh_token"].as_str().expect("refresh token").to_string(),
    )
}

#[tokio::test]
async fn two_users_trade_curses() {
    let router = app();
    let (alice, _) = register(&router, "alice@example.com", "alice", "blood").await;
    let (bob, _) = register(&router, "bob@example.com", "bob", "danse").await;

    let (status, post) = call(
        &router,
        "POST",
        "/api/v1/posts",
        Some(&alice),
        Some(json!({ "content": "This is a test post." })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["username"], "alice");
    assert_eq!(post["curse_style_name_en"], "Blood Covenant");
    let post_id = post["id"].as_str().expect("post id").to_string();
    let curse_uri = format!("/api/v1/posts/{post_id}/curse");

    let (status, _) = call(&router, "POST", &curse_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&router, "POST", &curse_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already cursed this post");
    let (status, body) = call(&router, "POST", &curse_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "cannot curse your own post");

    let (_, profile) = call(&router, "GET", "/api/v1/users/me", Some(&alice), None).await;
    assert_eq!(profile["stats"]["posts"], 1);
    assert_eq!(profile["stats"]["curses"], 1);
    assert_eq!(profile["curse_style"]["name_en"], "Blood Covenant");

    let (status, _) = call(&router, "DELETE", &curse_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&router, "DELETE", &curse_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, timeline) = call(&router, "GET", "/api/v1/posts", Some(&bob), None).await;
    assert_eq!(timeline[0]["curse_count"], 0);
    assert_eq!(timeline[0]["is_cursed_by_me"], false);
}

#[tokio::test]
async fn anonymous_posts_and_own_post_listing() {
    let router = app();
    let (alice, _) = register(&router, "alice@example.com", "alice", "frozen").await;
    let (bob, _) = register(&router, "bob@example.com", "bob", "shadow").await;

    let (status, _) = call(
        &router,
        "POST",
        "/api/v1/posts",
        Some(&alice),
        Some(json!({ "content": "My manager will never know.", "is_anonymous": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, timeline) = call(&router, "GET", "/api/v1/posts", Some(&bob), None).await;
    assert_eq!(timeline[0]["username"], "匿名");
    assert_eq!(timeline[0]["curse_style_name_en"], "Frozen Curse");

    let (_, mine) = call(&router, "GET", "/api/v1/users/me/posts", Some(&alice), None).await;
    assert_eq!(mine.as_array().map(Vec::len), Some(1));
    let (_, theirs) = call(&router, "GET", "/api/v1/users/me/posts", Some(&bob), None).await;
    assert_eq!(theirs.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn refresh_exchanges_tokens_and_profile_updates() {
    let router = app();
    let (_, refresh) = register(&router, "alice@example.com", "alice", "infernal").await;

    let (status, body) = call(
        &router,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access_token"].as_str().expect("access token").to_string();

    let (status, updated) = call(
        &router,
        "PUT",
        "/api/v1/users/me",
        Some(&access),
        Some(json!({ "username": "alice the bold", "age": "31", "gender": "female" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["username"], "alice the bold");
    assert_eq!(updated["age"], 31);

    let (status, _) = call(
        &router,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": access })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &router,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "ALICE@example.com", "password": "hunter2hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice the bold");
}
