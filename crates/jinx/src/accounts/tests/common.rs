use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::accounts::service::{AuthService, ProfileService, RegisterInput};
use crate::accounts::token::TokenManager;
use crate::config::{AuthConfig, RitualConfig};
use crate::feed::service::PostService;
use crate::http::ApiState;
use crate::storage::memory::MemoryStore;
use crate::storage::Repositories;

pub(super) struct Harness {
    pub(super) repos: Repositories,
    pub(super) tokens: Arc<TokenManager>,
    pub(super) auth: AuthService,
    pub(super) profiles: ProfileService,
    pub(super) posts: Arc<PostService>,
}

pub(super) fn harness() -> Harness {
    let repos = Repositories::from_store(Arc::new(MemoryStore::seeded()));
    let tokens = Arc::new(TokenManager::new(&AuthConfig::development()));
    let posts = Arc::new(PostService::new(
        repos.posts.clone(),
        repos.users.clone(),
        repos.curse_styles.clone(),
    ));

    Harness {
        auth: AuthService::new(
            repos.users.clone(),
            repos.curse_styles.clone(),
            tokens.clone(),
        ),
        profiles: ProfileService::new(
            repos.users.clone(),
            repos.curse_styles.clone(),
            posts.clone(),
        ),
        repos,
        tokens,
        posts,
    }
}

pub(super) fn register_input(email: &str) -> RegisterInput {
    RegisterInput {
        email: email.to_string(),
        username: "Kaori".to_string(),
        password: "correct horse".to_string(),
        age: 22,
        gender: "female".to_string(),
        curse_style: "infernal".to_string(),
    }
}

pub(super) fn api_state() -> ApiState {
    ApiState::new(
        Repositories::in_memory(),
        &AuthConfig::development(),
        RitualConfig::default(),
    )
}

pub(super) fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub(super) fn authorized(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
