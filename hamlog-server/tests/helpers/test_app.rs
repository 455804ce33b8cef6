//! Router and request helpers

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use hamlog_server::services::{CompletionModel, DirectoryApi};
use hamlog_server::{build_router, AppState};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;

use super::fakes::FakeDirectory;

/// In-memory database with the full schema
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    hamlog_common::db::init_schema(&pool).await.unwrap();
    pool
}

/// Router over an in-memory database with rate limiting off
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_upstreams(Arc::new(FakeDirectory::default()), None).await
    }

    pub async fn with_upstreams(
        directory: Arc<dyn DirectoryApi>,
        model: Option<Arc<dyn CompletionModel>>,
    ) -> Self {
        let pool = test_pool().await;
        let state = AppState::new(pool.clone(), directory, model).with_rate_limit(0);
        Self {
            router: build_router(state),
            pool,
        }
    }

    pub fn from_state(state: AppState) -> Self {
        Self {
            pool: state.db.clone(),
            router: build_router(state),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, extract_json(response.into_body()).await)
    }

    pub async fn send_raw(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Collect a body as JSON; empty or non-JSON bodies become `Value::Null`
pub async fn extract_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn bearer(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Register `email` with a fixed password and return a bearer token
pub async fn register_and_login(app: &TestApp, email: &str) -> String {
    let (status, _) = app
        .send(json_request(
            "POST",
            "/auth/register",
            None,
            serde_json::json!({"email": email, "password": "hamradio1"}),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let form = format!("username={}&password=hamradio1", email.replace('@', "%40"));
    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");

    body["access_token"].as_str().unwrap().to_string()
}
