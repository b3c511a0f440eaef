//! Common test utilities
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::util::ServiceExt;

use virtual_bank::{build_router, AppState, MemoryStore, RouterOptions};

/// Router over a fresh in-memory store, debug routes enabled
pub fn memory_app() -> (Router, MemoryStore) {
    let store = MemoryStore::new();
    let app = build_router(AppState::new(store.clone()), &RouterOptions::default());
    (app, store)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Send one request; non-JSON bodies come back as a JSON string
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Register a customer named after `username` and return its id
pub async fn register(app: &Router, username: &str, first: &str, last: &str) -> i64 {
    let response = send(
        app,
        "POST",
        "/api/customers/register",
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret",
            "firstName": first,
            "lastName": last
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body["id"].as_i64().unwrap()
}

/// Connect to `DATABASE_URL` and make sure the schema exists
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    virtual_bank::db::apply_schema(&pool)
        .await
        .expect("Failed to apply schema");

    pool
}

/// Suffix that keeps usernames unique across runs against a shared database
pub fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}
