//! Shared test harness: a router backed by a temporary SQLite database plus
//! request/response helpers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, SqlitePool};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::state::AppState;

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    _db_file: NamedTempFile,
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

pub async fn setup_test_app_with(adjust: impl FnOnce(&mut AppConfig)) -> TestApp {
    let (pool, db_file) = setup_pool().await;

    let mut config = AppConfig::default();
    config.auth.jwt_secret = "test-secret".to_string();
    adjust(&mut config);

    let state = AppState::new(pool.clone(), config);
    TestApp { router: crate::build_router(state), db: pool, _db_file: db_file }
}

/// A schema-initialized pool on a temporary database file. Single connection
/// so the session PRAGMAs from init_db (foreign_keys in particular) apply to
/// every query.
pub async fn setup_pool() -> (SqlitePool, NamedTempFile) {
    let db_file = NamedTempFile::new().unwrap();
    let db_url = format!("sqlite:{}", db_file.path().display());
    sqlx::Sqlite::create_database(&db_url).await.unwrap();
    let pool = SqlitePoolOptions::new().max_connections(1).connect(&db_url).await.unwrap();
    crate::db::init_db(&pool).await.unwrap();
    (pool, db_file)
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder =
        Request::builder().method(method).uri(uri).header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Runs one request through the router and parses the body as JSON when
/// possible (raw text responses come back as a JSON string).
pub async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

/// Registers a user and returns their bearer token and public profile.
pub async fn register_user(app: &TestApp, username: &str, email: &str) -> (String, Value) {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/users",
            None,
            &json!({ "username": username, "email": email, "password": "password123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);
    (body["token"].as_str().unwrap().to_string(), body["user"].clone())
}

pub async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value) {
    send(app, json_request("POST", "/users/login", None, &json!({ "email": email, "password": password })))
        .await
}

/// Admins are created out of band; there is no self-service promotion.
pub async fn promote_to_admin(app: &TestApp, email: &str) {
    sqlx::query("UPDATE users SET is_admin = 1 WHERE email = ?1")
        .bind(email)
        .execute(&app.db)
        .await
        .unwrap();
}

/// Creates a question as `token` and returns its id.
pub async fn create_question(app: &TestApp, token: &str, title: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/questions",
            Some(token),
            &json!({ "title": title, "body": "some body text", "tags": ["testing"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "question creation failed: {}", body);
    body["id"].as_str().unwrap().to_string()
}

/// Creates an answer as `token` and returns its id.
pub async fn create_answer(app: &TestApp, token: &str, question_id: &str, body_text: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            &format!("/questions/{}/answers", question_id),
            Some(token),
            &json!({ "body": body_text }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "answer creation failed: {}", body);
    body["id"].as_str().unwrap().to_string()
}
