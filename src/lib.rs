//! Antwortwald - a community Q&A backend.
//!
//! Users register and log in with email and password, post questions and
//! answers, vote on both (one toggling vote per user and entity), and
//! question owners accept at most one answer. Administrators moderate
//! accounts: timed suspension, per-user IP restriction and full deletion.
//! Storage is SQLite via sqlx; authentication is stateless HS256 bearer
//! tokens.

use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;
pub mod vote;

#[cfg(test)]
mod tests;

use state::AppState;

/// Builds the full application router with all middleware layers applied.
pub fn build_router(state: AppState) -> Router {
    let cfg_arc = state.config.clone();

    Router::new()
        .route("/healthz", get(routes::health::healthz))
        .route("/readyz", get(routes::health::readyz))
        .route("/metrics", get(routes::health::metrics))
        .route("/metrics/prometheus", get(routes::health::metrics_prometheus))
        .route("/version", get(routes::health::version))
        .route("/csrf-token", get(routes::users::csrf_token))
        .route("/users", post(routes::users::register).get(routes::admin::list_users))
        .route("/users/login", post(routes::users::login))
        .route(
            "/users/profile",
            get(routes::users::get_profile)
                .put(routes::users::update_profile)
                .delete(routes::users::delete_profile),
        )
        .route("/users/dashboard", get(routes::admin::dashboard))
        .route("/users/{id}", axum::routing::delete(routes::admin::delete_user))
        .route("/users/{id}/suspend", put(routes::admin::suspend_user))
        .route("/users/{id}/unsuspend", put(routes::admin::unsuspend_user))
        .route("/users/{id}/restrict-ip", put(routes::admin::restrict_ip))
        .route("/users/{id}/unrestrict-ip", put(routes::admin::unrestrict_ip))
        .route(
            "/questions",
            get(routes::questions::list_questions).post(routes::questions::create_question),
        )
        .route(
            "/questions/{id}",
            get(routes::questions::get_question)
                .put(routes::questions::update_question)
                .delete(routes::questions::delete_question),
        )
        .route("/questions/{id}/vote", put(routes::questions::vote_question))
        .route(
            "/questions/{id}/answers",
            post(routes::answers::create_answer).get(routes::answers::list_answers),
        )
        .route(
            "/answers/{id}",
            get(routes::answers::get_answer)
                .put(routes::answers::update_answer)
                .delete(routes::answers::delete_answer),
        )
        .route("/answers/{id}/accept", put(routes::answers::accept_answer))
        .route("/answers/{id}/vote", put(routes::answers::vote_answer))
        .with_state(state)
        // Global body limit (1 MB); JSON payloads here are small
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(from_fn(middleware::validation::validate_request_middleware))
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(
            cfg_arc.clone(),
            middleware::security_headers::security_headers_middleware,
        ))
        .layer(from_fn_with_state(cfg_arc, middleware::csrf::csrf_protection_middleware))
}
