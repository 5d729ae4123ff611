use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

// Health check endpoint - lightweight, no rate limiting
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness probe: checks DB connectivity with timeout protection
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let query = sqlx::query("SELECT 1").fetch_one(&state.db);
    match tokio::time::timeout(std::time::Duration::from_secs(5), query).await {
        Ok(Ok(_)) => (StatusCode::OK, "ready").into_response(),
        Ok(Err(e)) => (StatusCode::SERVICE_UNAVAILABLE, format!("not ready: {}", e)).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

// Metrics endpoint: returns JSON snapshot
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.metrics.get_snapshot();
    Json(snapshot)
}

// Prometheus-compatible text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let body = format!(
        "# HELP antwortwald_users_registered Total users registered\n# TYPE antwortwald_users_registered counter\nantwortwald_users_registered {}\n\
# HELP antwortwald_logins_succeeded Total successful logins\n# TYPE antwortwald_logins_succeeded counter\nantwortwald_logins_succeeded {}\n\
# HELP antwortwald_logins_rejected Total rejected logins\n# TYPE antwortwald_logins_rejected counter\nantwortwald_logins_rejected {}\n\
# HELP antwortwald_questions_created Questions created\n# TYPE antwortwald_questions_created counter\nantwortwald_questions_created {}\n\
# HELP antwortwald_answers_created Answers created\n# TYPE antwortwald_answers_created counter\nantwortwald_answers_created {}\n\
# HELP antwortwald_votes_cast Votes cast\n# TYPE antwortwald_votes_cast counter\nantwortwald_votes_cast {}\n\
# HELP antwortwald_answers_accepted Accept toggles\n# TYPE antwortwald_answers_accepted counter\nantwortwald_answers_accepted {}\n\
# HELP antwortwald_uptime_seconds Uptime seconds\n# TYPE antwortwald_uptime_seconds gauge\nantwortwald_uptime_seconds {}\n",
        m.users_registered,
        m.logins_succeeded,
        m.logins_rejected,
        m.questions_created,
        m.answers_created,
        m.votes_cast,
        m.answers_accepted,
        m.uptime_seconds,
    );
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

// Version/Build info endpoint (JSON)
pub async fn version() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
