//! Cross-Site Request Forgery (CSRF) protection middleware.
//!
//! State-changing requests must carry an `X-CSRF-Token` header holding a
//! signed token from `GET /csrf-token`. Tokens are stateless: the server
//! stores nothing, validity comes from the HMAC signature and the expiry
//! claim, so the check works identically across restarts and replicas.
//! The middleware is active only when `auth.csrf_enabled` is set; bearer-only
//! API clients don't need it.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::auth::verify_csrf_token;
use crate::config::AppConfig;

const CSRF_HEADER: &str = "X-CSRF-Token";

pub async fn csrf_protection_middleware(
    State(cfg): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    if !cfg.auth.csrf_enabled {
        return next.run(req).await;
    }

    // Only check CSRF for state-changing methods
    let method = req.method();
    if matches!(method, &Method::POST | &Method::PUT | &Method::DELETE | &Method::PATCH)
        && !has_valid_csrf_token(req.headers(), &cfg.auth.jwt_secret)
    {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "message": "CSRF token validation failed",
                "status": 403,
            })),
        )
            .into_response();
    }

    next.run(req).await
}

fn has_valid_csrf_token(headers: &HeaderMap, secret: &str) -> bool {
    headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|token| verify_csrf_token(token, secret))
        .unwrap_or(false)
}
