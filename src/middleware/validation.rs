use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, AppResult};

/// Request hygiene applied in front of all routes: rejects path traversal in
/// the URI and oversized declared bodies before they are read, and logs
/// suspicious user agents.
pub async fn validate_request_middleware(req: Request, next: Next) -> Response {
    let uri_path = req.uri().path();
    if contains_path_traversal(uri_path) {
        return AppError::BadRequest("Path traversal detected in request".to_string()).into_response();
    }

    if let Some(user_agent) = req.headers().get("user-agent") {
        if let Ok(ua_str) = user_agent.to_str() {
            if is_suspicious_user_agent(ua_str) {
                tracing::warn!("Suspicious user agent detected: {}", ua_str);
            }
        }
    }

    // Early rejection based on Content-Length; redundant with DefaultBodyLimit
    // but avoids reading bodies that are known to be too large.
    if matches!(req.method(), &axum::http::Method::POST | &axum::http::Method::PUT) {
        if let Some(length) = req
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<usize>().ok())
        {
            let max_body_size = std::env::var("ANTWORTWALD_MAX_BODY_SIZE")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1024 * 1024)
                .clamp(64 * 1024, 10 * 1024 * 1024);
            if length > max_body_size {
                return AppError::BadRequest(format!(
                    "Request body exceeds maximum size of {} bytes",
                    max_body_size
                ))
                .into_response();
            }
        }
    }

    next.run(req).await
}

fn contains_path_traversal(path: &str) -> bool {
    let lower = path.to_lowercase();

    if path.contains("/..") || path.contains("\\..") || path.starts_with("..") {
        return true;
    }
    if path.contains("/./") || path.contains("\\.\\") {
        return true;
    }
    if path.contains("....") {
        return true;
    }

    // URL-encoded variants (single and double encoding)
    let encoded_patterns =
        ["%2e%2e", "%252e%252e", "%2e/", "%252e%2f", "/%2e", "%2f%2e", "%5c%2e", "%00"];
    for pattern in &encoded_patterns {
        if lower.contains(pattern) {
            return true;
        }
    }

    path.contains('\0')
}

fn is_suspicious_user_agent(ua: &str) -> bool {
    let ua_lower = ua.to_lowercase();
    ua_lower.contains("scanner")
        || (ua_lower.contains("crawler") && !ua_lower.contains("googlebot") && !ua_lower.contains("bingbot"))
        || ua_lower.contains("nikto")
        || ua_lower.contains("sqlmap")
        || ua_lower.contains("havij")
        || ua_lower.contains("acunetix")
}

/// Rejects empty or whitespace-only required fields.
pub fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError {
            field: field.to_string(),
            message: format!("Please provide a {}", field),
        });
    }
    Ok(())
}

pub fn validate_username(username: &str) -> AppResult<()> {
    require_non_empty("username", username)?;
    if username.len() > 64 {
        return Err(AppError::ValidationError {
            field: "username".to_string(),
            message: "Username must be at most 64 characters".to_string(),
        });
    }
    Ok(())
}

/// Minimal shape check; real validation happens when mail is actually sent.
pub fn validate_email(email: &str) -> AppResult<()> {
    require_non_empty("email", email)?;
    let valid = email.len() <= 254
        && email.split_once('@').map(|(local, domain)| !local.is_empty() && domain.contains('.')).unwrap_or(false);
    if !valid {
        return Err(AppError::ValidationError {
            field: "email".to_string(),
            message: "Please provide a valid email address".to_string(),
        });
    }
    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 8 {
        return Err(AppError::ValidationError {
            field: "password".to_string(),
            message: "Password must be at least 8 characters".to_string(),
        });
    }
    Ok(())
}

/// Tags are free text; more than five is tolerated but logged, the limit is
/// a recommendation and not server-enforced.
pub fn normalize_tags(tags: Option<Vec<String>>) -> Vec<String> {
    let tags: Vec<String> = tags
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.len() > 5 {
        tracing::debug!("question carries {} tags (recommended maximum is 5)", tags.len());
    }
    tags
}
