use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    auth::{hash_password, issue_csrf_token, issue_token, verify_password},
    error::{AppError, AppResult},
    middleware::auth::{
        enforce_access_gates, fetch_user_by_email, record_login_ip, CurrentUser,
    },
    middleware::ip::extract_ip_from_headers,
    middleware::validation::{validate_email, validate_password, validate_username},
    state::AppState,
    types::{AuthResponse, CsrfTokenResponse, LoginRequest, RegisterRequest, UpdateProfileRequest, UserDto},
};

/// POST /users - register a new account. Public.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let ip = extract_ip_from_headers(&headers, None);
    state.rate_limiter.check_endpoint_limit("/users", ip).await?;

    validate_username(&req.username)?;
    validate_email(&req.email)?;
    validate_password(&req.password)?;

    let exists = sqlx::query("SELECT 1 AS hit FROM users WHERE email = ?1 OR username = ?2")
        .bind(&req.email)
        .bind(&req.username)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("User already exists".to_string()));
    }

    let id = Uuid::new_v4();
    let password_hash = hash_password(&req.password)?;
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(id.to_string())
    .bind(&req.username)
    .bind(&req.email)
    .bind(&password_hash)
    .execute(&state.db)
    .await?;

    record_login_ip(&state.db, id, ip).await?;
    state.metrics.inc_users_registered();
    tracing::info!("registered user {} ({})", req.username, id);

    let user = crate::middleware::auth::fetch_user_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::Database("freshly created user missing".to_string()))?;
    let token = issue_token(id, &state.config.auth.jwt_secret, state.config.auth.token_ttl_hours)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { user: UserDto::from(&user), token })))
}

/// POST /users/login - authenticate and obtain a bearer token. Public.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let ip = extract_ip_from_headers(&headers, None);
    state.rate_limiter.check_endpoint_limit("/users/login", ip).await?;

    let user = fetch_user_by_email(&state.db, &req.email).await?;
    let user = match user {
        Some(u) if verify_password(&req.password, &u.password_hash) => u,
        _ => {
            state.metrics.inc_logins_rejected();
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        }
    };

    // Suspension and IP-restriction gates, with lazy suspension expiry
    let user = match enforce_access_gates(&state.db, user, ip).await {
        Ok(u) => u,
        Err(e) => {
            state.metrics.inc_logins_rejected();
            return Err(e);
        }
    };

    // Every successful login lands in the IP history
    record_login_ip(&state.db, user.id, ip).await?;
    state.metrics.inc_logins_succeeded();

    let token = issue_token(user.id, &state.config.auth.jwt_secret, state.config.auth.token_ttl_hours)?;
    Ok(Json(AuthResponse { user: UserDto::from(&user), token }))
}

/// GET /csrf-token - issue a stateless signed CSRF token. Public.
pub async fn csrf_token(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let token = issue_csrf_token(&state.config.auth.jwt_secret, state.config.auth.csrf_ttl_minutes)?;
    Ok(Json(CsrfTokenResponse { csrf_token: token }))
}

/// GET /users/profile
pub async fn get_profile(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(UserDto::from(&user))
}

/// PUT /users/profile - edit username/email; password changes require the
/// current password. Returns a fresh token alongside the updated profile.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    let username = match req.username {
        Some(u) => {
            validate_username(&u)?;
            u
        }
        None => user.username.clone(),
    };
    let email = match req.email {
        Some(e) => {
            validate_email(&e)?;
            e
        }
        None => user.email.clone(),
    };

    if username != user.username || email != user.email {
        let taken = sqlx::query(
            "SELECT 1 AS hit FROM users WHERE (email = ?1 OR username = ?2) AND id != ?3",
        )
        .bind(&email)
        .bind(&username)
        .bind(user.id.to_string())
        .fetch_optional(&state.db)
        .await?;
        if taken.is_some() {
            return Err(AppError::BadRequest("User already exists".to_string()));
        }
    }

    let mut password_hash = user.password_hash.clone();
    if let Some(new_password) = req.new_password {
        let current = req.current_password.unwrap_or_default();
        if !verify_password(&current, &user.password_hash) {
            return Err(AppError::BadRequest("Current password is incorrect".to_string()));
        }
        validate_password(&new_password)?;
        password_hash = hash_password(&new_password)?;
    }

    sqlx::query("UPDATE users SET username = ?1, email = ?2, password_hash = ?3 WHERE id = ?4")
        .bind(&username)
        .bind(&email)
        .bind(&password_hash)
        .bind(user.id.to_string())
        .execute(&state.db)
        .await?;

    let updated = crate::middleware::auth::fetch_user_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let token = issue_token(user.id, &state.config.auth.jwt_secret, state.config.auth.token_ttl_hours)?;

    Ok(Json(AuthResponse { user: UserDto::from(&updated), token }))
}

/// DELETE /users/profile - self-deletion with full cascade.
pub async fn delete_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    delete_user_cascade(&state.db, user.id).await?;
    tracing::info!("user {} deleted their account", user.id);
    Ok(Json(serde_json::json!({
        "message": "User and all associated data deleted successfully"
    })))
}

/// Removes a user and everything they own in one transaction: answers they
/// wrote, answers under their questions, their questions, their votes, then
/// the user row. IP history and restrictions fall away via FK cascade.
pub(crate) async fn delete_user_cascade(db: &SqlitePool, user_id: Uuid) -> AppResult<()> {
    let uid = user_id.to_string();
    let mut tx = db.begin().await?;

    sqlx::query(
        "DELETE FROM answers
         WHERE user_id = ?1 OR question_id IN (SELECT id FROM questions WHERE user_id = ?1)",
    )
    .bind(&uid)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM questions WHERE user_id = ?1").bind(&uid).execute(&mut *tx).await?;
    sqlx::query("DELETE FROM question_votes WHERE user_id = ?1").bind(&uid).execute(&mut *tx).await?;
    sqlx::query("DELETE FROM answer_votes WHERE user_id = ?1").bind(&uid).execute(&mut *tx).await?;
    sqlx::query("DELETE FROM users WHERE id = ?1").bind(&uid).execute(&mut *tx).await?;

    tx.commit().await?;
    Ok(())
}
