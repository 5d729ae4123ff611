//! Moderation endpoints. All of them require an [`AdminUser`] caller.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use sqlx::Row;
use std::collections::HashMap;
use std::net::IpAddr;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, OptionExt},
    middleware::auth::{fetch_user_by_id, AdminUser, DEFAULT_SUSPENSION_REASON},
    routes::users::delete_user_cascade,
    state::AppState,
    types::{
        AdminUserDto, DashboardStats, RestrictIpRequest, RestrictedIpDto, SuspendRequest,
        UnrestrictIpRequest, UserDto,
    },
};
use crate::error::parse_entity_id;
use crate::types::User;

/// GET /users (admin) - every account, newest first, with restriction details.
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<impl IntoResponse> {
    let rows = sqlx::query(
        "SELECT id, username, email, is_admin, is_suspended, suspension_ends_at,
                suspension_reason, last_login_ip, created_at
         FROM users ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    // One query for all restrictions, grouped in memory
    let restriction_rows =
        sqlx::query("SELECT user_id, ip, reason, restricted_at FROM restricted_ips")
            .fetch_all(&state.db)
            .await?;
    let mut restrictions: HashMap<String, Vec<RestrictedIpDto>> = HashMap::new();
    for r in &restriction_rows {
        restrictions.entry(r.get::<String, _>("user_id")).or_default().push(RestrictedIpDto {
            ip: r.get::<String, _>("ip"),
            reason: r.get::<String, _>("reason"),
            restricted_at: r.get::<String, _>("restricted_at"),
        });
    }

    let mut users = Vec::with_capacity(rows.len());
    for r in &rows {
        let raw_id = r.get::<String, _>("id");
        let id = Uuid::parse_str(&raw_id)
            .map_err(|e| AppError::Database(format!("invalid user id in database: {}", e)))?;
        users.push(AdminUserDto {
            id,
            username: r.get::<String, _>("username"),
            email: r.get::<String, _>("email"),
            is_admin: r.get::<i64, _>("is_admin") != 0,
            is_suspended: r.get::<i64, _>("is_suspended") != 0,
            suspension_ends_at: r.get::<Option<String>, _>("suspension_ends_at"),
            suspension_reason: r.get::<Option<String>, _>("suspension_reason"),
            last_login_ip: r.get::<Option<String>, _>("last_login_ip"),
            restricted_ips: restrictions.remove(&raw_id).unwrap_or_default(),
            created_at: r.get::<String, _>("created_at"),
        });
    }

    Ok(Json(users))
}

/// GET /users/dashboard (admin) - aggregate counts plus the five newest accounts.
pub async fn dashboard(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<impl IntoResponse> {
    let counts = sqlx::query(
        "SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM questions) AS total_questions,
            (SELECT COUNT(*) FROM answers) AS total_answers,
            (SELECT COUNT(*) FROM users WHERE is_admin = 1) AS admin_users,
            (SELECT COUNT(*) FROM users WHERE is_suspended = 1) AS suspended_users",
    )
    .fetch_one(&state.db)
    .await?;

    let recent = sqlx::query(
        "SELECT id, username, email, is_admin, created_at
         FROM users ORDER BY created_at DESC LIMIT 5",
    )
    .fetch_all(&state.db)
    .await?;
    let mut recent_users = Vec::with_capacity(recent.len());
    for r in &recent {
        let id = Uuid::parse_str(r.get::<String, _>("id").as_str())
            .map_err(|e| AppError::Database(format!("invalid user id in database: {}", e)))?;
        recent_users.push(UserDto {
            id,
            username: r.get::<String, _>("username"),
            email: r.get::<String, _>("email"),
            is_admin: r.get::<i64, _>("is_admin") != 0,
            created_at: r.get::<String, _>("created_at"),
        });
    }

    let total_users: i64 = counts.get("total_users");
    let admin_users: i64 = counts.get("admin_users");
    Ok(Json(DashboardStats {
        total_users,
        total_questions: counts.get("total_questions"),
        total_answers: counts.get("total_answers"),
        admin_users,
        regular_users: total_users - admin_users,
        suspended_users: counts.get("suspended_users"),
        recent_users,
    }))
}

async fn target_user(state: &AppState, raw_id: &str) -> AppResult<User> {
    let id = parse_entity_id(raw_id, "User")?;
    fetch_user_by_id(&state.db, id).await?.ok_or_not_found("User")
}

/// DELETE /users/{id} (admin) - remove an account and all of its content.
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let target = target_user(&state, &id).await?;
    if target.id == admin.id {
        return Err(AppError::BadRequest(
            "Admin cannot delete their own account through this endpoint".to_string(),
        ));
    }

    delete_user_cascade(&state.db, target.id).await?;
    tracing::info!("admin {} deleted user {}", admin.id, target.id);
    Ok(Json(serde_json::json!({
        "message": "User and all associated data deleted successfully"
    })))
}

/// PUT /users/{id}/suspend (admin) - timed suspension with optional reason.
pub async fn suspend_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<SuspendRequest>,
) -> AppResult<impl IntoResponse> {
    let duration = match req.duration {
        Some(d) if d > 0 => d,
        _ => {
            return Err(AppError::ValidationError {
                field: "duration".to_string(),
                message: "Please provide a valid suspension duration in hours".to_string(),
            })
        }
    };

    let target = target_user(&state, &id).await?;
    if target.is_admin {
        return Err(AppError::BadRequest("Admin users cannot be suspended".to_string()));
    }

    let ends_at = (Utc::now() + Duration::hours(duration)).to_rfc3339();
    let reason =
        req.reason.filter(|r| !r.trim().is_empty()).unwrap_or_else(|| DEFAULT_SUSPENSION_REASON.to_string());

    sqlx::query(
        "UPDATE users SET is_suspended = 1, suspension_ends_at = ?1, suspension_reason = ?2
         WHERE id = ?3",
    )
    .bind(&ends_at)
    .bind(&reason)
    .bind(target.id.to_string())
    .execute(&state.db)
    .await?;

    tracing::info!("admin {} suspended user {} for {}h: {}", admin.id, target.id, duration, reason);
    Ok(Json(serde_json::json!({
        "message": format!("User suspended for {} hours", duration),
        "suspension_ends_at": ends_at,
    })))
}

/// PUT /users/{id}/unsuspend (admin)
pub async fn unsuspend_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let target = target_user(&state, &id).await?;
    if !target.is_suspended {
        return Err(AppError::BadRequest("User is not suspended".to_string()));
    }

    crate::middleware::auth::clear_suspension(&state.db, target.id).await?;
    tracing::info!("admin {} lifted suspension of user {}", admin.id, target.id);
    Ok(Json(serde_json::json!({ "message": "User unsuspended successfully" })))
}

/// PUT /users/{id}/restrict-ip (admin) - block a specific address for a user.
pub async fn restrict_ip(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<RestrictIpRequest>,
) -> AppResult<impl IntoResponse> {
    let ip: IpAddr = req
        .ip
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid IP address".to_string()))?;

    let target = target_user(&state, &id).await?;
    if target.is_admin {
        return Err(AppError::BadRequest(
            "Cannot restrict IP addresses for admin users".to_string(),
        ));
    }

    let already = sqlx::query("SELECT 1 AS hit FROM restricted_ips WHERE user_id = ?1 AND ip = ?2")
        .bind(target.id.to_string())
        .bind(ip.to_string())
        .fetch_optional(&state.db)
        .await?;
    if already.is_some() {
        return Err(AppError::BadRequest(
            "IP address is already restricted for this user".to_string(),
        ));
    }

    let reason = req
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "Suspicious activity".to_string());
    sqlx::query("INSERT INTO restricted_ips (user_id, ip, reason) VALUES (?1, ?2, ?3)")
        .bind(target.id.to_string())
        .bind(ip.to_string())
        .bind(&reason)
        .execute(&state.db)
        .await?;

    tracing::info!("admin {} restricted ip {} for user {}", admin.id, ip, target.id);
    Ok(Json(serde_json::json!({ "message": "IP address restricted successfully" })))
}

/// PUT /users/{id}/unrestrict-ip (admin)
pub async fn unrestrict_ip(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UnrestrictIpRequest>,
) -> AppResult<impl IntoResponse> {
    let target = target_user(&state, &id).await?;

    let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM restricted_ips WHERE user_id = ?1")
        .bind(target.id.to_string())
        .fetch_one(&state.db)
        .await?
        .get("n");
    if count == 0 {
        return Err(AppError::BadRequest("User has no restricted IP addresses".to_string()));
    }

    let removed = sqlx::query("DELETE FROM restricted_ips WHERE user_id = ?1 AND ip = ?2")
        .bind(target.id.to_string())
        .bind(req.ip.trim())
        .execute(&state.db)
        .await?;
    if removed.rows_affected() == 0 {
        return Err(AppError::BadRequest(
            "IP address is not restricted for this user".to_string(),
        ));
    }

    tracing::info!("admin {} unrestricted ip {} for user {}", admin.id, req.ip, target.id);
    Ok(Json(serde_json::json!({ "message": "IP restriction removed successfully" })))
}
