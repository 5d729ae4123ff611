//! Bearer authentication and the per-request access gate.
//!
//! Every authenticated request goes through the same sequence as login:
//! token verification, user lookup, lazy suspension expiry, the suspension
//! and IP-restriction gates (admins are exempt from both), and IP bookkeeping.
//! Handlers receive the result as a [`CurrentUser`] or [`AdminUser`]
//! extractor argument.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::net::IpAddr;
use uuid::Uuid;

use crate::auth::{remaining_hours, verify_token};
use crate::error::{AppError, AppResult};
use crate::middleware::ip::client_ip;
use crate::state::AppState;
use crate::types::User;

pub const DEFAULT_SUSPENSION_REASON: &str = "Violation of community guidelines";

/// The authenticated caller. Rejects with 401 on missing/invalid tokens and
/// 403 on suspension or IP restriction.
pub struct CurrentUser(pub User);

/// The authenticated caller, additionally required to be an administrator.
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;
        let claims = verify_token(&token, &state.config.auth.jwt_secret)?;

        let user = fetch_user_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        let ip = client_ip(parts);
        let user = enforce_access_gates(&state.db, user, ip).await?;
        record_seen_ip_if_changed(&state.db, &user, ip).await?;

        Ok(CurrentUser(user))
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden("Not authorized as an admin".to_string()));
        }
        Ok(AdminUser(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Applies the suspension and IP-restriction gates to a freshly loaded user.
/// Expired suspensions are cleared here (lazy expiry, there is no sweep).
/// Admin accounts pass both gates unconditionally.
pub async fn enforce_access_gates(db: &SqlitePool, mut user: User, ip: IpAddr) -> AppResult<User> {
    if user.is_admin {
        return Ok(user);
    }

    if user.is_suspended {
        match user.suspension_ends_at.as_deref().and_then(remaining_hours) {
            Some(hours) => {
                let reason = user
                    .suspension_reason
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SUSPENSION_REASON.to_string());
                return Err(AppError::Forbidden(format!(
                    "Your account is suspended: {}. Suspension ends in approximately {} hours.",
                    reason, hours
                )));
            }
            None => {
                clear_suspension(db, user.id).await?;
                user.is_suspended = false;
                user.suspension_ends_at = None;
                user.suspension_reason = None;
            }
        }
    }

    if is_ip_restricted(db, user.id, ip).await? {
        return Err(AppError::Forbidden(
            "Access from your current location is restricted. Please contact support.".to_string(),
        ));
    }

    Ok(user)
}

pub async fn clear_suspension(db: &SqlitePool, user_id: Uuid) -> AppResult<()> {
    sqlx::query(
        "UPDATE users SET is_suspended = 0, suspension_ends_at = NULL, suspension_reason = NULL
         WHERE id = ?1",
    )
    .bind(user_id.to_string())
    .execute(db)
    .await?;
    Ok(())
}

pub async fn is_ip_restricted(db: &SqlitePool, user_id: Uuid, ip: IpAddr) -> AppResult<bool> {
    let row = sqlx::query("SELECT 1 AS hit FROM restricted_ips WHERE user_id = ?1 AND ip = ?2")
        .bind(user_id.to_string())
        .bind(ip.to_string())
        .fetch_optional(db)
        .await?;
    Ok(row.is_some())
}

/// Appends to the login-IP history and updates the last seen address, but
/// only when the address actually changed. Login records unconditionally via
/// [`record_login_ip`].
pub async fn record_seen_ip_if_changed(db: &SqlitePool, user: &User, ip: IpAddr) -> AppResult<()> {
    if user.last_login_ip.as_deref() == Some(ip.to_string().as_str()) {
        return Ok(());
    }
    record_login_ip(db, user.id, ip).await
}

pub async fn record_login_ip(db: &SqlitePool, user_id: Uuid, ip: IpAddr) -> AppResult<()> {
    let mut tx = db.begin().await?;
    sqlx::query("UPDATE users SET last_login_ip = ?1 WHERE id = ?2")
        .bind(ip.to_string())
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO ip_history (user_id, ip) VALUES (?1, ?2)")
        .bind(user_id.to_string())
        .bind(ip.to_string())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub fn user_from_row(r: &SqliteRow) -> AppResult<User> {
    let id = Uuid::parse_str(r.get::<String, _>("id").as_str())
        .map_err(|e| AppError::Database(format!("invalid user id in database: {}", e)))?;
    Ok(User {
        id,
        username: r.get::<String, _>("username"),
        email: r.get::<String, _>("email"),
        password_hash: r.get::<String, _>("password_hash"),
        is_admin: r.get::<i64, _>("is_admin") != 0,
        is_suspended: r.get::<i64, _>("is_suspended") != 0,
        suspension_ends_at: r.get::<Option<String>, _>("suspension_ends_at"),
        suspension_reason: r.get::<Option<String>, _>("suspension_reason"),
        last_login_ip: r.get::<Option<String>, _>("last_login_ip"),
        created_at: r.get::<String, _>("created_at"),
    })
}

const USER_COLUMNS: &str = "id, username, email, password_hash, is_admin, is_suspended, \
                            suspension_ends_at, suspension_reason, last_login_ip, created_at";

pub async fn fetch_user_by_id(db: &SqlitePool, id: Uuid) -> AppResult<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;
    row.map(|r| user_from_row(&r)).transpose()
}

pub async fn fetch_user_by_email(db: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS))
        .bind(email)
        .fetch_optional(db)
        .await?;
    row.map(|r| user_from_row(&r)).transpose()
}

/// The ownership guard shared by every mutating handler: the resource owner
/// and administrators pass, everyone else is rejected.
pub fn ensure_owner_or_admin(owner_id: Uuid, caller: &User) -> AppResult<()> {
    if caller.is_owner_of(owner_id) || caller.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("User not authorized".to_string()))
    }
}
