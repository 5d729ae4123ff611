//! Credential hashing and token issuance.
//!
//! Passwords are hashed with Argon2id; bearer tokens and CSRF tokens are
//! HS256 JWTs signed with the configured secret. CSRF tokens are stateless:
//! nothing is stored server-side, validity comes from the signature and the
//! expiry claim.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a CSRF token. Kept separate from `Claims` so that a
/// CSRF token can never pass as a bearer token or vice versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfClaims {
    pub purpose: String,
    pub exp: i64,
}

const CSRF_PURPOSE: &str = "csrf";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

pub fn issue_token(user_id: Uuid, secret: &str, ttl_hours: i64) -> AppResult<String> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(ttl_hours)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token signing failed: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized("Not authorized, token failed".to_string()))
}

pub fn issue_csrf_token(secret: &str, ttl_minutes: i64) -> AppResult<String> {
    let claims = CsrfClaims {
        purpose: CSRF_PURPOSE.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::minutes(ttl_minutes)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("csrf token signing failed: {}", e)))
}

pub fn verify_csrf_token(token: &str, secret: &str) -> bool {
    decode::<CsrfClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims.purpose == CSRF_PURPOSE)
        .unwrap_or(false)
}

/// Remaining whole hours until `ends_at` (RFC 3339), rounded up, at least 1
/// while the deadline is still in the future.
pub fn remaining_hours(ends_at: &str) -> Option<i64> {
    let ends = chrono::DateTime::parse_from_rfc3339(ends_at).ok()?;
    let secs = (ends.with_timezone(&chrono::Utc) - chrono::Utc::now()).num_seconds();
    if secs <= 0 {
        return None;
    }
    Some((secs + 3599) / 3600)
}
