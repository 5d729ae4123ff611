use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::vote::VoteKind;

/// A full user row as stored. Never serialized to clients directly; the
/// password hash stays inside the crate.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub is_suspended: bool,
    pub suspension_ends_at: Option<String>,
    pub suspension_reason: Option<String>,
    pub last_login_ip: Option<String>,
    pub created_at: String,
}

impl User {
    pub fn is_owner_of(&self, owner_id: Uuid) -> bool {
        self.id == owner_id
    }
}

/// The public shape of a user, returned from registration, login and the
/// profile endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<&User> for UserDto {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            is_admin: u.is_admin,
            created_at: u.created_at.clone(),
        }
    }
}

/// Admin view of a user: everything except the credential hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub is_suspended: bool,
    pub suspension_ends_at: Option<String>,
    pub suspension_reason: Option<String>,
    pub last_login_ip: Option<String>,
    pub restricted_ips: Vec<RestrictedIpDto>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictedIpDto {
    pub ip: String,
    pub reason: String,
    pub restricted_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserDto,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuspendRequest {
    /// Suspension duration in hours; required and positive.
    pub duration: Option<i64>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestrictIpRequest {
    pub ip: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnrestrictIpRequest {
    pub ip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_questions: i64,
    pub total_answers: i64,
    pub admin_users: i64,
    pub regular_users: i64,
    pub suspended_users: i64,
    pub recent_users: Vec<UserDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestionRequest {
    pub title: String,
    pub body: String,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQuestionRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Denormalized read model for a question: owner username and vote counts are
/// resolved at the storage boundary, not via client-side joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub answer_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDetailDto {
    #[serde(flatten)]
    pub question: QuestionDto,
    pub answers: Vec<AnswerDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionListResponse {
    pub questions: Vec<QuestionDto>,
    pub page: u32,
    pub pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAnswerRequest {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAnswerRequest {
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerDto {
    pub id: Uuid,
    pub question_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub body: String,
    pub is_accepted: bool,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteRequest {
    pub vote_type: VoteKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptResponse {
    pub is_accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}
