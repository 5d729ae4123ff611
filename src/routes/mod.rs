//! HTTP route handlers for the Antwortwald API.
//!
//! - `health`: health checks, metrics and build info
//! - `users`: registration, login, CSRF token, self-service profile
//! - `admin`: user moderation (listing, dashboard, suspension, IP restriction)
//! - `questions`: question CRUD, listing and voting
//! - `answers`: answer CRUD, voting and acceptance

pub mod admin;
pub mod answers;
pub mod health;
pub mod questions;
pub mod users;
