//! Middleware components for HTTP request processing.
//!
//! Cross-cutting concerns live here: bearer authentication with the
//! suspension and IP-restriction gate, CSRF validation, client-IP
//! extraction, rate limiting, security headers and request hygiene.

pub mod auth;
pub mod csrf;
pub mod ip;
pub mod rate_limit;
pub mod security_headers;
pub mod validation;

pub use rate_limit::EndpointRateLimiter;
