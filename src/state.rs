use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::middleware::EndpointRateLimiter;

/// The shared application state.
///
/// Holds everything HTTP handlers and middleware need: the SQLite pool, the
/// parsed configuration, usage counters and the per-endpoint rate limiter.
/// Cloneable for Axum's request extraction; there is no other in-process
/// mutable state, every request reads and writes through the pool.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    pub rate_limiter: EndpointRateLimiter,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        // Login and registration are the abuse-prone endpoints; everything
        // else rides on the global limiter.
        let rate_limiter = EndpointRateLimiter::new().with_limits(vec![
            ("/users/login", 20, 60), // 20 login attempts per minute per IP
            ("/users", 30, 60),       // 30 registrations per minute per IP
        ]);

        Self { db, config: Arc::new(config), metrics: Metrics::new(), rate_limiter }
    }
}
