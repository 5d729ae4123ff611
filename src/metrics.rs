use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Usage counters for monitoring
#[derive(Clone)]
pub struct Metrics {
    pub users_registered: Arc<AtomicUsize>,
    pub logins_succeeded: Arc<AtomicUsize>,
    pub logins_rejected: Arc<AtomicUsize>,
    pub questions_created: Arc<AtomicUsize>,
    pub answers_created: Arc<AtomicUsize>,
    pub votes_cast: Arc<AtomicUsize>,
    pub answers_accepted: Arc<AtomicUsize>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            users_registered: Arc::new(AtomicUsize::new(0)),
            logins_succeeded: Arc::new(AtomicUsize::new(0)),
            logins_rejected: Arc::new(AtomicUsize::new(0)),
            questions_created: Arc::new(AtomicUsize::new(0)),
            answers_created: Arc::new(AtomicUsize::new(0)),
            votes_cast: Arc::new(AtomicUsize::new(0)),
            answers_accepted: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_users_registered(&self) {
        self.users_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_logins_succeeded(&self) {
        self.logins_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_logins_rejected(&self) {
        self.logins_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_questions_created(&self) {
        self.questions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_answers_created(&self) {
        self.answers_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_votes_cast(&self) {
        self.votes_cast.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_answers_accepted(&self) {
        self.answers_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            users_registered: self.users_registered.load(Ordering::Relaxed),
            logins_succeeded: self.logins_succeeded.load(Ordering::Relaxed),
            logins_rejected: self.logins_rejected.load(Ordering::Relaxed),
            questions_created: self.questions_created.load(Ordering::Relaxed),
            answers_created: self.answers_created.load(Ordering::Relaxed),
            votes_cast: self.votes_cast.load(Ordering::Relaxed),
            answers_accepted: self.answers_accepted.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub users_registered: usize,
    pub logins_succeeded: usize,
    pub logins_rejected: usize,
    pub questions_created: usize,
    pub answers_created: usize,
    pub votes_cast: usize,
    pub answers_accepted: usize,
    pub uptime_seconds: u64,
}
