use sqlx::SqlitePool;

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // Pragmas for better durability/performance (best-effort, log failures)
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }
    // Foreign keys are critical - fail if this doesn't work
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;
    if let Err(e) = sqlx::query("PRAGMA busy_timeout=10000;").execute(pool).await {
        tracing::warn!("Failed to set busy_timeout: {}", e);
    }

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            is_admin INTEGER NOT NULL DEFAULT 0,
            is_suspended INTEGER NOT NULL DEFAULT 0,
            suspension_ends_at TEXT NULL,
            suspension_reason TEXT NULL,
            last_login_ip TEXT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    // Ordered login-IP history per user
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS ip_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            ip TEXT NOT NULL,
            seen_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    // Per-user blocklist of source addresses (possibly empty, never absent)
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS restricted_ips (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            ip TEXT NOT NULL,
            reason TEXT NOT NULL,
            restricted_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS answers (
            id TEXT PRIMARY KEY,
            question_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            body TEXT NOT NULL,
            is_accepted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            FOREIGN KEY(question_id) REFERENCES questions(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    // One row per (entity, voter); vote is +1 or -1. The primary key is what
    // guarantees a user is never in both the upvote and downvote set.
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS question_votes (
            question_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            vote INTEGER NOT NULL CHECK (vote IN (1, -1)),
            PRIMARY KEY (question_id, user_id),
            FOREIGN KEY(question_id) REFERENCES questions(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS answer_votes (
            answer_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            vote INTEGER NOT NULL CHECK (vote IN (1, -1)),
            PRIMARY KEY (answer_id, user_id),
            FOREIGN KEY(answer_id) REFERENCES answers(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        ("idx_users_created", "CREATE INDEX IF NOT EXISTS idx_users_created ON users(created_at DESC)"),
        ("idx_ip_history_user", "CREATE INDEX IF NOT EXISTS idx_ip_history_user ON ip_history(user_id)"),
        (
            "idx_restricted_ips_user",
            "CREATE INDEX IF NOT EXISTS idx_restricted_ips_user ON restricted_ips(user_id, ip)",
        ),
        (
            "idx_questions_user",
            "CREATE INDEX IF NOT EXISTS idx_questions_user ON questions(user_id)",
        ),
        (
            "idx_questions_created",
            "CREATE INDEX IF NOT EXISTS idx_questions_created ON questions(created_at DESC)",
        ),
        (
            "idx_answers_question",
            "CREATE INDEX IF NOT EXISTS idx_answers_question ON answers(question_id)",
        ),
        ("idx_answers_user", "CREATE INDEX IF NOT EXISTS idx_answers_user ON answers(user_id)"),
    ];

    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            match &e {
                sqlx::Error::Database(db_err) => {
                    let msg = db_err.message().to_lowercase();
                    if msg.contains("already exists") || msg.contains("duplicate") {
                        tracing::debug!("Index {} already exists, skipping", name);
                    } else {
                        tracing::warn!("Failed to create index {}: {}", name, e);
                    }
                }
                _ => {
                    tracing::warn!("Failed to create index {}: {}", name, e);
                }
            }
        }
    }

    Ok(())
}
