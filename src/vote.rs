//! Vote-toggle logic for questions and answers.
//!
//! Votes live in one row per (entity, voter) with a value of +1 or -1, so a
//! voter can never sit in both the upvote and the downvote set. The toggle
//! itself is a read-modify-write inside a single transaction: concurrent
//! votes by different users on the same entity race with last-write-wins,
//! which is acceptable here because nothing else in the system coordinates
//! writes either.

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Upvote,
    Downvote,
}

impl VoteKind {
    fn value(self) -> i64 {
        match self {
            VoteKind::Upvote => 1,
            VoteKind::Downvote => -1,
        }
    }
}

/// Which entity a vote applies to. Both vote tables share the same shape.
#[derive(Debug, Clone, Copy)]
pub enum VoteTarget {
    Question(Uuid),
    Answer(Uuid),
}

impl VoteTarget {
    fn table(&self) -> &'static str {
        match self {
            VoteTarget::Question(_) => "question_votes",
            VoteTarget::Answer(_) => "answer_votes",
        }
    }

    fn key_column(&self) -> &'static str {
        match self {
            VoteTarget::Question(_) => "question_id",
            VoteTarget::Answer(_) => "answer_id",
        }
    }

    fn id(&self) -> Uuid {
        match self {
            VoteTarget::Question(id) | VoteTarget::Answer(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoteCounts {
    pub upvotes: i64,
    pub downvotes: i64,
}

/// The state transition of a single vote: repeating the current vote removes
/// it, anything else replaces it (mutual exclusion of up/down falls out of
/// the single-slot representation).
pub fn next_vote(current: Option<VoteKind>, requested: VoteKind) -> Option<VoteKind> {
    if current == Some(requested) {
        None
    } else {
        Some(requested)
    }
}

/// Applies one vote toggle and returns the entity's fresh counts.
///
/// The caller is responsible for checking that the entity exists; a vote on a
/// missing entity would fail the foreign key constraint.
pub async fn cast_vote(
    db: &SqlitePool,
    target: VoteTarget,
    voter: Uuid,
    requested: VoteKind,
) -> AppResult<VoteCounts> {
    let table = target.table();
    let key = target.key_column();
    let entity_id = target.id().to_string();
    let voter_id = voter.to_string();

    let mut tx = db.begin().await?;

    let current: Option<VoteKind> =
        sqlx::query(&format!("SELECT vote FROM {} WHERE {} = ?1 AND user_id = ?2", table, key))
            .bind(&entity_id)
            .bind(&voter_id)
            .fetch_optional(&mut *tx)
            .await?
            .map(|r| if r.get::<i64, _>("vote") > 0 { VoteKind::Upvote } else { VoteKind::Downvote });

    match next_vote(current, requested) {
        None => {
            sqlx::query(&format!("DELETE FROM {} WHERE {} = ?1 AND user_id = ?2", table, key))
                .bind(&entity_id)
                .bind(&voter_id)
                .execute(&mut *tx)
                .await?;
        }
        Some(kind) => {
            sqlx::query(&format!(
                "INSERT INTO {} ({}, user_id, vote) VALUES (?1, ?2, ?3)
                 ON CONFLICT({}, user_id) DO UPDATE SET vote = excluded.vote",
                table, key, key
            ))
            .bind(&entity_id)
            .bind(&voter_id)
            .bind(kind.value())
            .execute(&mut *tx)
            .await?;
        }
    }

    let row = sqlx::query(&format!(
        "SELECT COALESCE(SUM(vote = 1), 0) AS upvotes,
                COALESCE(SUM(vote = -1), 0) AS downvotes
         FROM {} WHERE {} = ?1",
        table, key
    ))
    .bind(&entity_id)
    .fetch_one(&mut *tx)
    .await?;

    let counts =
        VoteCounts { upvotes: row.get::<i64, _>("upvotes"), downvotes: row.get::<i64, _>("downvotes") };

    tx.commit().await?;
    Ok(counts)
}
