use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::{
    error::{parse_entity_id, AppError, AppResult, OptionExt},
    middleware::auth::{ensure_owner_or_admin, CurrentUser},
    middleware::validation::require_non_empty,
    routes::questions::fetch_question,
    state::AppState,
    types::{AcceptResponse, AnswerDto, CreateAnswerRequest, UpdateAnswerRequest, VoteRequest},
    vote::{cast_vote, VoteTarget},
};

const ANSWER_SELECT: &str = "SELECT a.id, a.question_id, a.user_id, u.username, a.body, a.is_accepted, a.created_at,
        (SELECT COALESCE(SUM(v.vote = 1), 0) FROM answer_votes v WHERE v.answer_id = a.id) AS upvotes,
        (SELECT COALESCE(SUM(v.vote = -1), 0) FROM answer_votes v WHERE v.answer_id = a.id) AS downvotes
     FROM answers a JOIN users u ON u.id = a.user_id";

fn answer_from_row(r: &SqliteRow) -> AppResult<AnswerDto> {
    let id = Uuid::parse_str(r.get::<String, _>("id").as_str())
        .map_err(|e| AppError::Database(format!("invalid answer id in database: {}", e)))?;
    let question_id = Uuid::parse_str(r.get::<String, _>("question_id").as_str())
        .map_err(|e| AppError::Database(format!("invalid question id in database: {}", e)))?;
    let user_id = Uuid::parse_str(r.get::<String, _>("user_id").as_str())
        .map_err(|e| AppError::Database(format!("invalid user id in database: {}", e)))?;
    let upvotes: i64 = r.get("upvotes");
    let downvotes: i64 = r.get("downvotes");
    Ok(AnswerDto {
        id,
        question_id,
        user_id,
        username: r.get::<String, _>("username"),
        body: r.get::<String, _>("body"),
        is_accepted: r.get::<i64, _>("is_accepted") != 0,
        upvotes,
        downvotes,
        score: upvotes - downvotes,
        created_at: r.get::<String, _>("created_at"),
    })
}

async fn fetch_answer(db: &SqlitePool, id: Uuid) -> AppResult<Option<AnswerDto>> {
    let row = sqlx::query(&format!("{} WHERE a.id = ?1", ANSWER_SELECT))
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;
    row.map(|r| answer_from_row(&r)).transpose()
}

/// Answers for a question, accepted first, then newest.
pub(crate) async fn fetch_answers_for_question(
    db: &SqlitePool,
    question_id: Uuid,
) -> AppResult<Vec<AnswerDto>> {
    let rows = sqlx::query(&format!(
        "{} WHERE a.question_id = ?1 ORDER BY a.is_accepted DESC, a.created_at DESC",
        ANSWER_SELECT
    ))
    .bind(question_id.to_string())
    .fetch_all(db)
    .await?;
    rows.iter().map(answer_from_row).collect()
}

/// POST /questions/{id}/answers
pub async fn create_answer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(question_id): Path<String>,
    Json(req): Json<CreateAnswerRequest>,
) -> AppResult<impl IntoResponse> {
    let question_id = parse_entity_id(&question_id, "Question")?;
    fetch_question(&state.db, question_id).await?.ok_or_not_found("Question")?;
    require_non_empty("body", &req.body)?;

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO answers (id, question_id, user_id, body) VALUES (?1, ?2, ?3, ?4)")
        .bind(id.to_string())
        .bind(question_id.to_string())
        .bind(user.id.to_string())
        .bind(&req.body)
        .execute(&state.db)
        .await?;

    state.metrics.inc_answers_created();
    tracing::info!("user {} answered question {}", user.id, question_id);

    let answer = fetch_answer(&state.db, id).await?.ok_or_not_found("Answer")?;
    Ok((StatusCode::CREATED, Json(answer)))
}

/// GET /questions/{id}/answers - public.
pub async fn list_answers(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let question_id = parse_entity_id(&question_id, "Question")?;
    fetch_question(&state.db, question_id).await?.ok_or_not_found("Question")?;
    let answers = fetch_answers_for_question(&state.db, question_id).await?;
    Ok(Json(answers))
}

/// GET /answers/{id} - public.
pub async fn get_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_entity_id(&id, "Answer")?;
    let answer = fetch_answer(&state.db, id).await?.ok_or_not_found("Answer")?;
    Ok(Json(answer))
}

/// PUT /answers/{id} - owner or admin.
pub async fn update_answer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateAnswerRequest>,
) -> AppResult<impl IntoResponse> {
    let id = parse_entity_id(&id, "Answer")?;
    let existing = fetch_answer(&state.db, id).await?.ok_or_not_found("Answer")?;
    ensure_owner_or_admin(existing.user_id, &user)?;

    let body = match req.body {
        Some(b) => {
            require_non_empty("body", &b)?;
            b
        }
        None => existing.body,
    };

    sqlx::query("UPDATE answers SET body = ?1 WHERE id = ?2")
        .bind(&body)
        .bind(id.to_string())
        .execute(&state.db)
        .await?;

    let updated = fetch_answer(&state.db, id).await?.ok_or_not_found("Answer")?;
    Ok(Json(updated))
}

/// DELETE /answers/{id} - owner or admin; votes on the answer go with it.
pub async fn delete_answer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_entity_id(&id, "Answer")?;
    let existing = fetch_answer(&state.db, id).await?.ok_or_not_found("Answer")?;
    ensure_owner_or_admin(existing.user_id, &user)?;

    let aid = id.to_string();
    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM answer_votes WHERE answer_id = ?1").bind(&aid).execute(&mut *tx).await?;
    sqlx::query("DELETE FROM answers WHERE id = ?1").bind(&aid).execute(&mut *tx).await?;
    tx.commit().await?;

    tracing::info!("user {} deleted answer {}", user.id, id);
    Ok(Json(serde_json::json!({ "message": "Answer removed" })))
}

/// PUT /answers/{id}/accept - toggle acceptance. Only the question owner may
/// accept, and at most one answer per question is accepted at a time.
pub async fn accept_answer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_entity_id(&id, "Answer")?;
    let answer = fetch_answer(&state.db, id).await?.ok_or_not_found("Answer")?;
    let question =
        fetch_question(&state.db, answer.question_id).await?.ok_or_not_found("Question")?;

    if !user.is_owner_of(question.user_id) {
        return Err(AppError::Forbidden("Only question owner can accept answers".to_string()));
    }

    // Clearing the siblings and flipping the target must be atomic so two
    // answers can never end up accepted at once.
    let accepted = !answer.is_accepted;
    let mut tx = state.db.begin().await?;
    sqlx::query("UPDATE answers SET is_accepted = 0 WHERE question_id = ?1")
        .bind(answer.question_id.to_string())
        .execute(&mut *tx)
        .await?;
    if accepted {
        sqlx::query("UPDATE answers SET is_accepted = 1 WHERE id = ?1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    state.metrics.inc_answers_accepted();
    tracing::info!(
        "user {} {} answer {} on question {}",
        user.id,
        if accepted { "accepted" } else { "unaccepted" },
        id,
        answer.question_id
    );
    Ok(Json(AcceptResponse { is_accepted: accepted }))
}

/// PUT /answers/{id}/vote - toggle the caller's vote.
pub async fn vote_answer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<impl IntoResponse> {
    let id = parse_entity_id(&id, "Answer")?;
    fetch_answer(&state.db, id).await?.ok_or_not_found("Answer")?;

    let counts = cast_vote(&state.db, VoteTarget::Answer(id), user.id, req.vote_type).await?;
    state.metrics.inc_votes_cast();

    Ok(Json(serde_json::json!({
        "upvotes": counts.upvotes,
        "downvotes": counts.downvotes,
        "score": counts.upvotes - counts.downvotes,
    })))
}
