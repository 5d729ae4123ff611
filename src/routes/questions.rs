use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::{
    error::{parse_entity_id, AppError, AppResult, OptionExt},
    middleware::auth::{ensure_owner_or_admin, CurrentUser},
    middleware::validation::{normalize_tags, require_non_empty},
    state::AppState,
    types::{
        CreateQuestionRequest, QuestionDetailDto, QuestionDto, QuestionListResponse,
        UpdateQuestionRequest, VoteRequest,
    },
    vote::{cast_vote, VoteTarget},
};

const QUESTION_SELECT: &str = "SELECT q.id, q.user_id, u.username, q.title, q.body, q.tags, q.created_at,
        (SELECT COALESCE(SUM(v.vote = 1), 0) FROM question_votes v WHERE v.question_id = q.id) AS upvotes,
        (SELECT COALESCE(SUM(v.vote = -1), 0) FROM question_votes v WHERE v.question_id = q.id) AS downvotes,
        (SELECT COUNT(*) FROM answers a WHERE a.question_id = q.id) AS answer_count
     FROM questions q JOIN users u ON u.id = q.user_id";

fn question_from_row(r: &SqliteRow) -> AppResult<QuestionDto> {
    let id = Uuid::parse_str(r.get::<String, _>("id").as_str())
        .map_err(|e| AppError::Database(format!("invalid question id in database: {}", e)))?;
    let user_id = Uuid::parse_str(r.get::<String, _>("user_id").as_str())
        .map_err(|e| AppError::Database(format!("invalid user id in database: {}", e)))?;
    let tags: Vec<String> =
        serde_json::from_str(r.get::<String, _>("tags").as_str()).unwrap_or_default();
    let upvotes: i64 = r.get("upvotes");
    let downvotes: i64 = r.get("downvotes");
    Ok(QuestionDto {
        id,
        user_id,
        username: r.get::<String, _>("username"),
        title: r.get::<String, _>("title"),
        body: r.get::<String, _>("body"),
        tags,
        upvotes,
        downvotes,
        score: upvotes - downvotes,
        answer_count: r.get("answer_count"),
        created_at: r.get::<String, _>("created_at"),
    })
}

pub(crate) async fn fetch_question(db: &SqlitePool, id: Uuid) -> AppResult<Option<QuestionDto>> {
    let row = sqlx::query(&format!("{} WHERE q.id = ?1", QUESTION_SELECT))
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;
    row.map(|r| question_from_row(&r)).transpose()
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
}

/// GET /questions - public, paginated, newest first.
pub async fn list_questions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let page_size = state.config.pagination.page_size as i64;
    let page = params.page.unwrap_or(1).max(1);

    let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM questions")
        .fetch_one(&state.db)
        .await?
        .get("n");
    let pages = ((total + page_size - 1) / page_size).max(1) as u32;

    let rows = sqlx::query(&format!(
        "{} ORDER BY q.created_at DESC LIMIT ?1 OFFSET ?2",
        QUESTION_SELECT
    ))
    .bind(page_size)
    .bind((page as i64 - 1) * page_size)
    .fetch_all(&state.db)
    .await?;

    let questions = rows.iter().map(question_from_row).collect::<AppResult<Vec<_>>>()?;
    Ok(Json(QuestionListResponse { questions, page, pages }))
}

/// POST /questions
pub async fn create_question(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateQuestionRequest>,
) -> AppResult<impl IntoResponse> {
    require_non_empty("title", &req.title)?;
    require_non_empty("body", &req.body)?;
    let tags = normalize_tags(req.tags);

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO questions (id, user_id, title, body, tags) VALUES (?1, ?2, ?3, ?4, ?5)")
        .bind(id.to_string())
        .bind(user.id.to_string())
        .bind(req.title.trim())
        .bind(&req.body)
        .bind(serde_json::to_string(&tags).unwrap_or_else(|_| "[]".to_string()))
        .execute(&state.db)
        .await?;

    state.metrics.inc_questions_created();
    tracing::info!("user {} created question {}", user.id, id);

    let question = fetch_question(&state.db, id).await?.ok_or_not_found("Question")?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// GET /questions/{id} - public detail view with embedded answers.
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_entity_id(&id, "Question")?;
    let question = fetch_question(&state.db, id).await?.ok_or_not_found("Question")?;
    let answers = crate::routes::answers::fetch_answers_for_question(&state.db, id).await?;
    Ok(Json(QuestionDetailDto { question, answers }))
}

/// PUT /questions/{id} - owner or admin.
pub async fn update_question(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateQuestionRequest>,
) -> AppResult<impl IntoResponse> {
    let id = parse_entity_id(&id, "Question")?;
    let existing = fetch_question(&state.db, id).await?.ok_or_not_found("Question")?;
    ensure_owner_or_admin(existing.user_id, &user)?;

    let title = match req.title {
        Some(t) => {
            require_non_empty("title", &t)?;
            t.trim().to_string()
        }
        None => existing.title,
    };
    let body = match req.body {
        Some(b) => {
            require_non_empty("body", &b)?;
            b
        }
        None => existing.body,
    };
    let tags = match req.tags {
        Some(t) => normalize_tags(Some(t)),
        None => existing.tags,
    };

    sqlx::query("UPDATE questions SET title = ?1, body = ?2, tags = ?3 WHERE id = ?4")
        .bind(&title)
        .bind(&body)
        .bind(serde_json::to_string(&tags).unwrap_or_else(|_| "[]".to_string()))
        .bind(id.to_string())
        .execute(&state.db)
        .await?;

    let updated = fetch_question(&state.db, id).await?.ok_or_not_found("Question")?;
    Ok(Json(updated))
}

/// DELETE /questions/{id} - owner or admin; removes the question together
/// with its answers and all votes on either, in one transaction.
pub async fn delete_question(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_entity_id(&id, "Question")?;
    let existing = fetch_question(&state.db, id).await?.ok_or_not_found("Question")?;
    ensure_owner_or_admin(existing.user_id, &user)?;

    let qid = id.to_string();
    let mut tx = state.db.begin().await?;
    sqlx::query(
        "DELETE FROM answer_votes
         WHERE answer_id IN (SELECT id FROM answers WHERE question_id = ?1)",
    )
    .bind(&qid)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM answers WHERE question_id = ?1").bind(&qid).execute(&mut *tx).await?;
    sqlx::query("DELETE FROM question_votes WHERE question_id = ?1").bind(&qid).execute(&mut *tx).await?;
    sqlx::query("DELETE FROM questions WHERE id = ?1").bind(&qid).execute(&mut *tx).await?;
    tx.commit().await?;

    tracing::info!("user {} deleted question {}", user.id, id);
    Ok(Json(serde_json::json!({ "message": "Question removed" })))
}

/// PUT /questions/{id}/vote - toggle the caller's vote.
pub async fn vote_question(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<impl IntoResponse> {
    let id = parse_entity_id(&id, "Question")?;
    fetch_question(&state.db, id).await?.ok_or_not_found("Question")?;

    let counts = cast_vote(&state.db, VoteTarget::Question(id), user.id, req.vote_type).await?;
    state.metrics.inc_votes_cast();

    Ok(Json(serde_json::json!({
        "upvotes": counts.upvotes,
        "downvotes": counts.downvotes,
        "score": counts.upvotes - counts.downvotes,
    })))
}
