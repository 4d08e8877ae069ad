// src/handlers/response.rs
//
// Response Submission Engine: turns a completed answer set into one header +
// N detail rows and credits the respondent's reward, all inside a single
// storage transaction. Nothing is observable on any failure path.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    ledger,
    models::{
        question::{Question, QuestionOption, validate_answer},
        response::{SubmitResponseRequest, SubmitResponseResult},
        survey::Survey,
        transaction::TransactionType,
    },
    utils::jwt::Claims,
};

/// Submits a completed answer set for a survey.
///
/// Preconditions, checked before any write: the survey is open to the caller,
/// no prior submitted response exists (`already_submitted`), the quota has a
/// free slot (`quota_full`), and every question has a type-valid answer
/// (`incomplete_answers`, naming the question). The quota check is repeated as
/// a count-guarded INSERT, so two respondents racing for the last slot cannot
/// both be admitted: exactly one commits, the other gets `quota_full`.
pub async fn submit_response(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(survey_id): Path<i64>,
    Json(payload): Json<SubmitResponseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let now = Utc::now();

    // IMMEDIATE: take the write lock before the reads below, so a racing
    // submitter waits for this commit and then sees the quota as full, instead
    // of failing its SHARED-to-RESERVED lock upgrade with SQLITE_BUSY.
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let survey = sqlx::query_as::<_, Survey>("SELECT * FROM surveys WHERE id = ?")
        .bind(survey_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Survey not found".to_string()))?;

    if !survey.is_public || survey.deleted_at.is_some() {
        return Err(AppError::NotFound("Survey not found".to_string()));
    }
    if survey.owner_id == user_id {
        return Err(AppError::BadRequest(
            "You cannot answer your own survey".to_string(),
        ));
    }
    if let Some(deadline) = survey.deadline {
        if deadline < now {
            return Err(AppError::BadRequest("Survey deadline has passed".to_string()));
        }
    }

    let already: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM response_headers WHERE survey_id = ? AND user_id = ? AND submitted_at IS NOT NULL",
    )
    .bind(survey_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;
    if already.is_some() {
        return Err(AppError::AlreadySubmitted);
    }

    let submitted_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM response_headers WHERE survey_id = ? AND submitted_at IS NOT NULL",
    )
    .bind(survey_id)
    .fetch_one(&mut *tx)
    .await?;
    if submitted_count >= survey.target_respondents {
        return Err(AppError::QuotaFull);
    }

    // Validate every answer against its question before writing anything.
    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE survey_id = ? AND deleted_at IS NULL ORDER BY position",
    )
    .bind(survey_id)
    .fetch_all(&mut *tx)
    .await?;

    for answered_id in payload.answers.keys() {
        if !questions.iter().any(|q| q.id == *answered_id) {
            return Err(AppError::BadRequest(format!(
                "Question {} does not belong to this survey",
                answered_id
            )));
        }
    }

    let mut normalized = Vec::with_capacity(questions.len());
    for question in &questions {
        let input = payload
            .answers
            .get(&question.id)
            .ok_or(AppError::IncompleteAnswers {
                question_id: question.id,
                reason: "missing answer".to_string(),
            })?;

        let options = sqlx::query_as::<_, QuestionOption>(
            "SELECT * FROM question_options WHERE question_id = ? ORDER BY position",
        )
        .bind(question.id)
        .fetch_all(&mut *tx)
        .await?;

        let answer = validate_answer(question.question_type, &options, input).map_err(|reason| {
            AppError::IncompleteAnswers {
                question_id: question.id,
                reason,
            }
        })?;
        normalized.push((question.id, answer));
    }

    // Count-guarded insert is the atomic quota gate; the partial unique index
    // on (survey_id, user_id) backstops the already-submitted check.
    let inserted = sqlx::query(
        r#"
        INSERT INTO response_headers (survey_id, user_id, submitted_at, created_at)
        SELECT ?1, ?2, ?3, ?3
        WHERE (SELECT COUNT(*) FROM response_headers
                WHERE survey_id = ?1 AND submitted_at IS NOT NULL) < ?4
        "#,
    )
    .bind(survey_id)
    .bind(user_id)
    .bind(now)
    .bind(survey.target_respondents)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint") {
            AppError::AlreadySubmitted
        } else {
            tracing::error!("Failed to insert response header: {:?}", e);
            AppError::from(e)
        }
    })?;
    if inserted.rows_affected() == 0 {
        return Err(AppError::QuotaFull);
    }

    let header_id: i64 = sqlx::query_scalar("SELECT last_insert_rowid()")
        .fetch_one(&mut *tx)
        .await?;

    for (question_id, answer) in &normalized {
        sqlx::query(
            r#"
            INSERT INTO response_details (header_id, question_id, answer_text, option_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(header_id)
        .bind(question_id)
        .bind(&answer.text)
        .bind(answer.option_id)
        .execute(&mut *tx)
        .await?;
    }

    let balance = ledger::apply_transaction(
        &mut tx,
        user_id,
        survey.reward_points,
        TransactionType::RewardSurvey,
        &format!("Survey reward: {}", survey.title),
        Some(survey_id),
    )
    .await?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponseResult {
            response_id: header_id,
            reward_points: survey.reward_points,
            balance,
        }),
    ))
}
