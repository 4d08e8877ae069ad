// src/handlers/survey.rs
//
// Creator-side survey lifecycle: draft -> published -> closed, monotone.
// Publishing is the only point where the owner is charged; the balance check
// and the debit are one atomic unit inside the ledger.

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    ledger,
    models::{
        question::{
            CreateQuestionRequest, Question, QuestionReport, count_answer_labels,
            validate_option_set,
        },
        survey::{CreateSurveyRequest, Survey, SurveySummary},
        transaction::TransactionType,
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Creates a draft survey.
///
/// Total cost is fixed here as reward × quota. The ledger is not touched:
/// abandoned drafts cost nothing, the owner is charged at publish time.
pub async fn create_survey(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSurveyRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if let Some(reason) = payload.criteria_error() {
        return Err(AppError::BadRequest(reason));
    }
    let user_id = claims.user_id()?;

    // An overflowing product would wrap the publish-time debit into a credit.
    let total_cost = payload
        .target_respondents
        .checked_mul(payload.reward_points)
        .ok_or_else(|| {
            AppError::BadRequest("Survey cost exceeds the representable range".to_string())
        })?;
    let description = clean_html(&payload.description);
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    for category_id in &payload.category_ids {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!(
                "Category {} not found",
                category_id
            )));
        }
    }

    let survey_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO surveys (
            owner_id, title, description, image,
            target_respondents, reward_points, total_cost,
            gender, residence, age_min, age_max,
            deadline, is_public, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.title)
    .bind(&description)
    .bind(&payload.image)
    .bind(payload.target_respondents)
    .bind(payload.reward_points)
    .bind(total_cost)
    .bind(&payload.gender)
    .bind(&payload.residence)
    .bind(payload.age_min)
    .bind(payload.age_max)
    .bind(payload.deadline)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create survey: {:?}", e);
        AppError::from(e)
    })?;

    for category_id in &payload.category_ids {
        sqlx::query("INSERT OR IGNORE INTO survey_categories (survey_id, category_id) VALUES (?, ?)")
            .bind(survey_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": survey_id, "total_cost": total_cost })),
    ))
}

/// Fetches a survey and checks the caller owns it.
async fn fetch_owned_survey(
    pool: &SqlitePool,
    survey_id: i64,
    user_id: i64,
) -> Result<Survey, AppError> {
    let survey = sqlx::query_as::<_, Survey>("SELECT * FROM surveys WHERE id = ?")
        .bind(survey_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Survey not found".to_string()))?;

    if survey.owner_id != user_id {
        return Err(AppError::Forbidden(
            "Only the survey owner may do this".to_string(),
        ));
    }
    Ok(survey)
}

/// Adds a question to a draft survey.
///
/// Question structure is frozen at publish time, so this is rejected with 409
/// once the survey is public. The point cost is derived from the type.
pub async fn add_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(survey_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let user_id = claims.user_id()?;

    let survey = fetch_owned_survey(&pool, survey_id, user_id).await?;
    if survey.deleted_at.is_some() {
        return Err(AppError::Conflict("Survey is closed".to_string()));
    }
    if survey.is_public {
        return Err(AppError::Conflict(
            "Questions cannot be added after publishing".to_string(),
        ));
    }

    validate_option_set(payload.question_type, &payload.options)
        .map_err(AppError::BadRequest)?;

    let mut tx = pool.begin().await?;

    let next_position: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM questions WHERE survey_id = ?",
    )
    .bind(survey_id)
    .fetch_one(&mut *tx)
    .await?;

    let question_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions (survey_id, content, question_type, point_cost, image, position, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(survey_id)
    .bind(&payload.content)
    .bind(payload.question_type)
    .bind(payload.question_type.point_cost())
    .bind(&payload.image)
    .bind(next_position)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    for (position, option) in payload.options.iter().enumerate() {
        sqlx::query(
            "INSERT INTO question_options (question_id, content, position) VALUES (?, ?, ?)",
        )
        .bind(question_id)
        .bind(option.trim())
        .bind(position as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": question_id,
            "point_cost": payload.question_type.point_cost()
        })),
    ))
}

/// Publishes a draft survey, debiting the owner's balance by the total cost.
///
/// The debit is a guarded ledger write inside the same transaction as the
/// visibility flip: with a borderline balance, two racing publishes cannot
/// both succeed, and an `InsufficientBalance` failure leaves the draft intact.
pub async fn publish_survey(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(survey_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let survey = fetch_owned_survey(&pool, survey_id, user_id).await?;
    if survey.deleted_at.is_some() {
        return Err(AppError::Conflict("Survey is closed".to_string()));
    }
    if survey.is_public {
        return Err(AppError::Conflict("Survey is already published".to_string()));
    }

    let question_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE survey_id = ? AND deleted_at IS NULL")
            .bind(survey_id)
            .fetch_one(&pool)
            .await?;
    if question_count == 0 {
        return Err(AppError::BadRequest(
            "A survey needs at least one question before publishing".to_string(),
        ));
    }

    // IMMEDIATE: a concurrent publish or withdrawal must wait for this commit
    // and then hit the balance guard, not SQLITE_BUSY on its lock upgrade.
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let balance = ledger::apply_transaction(
        &mut tx,
        user_id,
        -survey.total_cost,
        TransactionType::CostSurvey,
        &format!("Survey cost: {}", survey.title),
        Some(survey_id),
    )
    .await?;

    // The flip is re-guarded on is_public so a concurrent publish of the same
    // draft charges at most once.
    let updated = sqlx::query(
        "UPDATE surveys SET is_public = 1, updated_at = ? WHERE id = ? AND is_public = 0",
    )
    .bind(Utc::now())
    .bind(survey_id)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::Conflict("Survey is already published".to_string()));
    }

    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "published": true,
        "charged": survey.total_cost,
        "balance": balance
    })))
}

/// Closes a published survey. Terminal; hidden from every feed afterwards.
/// The unused share of the publish debit is not refunded.
pub async fn close_survey(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(survey_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let survey = fetch_owned_survey(&pool, survey_id, user_id).await?;
    if survey.deleted_at.is_some() {
        return Err(AppError::Conflict("Survey is already closed".to_string()));
    }
    if !survey.is_public {
        return Err(AppError::Conflict(
            "Only a published survey can be closed".to_string(),
        ));
    }

    sqlx::query("UPDATE surveys SET deleted_at = ?, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(survey_id)
        .execute(&pool)
        .await?;

    Ok(Json(serde_json::json!({ "closed": true })))
}

/// Lists the caller's surveys (any state) with live submitted-response counts.
pub async fn list_my_surveys(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let surveys = sqlx::query_as::<_, SurveySummary>(
        r#"
        SELECT
            s.id, s.owner_id, s.title, s.description, s.image,
            s.target_respondents, s.reward_points, s.total_cost,
            s.gender, s.residence, s.age_min, s.age_max,
            s.deadline, s.is_public,
            (SELECT COUNT(*) FROM response_headers r
              WHERE r.survey_id = s.id AND r.submitted_at IS NOT NULL) AS submitted_count,
            s.created_at
        FROM surveys s
        WHERE s.owner_id = ?
        ORDER BY s.created_at DESC, s.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(surveys))
}

/// Row shape for the report's answer fetch.
#[derive(sqlx::FromRow)]
struct AnswerRow {
    question_id: i64,
    answer_text: String,
}

/// Creator-facing report: per-question aggregation of submitted answers.
///
/// Choice-like questions get a frequency table (Check Box selections count one
/// per label per response); free-text questions list every answer.
pub async fn get_report(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(survey_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let survey = fetch_owned_survey(&pool, survey_id, user_id).await?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE survey_id = ? AND deleted_at IS NULL ORDER BY position",
    )
    .bind(survey_id)
    .fetch_all(&pool)
    .await?;

    let answer_rows = sqlx::query_as::<_, AnswerRow>(
        r#"
        SELECT d.question_id, d.answer_text
        FROM response_details d
        JOIN response_headers r ON d.header_id = r.id
        WHERE r.survey_id = ? AND r.submitted_at IS NOT NULL AND d.deleted_at IS NULL
        ORDER BY d.id
        "#,
    )
    .bind(survey_id)
    .fetch_all(&pool)
    .await?;

    let mut by_question: HashMap<i64, Vec<String>> = HashMap::new();
    for row in answer_rows {
        by_question.entry(row.question_id).or_default().push(row.answer_text);
    }

    let submitted_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM response_headers WHERE survey_id = ? AND submitted_at IS NOT NULL",
    )
    .bind(survey_id)
    .fetch_one(&pool)
    .await?;

    let reports: Vec<QuestionReport> = questions
        .into_iter()
        .map(|q| {
            let snapshots = by_question.remove(&q.id).unwrap_or_default();
            if q.question_type.is_free_text() {
                QuestionReport {
                    question_id: q.id,
                    content: q.content,
                    question_type: q.question_type,
                    counts: None,
                    answers: Some(snapshots),
                }
            } else {
                QuestionReport {
                    question_id: q.id,
                    content: q.content,
                    question_type: q.question_type,
                    counts: Some(count_answer_labels(q.question_type, &snapshots)),
                    answers: None,
                }
            }
        })
        .collect();

    Ok(Json(serde_json::json!({
        "survey_id": survey.id,
        "title": survey.title,
        "target_respondents": survey.target_respondents,
        "submitted_count": submitted_count,
        "questions": reports
    })))
}
