// src/handlers/feed.rs
//
// Respondent-side reads: the eligibility-filtered feed and the survey detail
// view. The feed is a pure read; a survey filling up right after being listed
// is an expected race, surfaced as quota_full at submit time instead.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        category::Category,
        question::{Question, QuestionOption, sort_options_for_display},
        survey::{Survey, SurveySummary},
        user::User,
    },
    utils::jwt::Claims,
};

/// Lists surveys the caller may answer, newest first.
///
/// SQL enforces the state predicates: published, not closed, not owned by the
/// caller, deadline absent or in the future, quota not full, not already
/// answered by the caller. The demographic axes (gender, residence, age) are
/// applied in Rust via the pure predicate so they stay unit-testable.
pub async fn list_feed(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let now = Utc::now();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ? AND deleted_at IS NULL")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let candidates = sqlx::query_as::<_, SurveySummary>(
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
        WHERE s.is_public = 1
          AND s.deleted_at IS NULL
          AND s.owner_id != ?1
          AND (s.deadline IS NULL OR s.deadline >= ?2)
          AND (SELECT COUNT(*) FROM response_headers r
                WHERE r.survey_id = s.id AND r.submitted_at IS NOT NULL) < s.target_respondents
          AND NOT EXISTS (SELECT 1 FROM response_headers r
                WHERE r.survey_id = s.id AND r.user_id = ?1 AND r.submitted_at IS NOT NULL)
        ORDER BY s.created_at DESC, s.id DESC
        "#,
    )
    .bind(user_id)
    .bind(now)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch survey feed: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let today = now.date_naive();
    let feed: Vec<SurveySummary> = candidates
        .into_iter()
        .filter(|s| s.matches_demographics(&user, today))
        .collect();

    Ok(Json(feed))
}

/// A question with its (display-ordered) options.
#[derive(Debug, Serialize)]
struct QuestionDetail {
    #[serde(flatten)]
    question: Question,
    options: Vec<QuestionOption>,
}

/// Survey detail with questions, options and categories.
///
/// The owner sees their survey in any state; everyone else only sees it while
/// it is published and not closed.
pub async fn get_survey(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(survey_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let survey = sqlx::query_as::<_, Survey>("SELECT * FROM surveys WHERE id = ?")
        .bind(survey_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Survey not found".to_string()))?;

    if survey.owner_id != user_id && (!survey.is_public || survey.deleted_at.is_some()) {
        return Err(AppError::NotFound("Survey not found".to_string()));
    }

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE survey_id = ? AND deleted_at IS NULL ORDER BY position",
    )
    .bind(survey_id)
    .fetch_all(&pool)
    .await?;

    let mut details = Vec::with_capacity(questions.len());
    for question in questions {
        let mut options = sqlx::query_as::<_, QuestionOption>(
            "SELECT * FROM question_options WHERE question_id = ? ORDER BY position",
        )
        .bind(question.id)
        .fetch_all(&pool)
        .await?;
        // Linear Scale labels order numerically, not lexicographically.
        sort_options_for_display(question.question_type, &mut options);
        details.push(QuestionDetail { question, options });
    }

    let categories = sqlx::query_as::<_, Category>(
        r#"
        SELECT c.id, c.name
        FROM categories c
        JOIN survey_categories sc ON sc.category_id = c.id
        WHERE sc.survey_id = ?
        ORDER BY c.name
        "#,
    )
    .bind(survey_id)
    .fetch_all(&pool)
    .await?;

    let submitted_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM response_headers WHERE survey_id = ? AND submitted_at IS NOT NULL",
    )
    .bind(survey_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "survey": survey,
        "submitted_count": submitted_count,
        "questions": details,
        "categories": categories
    })))
}
