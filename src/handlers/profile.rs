// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        category::Category,
        response::HistoryItem,
        user::{MeResponse, SetCategoriesRequest, UpdateProfileRequest, User},
    },
    utils::jwt::Claims,
};

/// Get current user's profile, liked categories and survey statistics.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ? AND deleted_at IS NULL")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let categories = sqlx::query_as::<_, Category>(
        r#"
        SELECT c.id, c.name
        FROM categories c
        JOIN user_categories uc ON uc.category_id = c.id
        WHERE uc.user_id = ?
        ORDER BY c.name
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    let surveys_owned: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM surveys WHERE owner_id = ?",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let surveys_answered: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM response_headers WHERE user_id = ? AND submitted_at IS NOT NULL",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        gender: user.gender,
        birthdate: user.birthdate,
        birthplace: user.birthplace,
        residence: user.residence,
        phone: user.phone,
        point: user.point,
        profile_image: user.profile_image,
        header_image: user.header_image,
        created_at: user.created_at,
        categories,
        surveys_owned,
        surveys_answered,
    }))
}

/// Updates profile fields. Absent fields are left untouched.
/// All present fields are applied in one transaction; a storage failure cannot
/// leave a half-updated profile.
pub async fn update_profile(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    let _exists: i64 = sqlx::query_scalar("SELECT id FROM users WHERE id = ? AND deleted_at IS NULL")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if let Some(name) = payload.name {
        sqlx::query("UPDATE users SET name = ? WHERE id = ?")
            .bind(name)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(gender) = payload.gender {
        sqlx::query("UPDATE users SET gender = ? WHERE id = ?")
            .bind(gender)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(birthdate) = payload.birthdate {
        sqlx::query("UPDATE users SET birthdate = ? WHERE id = ?")
            .bind(birthdate)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(birthplace) = payload.birthplace {
        sqlx::query("UPDATE users SET birthplace = ? WHERE id = ?")
            .bind(birthplace)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(residence) = payload.residence {
        sqlx::query("UPDATE users SET residence = ? WHERE id = ?")
            .bind(residence)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(phone) = payload.phone {
        sqlx::query("UPDATE users SET phone = ? WHERE id = ?")
            .bind(phone)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(profile_image) = payload.profile_image {
        sqlx::query("UPDATE users SET profile_image = ? WHERE id = ?")
            .bind(profile_image)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(header_image) = payload.header_image {
        sqlx::query("UPDATE users SET header_image = ? WHERE id = ?")
            .bind(header_image)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(Json(serde_json::json!({ "updated": true })))
}

/// Replaces the user's liked-category set.
/// The join table has no ownership in either direction; the whole set is
/// swapped in one transaction so readers never see a half-replaced state.
pub async fn set_categories(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SetCategoriesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

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

    sqlx::query("DELETE FROM user_categories WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    for category_id in &payload.category_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO user_categories (user_id, category_id) VALUES (?, ?)",
        )
        .bind(user_id)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "category_ids": payload.category_ids
    })))
}

/// Lists the user's completed survey responses, newest first.
pub async fn get_history(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let history = sqlx::query_as::<_, HistoryItem>(
        r#"
        SELECT
            r.id AS response_id,
            s.id AS survey_id,
            s.title AS survey_title,
            s.reward_points,
            r.submitted_at
        FROM response_headers r
        JOIN surveys s ON r.survey_id = s.id
        WHERE r.user_id = ? AND r.submitted_at IS NOT NULL
        ORDER BY r.submitted_at DESC, r.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(history))
}
