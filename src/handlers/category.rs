// src/handlers/category.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::category::{Category, CreateCategoryRequest},
};

/// Lists all categories.
pub async fn list_categories(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let categories = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list categories: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(categories))
}

/// Creates a new category. Names are unique.
pub async fn create_category(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name) VALUES (?) RETURNING id, name",
    )
    .bind(payload.name.trim())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint") {
            AppError::Conflict(format!("Category '{}' already exists", payload.name.trim()))
        } else {
            tracing::error!("Failed to create category: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(category)))
}
