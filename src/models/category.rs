// src/models/category.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'categories' table.
/// Shared by surveys (tagging) and users (interest sets); neither side owns it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// DTO for creating a new category.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Category name length must be between 1 and 50 characters."
    ))]
    pub name: String,
}
