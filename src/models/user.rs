// src/models/user.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::category::Category;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique email, used as the login identity.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub name: String,

    /// Demographics used by survey eligibility matching.
    pub gender: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub birthplace: Option<String>,
    pub residence: Option<String>,
    pub phone: Option<String>,

    /// Cached point balance. The transaction log is authoritative; this column
    /// is only ever written by the ledger (see `crate::ledger`).
    pub point: i64,

    pub profile_image: Option<String>,
    pub header_image: Option<String>,

    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Aggregated profile data for the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub gender: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub birthplace: Option<String>,
    pub residence: Option<String>,
    pub phone: Option<String>,
    pub point: i64,
    pub profile_image: Option<String>,
    pub header_image: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Categories the user marked as interests.
    pub categories: Vec<Category>,
    pub surveys_owned: i64,
    pub surveys_answered: i64,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Must be a valid email address."))]
    pub email: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
    pub gender: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub birthplace: Option<String>,
    pub residence: Option<String>,
    pub phone: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for updating profile fields. Absent fields are left untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub birthplace: Option<String>,
    pub residence: Option<String>,
    pub phone: Option<String>,
    pub profile_image: Option<String>,
    pub header_image: Option<String>,
}

/// DTO for replacing the set of liked categories.
#[derive(Debug, Deserialize)]
pub struct SetCategoriesRequest {
    pub category_ids: Vec<i64>,
}
