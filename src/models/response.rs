// src/models/response.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

use crate::models::question::AnswerInput;

/// Represents the 'response_headers' table: one row per survey attempt.
/// A non-null `submitted_at` marks the attempt as completed; at most one
/// completed row may exist per (survey, user).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub id: i64,
    pub survey_id: i64,
    pub user_id: i64,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'response_details' table: one row per answered question
/// within a submitted header. `answer_text` is the readable snapshot;
/// `option_id` links the chosen option for single-choice types.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ResponseDetail {
    pub id: i64,
    pub header_id: i64,
    pub question_id: i64,
    pub answer_text: String,
    pub option_id: Option<i64>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting a completed answer set.
/// Keys are question ids; every question of the survey must be present.
#[derive(Debug, Deserialize)]
pub struct SubmitResponseRequest {
    pub answers: HashMap<i64, AnswerInput>,
}

/// DTO returned on successful submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponseResult {
    pub response_id: i64,
    pub reward_points: i64,
    pub balance: i64,
}

/// One row of a respondent's completed-survey history.
#[derive(Debug, Serialize, FromRow)]
pub struct HistoryItem {
    pub response_id: i64,
    pub survey_id: i64,
    pub survey_title: String,
    pub reward_points: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}
