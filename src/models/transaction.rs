// src/models/transaction.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Tag for the economic event a transaction records.
/// Stored as the display string in the `transaction_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum TransactionType {
    #[serde(rename = "TOP UP")]
    #[sqlx(rename = "TOP UP")]
    TopUp,
    #[serde(rename = "WITHDRAW")]
    #[sqlx(rename = "WITHDRAW")]
    Withdraw,
    #[serde(rename = "REWARD SURVEY")]
    #[sqlx(rename = "REWARD SURVEY")]
    RewardSurvey,
    #[serde(rename = "COST SURVEY")]
    #[sqlx(rename = "COST SURVEY")]
    CostSurvey,
}

/// Represents the 'transactions' table: the append-only point ledger.
/// Rows are never mutated after insert; a user's cached balance must equal the
/// signed sum of their non-deleted rows.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    /// Signed point delta: positive for TOP UP / REWARD SURVEY, negative for
    /// WITHDRAW / COST SURVEY.
    pub amount: i64,
    pub description: String,
    pub transaction_type: TransactionType,
    /// Set for REWARD SURVEY / COST SURVEY entries.
    pub survey_id: Option<i64>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for top-up and withdraw requests.
#[derive(Debug, Deserialize, Validate)]
pub struct AmountRequest {
    #[validate(range(min = 1, message = "Amount must be positive."))]
    pub amount: i64,
}
