// src/ledger.rs
//
// The point ledger is the only code allowed to touch `users.point`. Every
// balance change (top-up, withdraw, survey cost, survey reward) goes through
// `apply_transaction`, which appends a transaction row and moves the cached
// balance in the same storage transaction as the caller's other writes.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::AppError;
use crate::models::transaction::TransactionType;

/// Applies a signed point delta to a user inside the caller's transaction.
///
/// The balance update is guarded (`point + delta >= 0`) in a single UPDATE, so
/// two racing debits against a borderline balance cannot both pass: the losing
/// one matches zero rows and surfaces as `InsufficientBalance` with no partial
/// state. Returns the new cached balance.
pub async fn apply_transaction(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    amount: i64,
    kind: TransactionType,
    description: &str,
    survey_id: Option<i64>,
) -> Result<i64, AppError> {
    let updated = sqlx::query(
        "UPDATE users SET point = point + ?1 WHERE id = ?2 AND point + ?1 >= 0",
    )
    .bind(amount)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    if updated.rows_affected() == 0 {
        // Zero rows means either an unknown user or a would-be negative balance.
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;
        return match exists {
            None => Err(AppError::NotFound("User not found".to_string())),
            Some(_) => Err(AppError::InsufficientBalance(format!(
                "Balance cannot cover {} points",
                -amount
            ))),
        };
    }

    sqlx::query(
        r#"
        INSERT INTO transactions (user_id, amount, description, transaction_type, survey_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(description)
    .bind(kind)
    .bind(survey_id)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    let balance: i64 = sqlx::query_scalar("SELECT point FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

    Ok(balance)
}

/// Recomputes the cached balance from the transaction log.
///
/// The log is authoritative; this reconciliation exists for auditing and for
/// tests asserting that the cached value never drifts from the signed sum of
/// non-deleted transactions. Returns the recomputed balance.
pub async fn recompute_balance(pool: &SqlitePool, user_id: i64) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    let sum: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE user_id = ? AND deleted_at IS NULL",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    let updated = sqlx::query("UPDATE users SET point = ? WHERE id = ?")
        .bind(sum)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tx.commit().await?;

    Ok(sum)
}
