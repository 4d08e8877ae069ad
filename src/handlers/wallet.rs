// src/handlers/wallet.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    ledger,
    models::transaction::{AmountRequest, Transaction, TransactionType},
    utils::jwt::Claims,
};

/// Credits points to the caller's balance.
pub async fn top_up(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AmountRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;
    let balance = ledger::apply_transaction(
        &mut tx,
        user_id,
        payload.amount,
        TransactionType::TopUp,
        "Top Up",
        None,
    )
    .await?;
    tx.commit().await?;

    Ok(Json(serde_json::json!({ "balance": balance })))
}

/// Debits points from the caller's balance.
/// Rejected with `InsufficientBalance` when the amount exceeds the balance;
/// no transaction row is created in that case.
pub async fn withdraw(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AmountRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;
    let balance = ledger::apply_transaction(
        &mut tx,
        user_id,
        -payload.amount,
        TransactionType::Withdraw,
        "Withdraw",
        None,
    )
    .await?;
    tx.commit().await?;

    Ok(Json(serde_json::json!({ "balance": balance })))
}

/// Lists the caller's transaction log, newest first.
pub async fn list_transactions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let transactions = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE user_id = ? AND deleted_at IS NULL
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(transactions))
}

/// Recomputes the caller's cached balance from the transaction log.
/// The log is authoritative; this surfaces (and repairs) any drift.
pub async fn reconcile(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let balance = ledger::recompute_balance(&pool, user_id).await?;

    Ok(Json(serde_json::json!({ "balance": balance })))
}
