// ABOUTME: Transaction management with RAII guards and retry for SQLite lock contention
// ABOUTME: Multi-row mutations commit all-or-nothing; only "database is locked" failures are retried
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! Transaction management with RAII guards and retry patterns
//!
//! Multi-row writes (reorders, session finish with records, goal completion)
//! run inside a [`TransactionGuard`]. Dropping the guard on an early `?`
//! return rolls every statement back.
//!
//! ```text
//! retry_transaction(|| async {
//!     let mut guard = TransactionGuard::new(pool.begin().await?);
//!     sqlx::query("UPDATE template_fields ...").execute(guard.executor()?).await?;
//!     sqlx::query("UPDATE template_fields ...").execute(guard.executor()?).await?;
//!     guard.commit().await
//! }, TRANSACTION_RETRIES).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use sqlx::{Database, Transaction};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::errors::{AppError, AppResult, ErrorCode};

/// Retry a transactional operation when `SQLite` reports lock contention
///
/// Business failures (validation, not found) and every other database error
/// are returned immediately. Backoff doubles from 20ms.
///
/// # Errors
///
/// Returns the last error once `max_retries` attempts are exhausted, or the
/// first non-retryable error
pub async fn retry_transaction<F, Fut, T>(mut f: F, max_retries: u32) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempts = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempts += 1;
                if !is_retryable_error(&e) {
                    return Err(e);
                }
                if attempts >= max_retries {
                    error!(
                        attempts,
                        max_retries,
                        error = %e,
                        "Transaction failed after max retries"
                    );
                    return Err(e);
                }
                let backoff_ms = 10_u64 << attempts;
                warn!(
                    attempt = attempts,
                    max_retries,
                    backoff_ms,
                    error = %e,
                    "Database locked, retrying transaction after backoff"
                );
                sleep(Duration::from_millis(backoff_ms)).await;
            }
        }
    }
}

/// Only lock contention is transient; constraint violations and the rest are not
fn is_retryable_error(error: &AppError) -> bool {
    if error.code != ErrorCode::DatabaseError {
        return false;
    }
    let message = error.message.to_lowercase();
    message.contains("database is locked") || message.contains("database table is locked")
}

/// Transaction that rolls back when dropped before `commit()`
pub struct TransactionGuard<'c, DB: Database> {
    transaction: Option<Transaction<'c, DB>>,
}

impl<'c, DB: Database> TransactionGuard<'c, DB> {
    /// Wrap a transaction obtained from `pool.begin()`
    #[must_use]
    pub fn new(transaction: Transaction<'c, DB>) -> Self {
        Self {
            transaction: Some(transaction),
        }
    }

    /// Commit the transaction and consume the guard
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails or the guard was already consumed
    pub async fn commit(mut self) -> AppResult<()> {
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| AppError::internal("Transaction already committed"))?;
        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Transaction commit failed: {e}")))
    }

    /// Connection to execute statements inside the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the guard is used after commit
    pub fn executor(&mut self) -> AppResult<&mut <DB as Database>::Connection> {
        self.transaction
            .as_deref_mut()
            .ok_or_else(|| AppError::internal("Transaction guard used after commit"))
    }
}

impl<DB: Database> Drop for TransactionGuard<'_, DB> {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            debug!("Transaction dropped without commit, rolling back");
        }
    }
}

/// `SQLite` transaction guard
pub type SqliteTransactionGuard<'c> = TransactionGuard<'c, sqlx::Sqlite>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_locked_database_is_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry_transaction(
            || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AppError::database("Failed to update: database is locked"))
                } else {
                    Ok(7)
                }
            },
            3,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: AppResult<()> = retry_transaction(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::not_found("Field 9"))
            },
            3,
        )
        .await;

        assert_eq!(result.unwrap_err().code, ErrorCode::ResourceNotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_guard_rolls_back() {
        let database = crate::database::Database::new("sqlite::memory:").await.unwrap();
        {
            let mut guard = database.begin().await.unwrap();
            sqlx::query("INSERT INTO sports (name, created_at) VALUES ('Rowing', $1)")
                .bind("2025-01-01T00:00:00.000000Z")
                .execute(guard.executor().unwrap())
                .await
                .unwrap();
        }
        assert!(database.sports().list().await.unwrap().is_empty());
    }
}
