// ABOUTME: Personal record persistence
// ABOUTME: Additive inserts deduplicated per athlete, session and title; listing and hard deletion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use tracing::info;

use super::{format_timestamp, parse_timestamp};
use crate::errors::{AppError, AppResult};
use crate::models::{NewPersonalRecord, PersonalRecord};

/// Personal record persistence
pub struct RecordsManager {
    pool: SqlitePool,
}

impl RecordsManager {
    /// Create a new records manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Records of an athlete, most recent first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_for_athlete(&self, athlete_id: i64) -> AppResult<Vec<PersonalRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, athlete_id, title, value, unit, achieved_at, session_id
            FROM personal_records WHERE athlete_id = $1
            ORDER BY achieved_at DESC, id DESC
            ",
        )
        .bind(athlete_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list personal records: {e}")))?;
        rows.iter().map(row_to_record).collect()
    }

    /// Hard-delete a record
    ///
    /// # Errors
    ///
    /// Returns not-found if the record does not exist
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM personal_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete personal record: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Personal record {id}")));
        }
        info!(record.id = id, "Personal record deleted");
        Ok(())
    }
}

/// Insert a record unless the same session already produced it with this value
///
/// Returns `None` when an identical `(athlete, session, title, value)` record exists.
///
/// # Errors
///
/// Returns an error if the insert fails
pub async fn insert_record_if_absent(
    conn: &mut SqliteConnection,
    record: &NewPersonalRecord,
) -> AppResult<Option<PersonalRecord>> {
    let result = sqlx::query(
        r"
        INSERT OR IGNORE INTO personal_records
            (athlete_id, title, value, unit, achieved_at, session_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(record.subject_id)
    .bind(&record.title)
    .bind(record.value)
    .bind(&record.unit)
    .bind(format_timestamp(&record.achieved_at))
    .bind(record.session_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to create personal record: {e}")))?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let id = result.last_insert_rowid();
    info!(
        record.id = id,
        athlete.id = record.subject_id,
        record.title = %record.title,
        record.value = record.value,
        "Personal record created"
    );
    Ok(Some(PersonalRecord {
        id,
        subject_id: record.subject_id,
        title: record.title.clone(),
        value: record.value,
        unit: record.unit.clone(),
        achieved_at: record.achieved_at,
        session_id: record.session_id,
    }))
}

fn row_to_record(row: &SqliteRow) -> AppResult<PersonalRecord> {
    let achieved_at: String = row.get("achieved_at");
    Ok(PersonalRecord {
        id: row.get("id"),
        subject_id: row.get("athlete_id"),
        title: row.get("title"),
        value: row.get("value"),
        unit: row.get("unit"),
        achieved_at: parse_timestamp(&achieved_at)?,
        session_id: row.get("session_id"),
    })
}
