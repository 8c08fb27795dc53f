// ABOUTME: Session persistence with embedded template snapshots and participant rows
// ABOUTME: Whole-map value replacement, finish timing writes, hard deletes and record-history scans
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! # Session Storage
//!
//! The snapshot column is written once by `insert_session` and never updated.
//! Value maps are stored as JSON and replaced wholesale on every write.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{format_date, format_timestamp, parse_date, parse_timestamp};
use crate::errors::{AppError, AppResult};
use crate::models::{
    FieldValues, ResolvedTiming, Session, Subject, SubjectValues, TemplateSnapshot,
};

const SESSION_COLUMNS: &str = "id, template_id, snapshot, general_values, subject_values, \
     session_date, start_time, end_time, duration_seconds, notes, created_at";

/// Filters for listing sessions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ListSessionsFilter {
    /// Only sessions this athlete takes part in
    pub subject_id: Option<i64>,
    /// Only sessions created from this template
    pub template_id: Option<i64>,
}

/// Values written by a finish
#[derive(Debug, Clone)]
pub struct FinishWrite<'a> {
    /// General values
    pub general_values: &'a FieldValues,
    /// Per-subject values
    pub subject_values: &'a SubjectValues,
    /// Notes
    pub notes: Option<&'a str>,
    /// Resolved start, end and duration
    pub timing: ResolvedTiming,
}

/// Session persistence
pub struct SessionsManager {
    pool: SqlitePool,
}

impl SessionsManager {
    /// Create a new sessions manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> AppResult<sqlx::pool::PoolConnection<sqlx::Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| AppError::database(format!("Failed to acquire connection: {e}")))
    }

    /// Get a session with its participants
    ///
    /// # Errors
    ///
    /// Returns not-found if the session does not exist
    pub async fn get(&self, id: i64) -> AppResult<Session> {
        let mut conn = self.connection().await?;
        fetch_session(&mut conn, id).await
    }

    /// List sessions, most recent first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list(&self, filter: ListSessionsFilter) -> AppResult<Vec<Session>> {
        let mut conn = self.connection().await?;
        let rows = sqlx::query(&format!(
            r"
            SELECT {SESSION_COLUMNS} FROM sessions s
            WHERE ($1 IS NULL OR s.template_id = $1)
              AND ($2 IS NULL OR EXISTS (
                    SELECT 1 FROM session_participants p
                    WHERE p.session_id = s.id AND p.athlete_id = $2))
            ORDER BY s.session_date DESC, s.start_time DESC, s.id DESC
            "
        ))
        .bind(filter.template_id)
        .bind(filter.subject_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to list sessions: {e}")))?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.get("id");
            let participants = fetch_participants(&mut conn, id).await?;
            sessions.push(row_to_session(row, participants)?);
        }
        debug!(count = sessions.len(), "Sessions listed");
        Ok(sessions)
    }

    /// Replace the value maps (and notes when given) of a session
    ///
    /// `subject_values = None` keeps the stored per-subject map.
    ///
    /// # Errors
    ///
    /// Returns not-found if the session does not exist
    pub async fn replace_values(
        &self,
        id: i64,
        general_values: &FieldValues,
        subject_values: Option<&SubjectValues>,
        notes: Option<&str>,
    ) -> AppResult<()> {
        let subject_json = subject_values.map(serde_json::to_string).transpose()?;
        let result = sqlx::query(
            r"
            UPDATE sessions
            SET general_values = $1,
                subject_values = COALESCE($2, subject_values),
                notes = COALESCE($3, notes)
            WHERE id = $4
            ",
        )
        .bind(serde_json::to_string(general_values)?)
        .bind(subject_json)
        .bind(notes)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update session values: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Session {id}")));
        }
        debug!(session.id = id, "Session values replaced");
        Ok(())
    }

    /// Hard-delete a session and its participant rows
    ///
    /// # Errors
    ///
    /// Returns not-found if the session does not exist
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete session: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Session {id}")));
        }
        info!(session.id = id, "Session deleted");
        Ok(())
    }
}

/// Insert a session with its snapshot and participants
///
/// # Errors
///
/// Returns an error if an insert fails
pub async fn insert_session(
    conn: &mut SqliteConnection,
    snapshot: &TemplateSnapshot,
    participants: &[Subject],
    session_date: NaiveDate,
    start_time: DateTime<Utc>,
) -> AppResult<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO sessions (
            template_id, snapshot, general_values, subject_values,
            session_date, start_time, created_at
        ) VALUES ($1, $2, '{}', '{}', $3, $4, $4)
        ",
    )
    .bind(snapshot.template_id)
    .bind(serde_json::to_string(snapshot)?)
    .bind(format_date(session_date))
    .bind(format_timestamp(&start_time))
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to create session: {e}")))?;
    let session_id = result.last_insert_rowid();

    for (position, subject) in participants.iter().enumerate() {
        sqlx::query(
            "INSERT INTO session_participants (session_id, athlete_id, position) VALUES ($1, $2, $3)",
        )
        .bind(session_id)
        .bind(subject.id)
        .bind(i64::try_from(position).unwrap_or(i64::MAX))
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to add session participant: {e}")))?;
    }
    Ok(session_id)
}

/// Load a session with its participants on an existing connection
///
/// # Errors
///
/// Returns not-found if the session does not exist
pub async fn fetch_session(conn: &mut SqliteConnection, id: i64) -> AppResult<Session> {
    let row = sqlx::query(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to get session: {e}")))?
        .ok_or_else(|| AppError::not_found(format!("Session {id}")))?;
    let participants = fetch_participants(conn, id).await?;
    row_to_session(&row, participants)
}

/// Persist the outcome of a finish
///
/// The snapshot column is not part of this statement.
///
/// # Errors
///
/// Returns not-found if the session does not exist
pub async fn write_finish(
    conn: &mut SqliteConnection,
    id: i64,
    write: &FinishWrite<'_>,
) -> AppResult<()> {
    let result = sqlx::query(
        r"
        UPDATE sessions
        SET general_values = $1, subject_values = $2, notes = $3,
            start_time = $4, end_time = $5, duration_seconds = $6
        WHERE id = $7
        ",
    )
    .bind(serde_json::to_string(write.general_values)?)
    .bind(serde_json::to_string(write.subject_values)?)
    .bind(write.notes)
    .bind(format_timestamp(&write.timing.start_time))
    .bind(format_timestamp(&write.timing.end_time))
    .bind(write.timing.duration_seconds)
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to finish session: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!("Session {id}")));
    }
    Ok(())
}

/// General value maps of an athlete's completed sessions for a template
///
/// `exclude_session_id` keeps the session being finished out of its own history.
///
/// # Errors
///
/// Returns an error if the query fails or a stored map is corrupt
pub async fn completed_general_values(
    conn: &mut SqliteConnection,
    athlete_id: i64,
    template_id: i64,
    exclude_session_id: Option<i64>,
) -> AppResult<Vec<FieldValues>> {
    let rows = sqlx::query(
        r"
        SELECT s.general_values FROM sessions s
        JOIN session_participants p ON p.session_id = s.id
        WHERE p.athlete_id = $1 AND s.template_id = $2
          AND s.end_time IS NOT NULL AND ($3 IS NULL OR s.id <> $3)
        ORDER BY s.id
        ",
    )
    .bind(athlete_id)
    .bind(template_id)
    .bind(exclude_session_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to load session history: {e}")))?;

    rows.iter()
        .map(|row| {
            let raw: String = row.get("general_values");
            serde_json::from_str(&raw).map_err(AppError::from)
        })
        .collect()
}

async fn fetch_participants(conn: &mut SqliteConnection, session_id: i64) -> AppResult<Vec<Subject>> {
    let rows = sqlx::query(
        r"
        SELECT a.id, a.name FROM session_participants p
        JOIN athletes a ON a.id = p.athlete_id
        WHERE p.session_id = $1
        ORDER BY p.position
        ",
    )
    .bind(session_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to load session participants: {e}")))?;

    Ok(rows
        .iter()
        .map(|row| Subject {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

fn row_to_session(row: &SqliteRow, participants: Vec<Subject>) -> AppResult<Session> {
    let snapshot: String = row.get("snapshot");
    let general_values: String = row.get("general_values");
    let subject_values: String = row.get("subject_values");
    let session_date: String = row.get("session_date");
    let start_time: String = row.get("start_time");
    let end_time: Option<String> = row.get("end_time");
    let created_at: String = row.get("created_at");

    Ok(Session {
        id: row.get("id"),
        template_snapshot: serde_json::from_str(&snapshot)?,
        participants,
        general_values: serde_json::from_str(&general_values)?,
        subject_values: serde_json::from_str(&subject_values)?,
        session_date: parse_date(&session_date)?,
        start_time: parse_timestamp(&start_time)?,
        end_time: end_time.as_deref().map(parse_timestamp).transpose()?,
        duration_seconds: row.get("duration_seconds"),
        notes: row.get("notes"),
        created_at: parse_timestamp(&created_at)?,
    })
}
