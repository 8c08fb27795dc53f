// ABOUTME: Goal persistence with append-only progress history
// ABOUTME: Initial mark on create, same-day idempotent completion, status writes and hard deletes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{
    double_option, format_date, format_timestamp, parse_date, parse_timestamp, retry_transaction,
    SqliteTransactionGuard, TRANSACTION_RETRIES,
};
use crate::constants::goals::{COMPLETION_NOTE, INITIAL_MARK_NOTE};
use crate::errors::{AppError, AppResult};
use crate::models::{Goal, GoalHistoryEntry, GoalStatus};

const GOAL_COLUMNS: &str = "id, athlete_id, title, metric_label, unit, start_value, target_value, \
     start_date, target_date, status, strategy_notes, created_at, updated_at";

/// Validated values for a new goal
#[derive(Debug, Clone, PartialEq)]
pub struct NewGoal {
    /// Athlete the goal belongs to
    pub subject_id: i64,
    /// Display title
    pub title: String,
    /// Name of the measured metric
    pub metric_label: Option<String>,
    /// Unit
    pub unit: String,
    /// Baseline
    pub start_value: f64,
    /// Target
    pub target_value: f64,
    /// Start day
    pub start_date: NaiveDate,
    /// Deadline
    pub target_date: Option<NaiveDate>,
    /// Coach notes
    pub strategy_notes: Option<String>,
    /// Note on the initial history entry
    pub initial_note: Option<String>,
}

/// Partial goal update; absent keys are left untouched
///
/// Numeric edits never rewrite history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalRequest {
    /// Title
    #[serde(default)]
    pub title: Option<String>,
    /// Metric label, `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub metric_label: Option<Option<String>>,
    /// Unit
    #[serde(default)]
    pub unit: Option<String>,
    /// Baseline
    #[serde(default)]
    pub start_value: Option<f64>,
    /// Target
    #[serde(default)]
    pub target_value: Option<f64>,
    /// Deadline, `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub target_date: Option<Option<NaiveDate>>,
    /// Coach notes, `null` clears them
    #[serde(default, deserialize_with = "double_option")]
    pub strategy_notes: Option<Option<String>>,
}

/// Goal persistence
pub struct GoalsManager {
    pool: SqlitePool,
}

impl GoalsManager {
    /// Create a new goals manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<SqliteTransactionGuard<'static>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;
        Ok(SqliteTransactionGuard::new(tx))
    }

    async fn connection(&self) -> AppResult<sqlx::pool::PoolConnection<sqlx::Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| AppError::database(format!("Failed to acquire connection: {e}")))
    }

    /// Create an active goal together with its initial history entry
    ///
    /// # Errors
    ///
    /// Returns an error if an insert fails
    pub async fn create(&self, goal: &NewGoal) -> AppResult<Goal> {
        let id = retry_transaction(
            || async move {
                let mut guard = self.begin().await?;
                let conn = guard.executor()?;
                let now = Utc::now();

                let result = sqlx::query(
                    r"
                    INSERT INTO goals (
                        athlete_id, title, metric_label, unit, start_value, target_value,
                        start_date, target_date, status, strategy_notes, created_at, updated_at
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
                    ",
                )
                .bind(goal.subject_id)
                .bind(&goal.title)
                .bind(&goal.metric_label)
                .bind(&goal.unit)
                .bind(goal.start_value)
                .bind(goal.target_value)
                .bind(format_date(goal.start_date))
                .bind(goal.target_date.map(format_date))
                .bind(GoalStatus::Active.as_str())
                .bind(&goal.strategy_notes)
                .bind(format_timestamp(&now))
                .execute(&mut *conn)
                .await
                .map_err(|e| AppError::database(format!("Failed to create goal: {e}")))?;
                let id = result.last_insert_rowid();

                let note = goal.initial_note.as_deref().unwrap_or(INITIAL_MARK_NOTE);
                insert_entry(conn, id, goal.start_value, Some(note), now).await?;

                guard.commit().await?;
                Ok(id)
            },
            TRANSACTION_RETRIES,
        )
        .await?;

        info!(goal.id = id, athlete.id = goal.subject_id, "Goal created");
        self.get(id).await
    }

    /// Get a goal with its history
    ///
    /// # Errors
    ///
    /// Returns not-found if the goal does not exist
    pub async fn get(&self, id: i64) -> AppResult<Goal> {
        let mut conn = self.connection().await?;
        fetch_goal(&mut conn, id).await
    }

    /// Goals of an athlete, optionally filtered by status
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_for_athlete(
        &self,
        athlete_id: i64,
        status: Option<GoalStatus>,
    ) -> AppResult<Vec<Goal>> {
        let mut conn = self.connection().await?;
        let rows = sqlx::query(&format!(
            r"
            SELECT {GOAL_COLUMNS} FROM goals
            WHERE athlete_id = $1 AND ($2 IS NULL OR status = $2)
            ORDER BY target_date IS NULL, target_date, id
            "
        ))
        .bind(athlete_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to list goals: {e}")))?;

        let mut goals = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.get("id");
            let history = fetch_history(&mut conn, id).await?;
            goals.push(row_to_goal(row, history)?);
        }
        debug!(athlete.id = athlete_id, count = goals.len(), "Goals listed");
        Ok(goals)
    }

    /// Write a patched goal
    ///
    /// # Errors
    ///
    /// Returns not-found if the goal does not exist
    pub async fn save(&self, goal: &Goal) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE goals
            SET title = $1, metric_label = $2, unit = $3, start_value = $4, target_value = $5,
                target_date = $6, strategy_notes = $7, updated_at = $8
            WHERE id = $9
            ",
        )
        .bind(&goal.title)
        .bind(&goal.metric_label)
        .bind(&goal.unit)
        .bind(goal.start_value)
        .bind(goal.target_value)
        .bind(goal.target_date.map(format_date))
        .bind(&goal.strategy_notes)
        .bind(format_timestamp(&goal.updated_at))
        .bind(goal.id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update goal: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Goal {}", goal.id)));
        }
        info!(goal.id = goal.id, "Goal updated");
        Ok(())
    }

    /// Hard-delete a goal and its history
    ///
    /// # Errors
    ///
    /// Returns not-found if the goal does not exist
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete goal: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Goal {id}")));
        }
        info!(goal.id = id, "Goal deleted");
        Ok(())
    }

    /// Append a progress entry; the goal row itself is untouched
    ///
    /// # Errors
    ///
    /// Returns not-found if the goal does not exist
    pub async fn append_history(
        &self,
        goal_id: i64,
        value: f64,
        notes: Option<&str>,
        recorded_at: DateTime<Utc>,
    ) -> AppResult<GoalHistoryEntry> {
        let mut conn = self.connection().await?;
        ensure_goal_exists(&mut conn, goal_id).await?;
        let entry = insert_entry(&mut conn, goal_id, value, notes, recorded_at).await?;
        debug!(goal.id = goal_id, value, "Goal progress appended");
        Ok(entry)
    }

    /// Mark a goal completed
    ///
    /// Appends a terminal entry at the target value unless the latest entry
    /// was recorded on the same UTC day as `now`.
    ///
    /// # Errors
    ///
    /// Returns not-found if the goal does not exist
    pub async fn complete(&self, goal_id: i64, now: DateTime<Utc>) -> AppResult<Goal> {
        retry_transaction(
            || async move {
                let mut guard = self.begin().await?;
                let conn = guard.executor()?;
                let goal = fetch_goal(conn, goal_id).await?;

                let recorded_today = goal
                    .latest_entry()
                    .is_some_and(|entry| entry.recorded_at.date_naive() == now.date_naive());
                if !recorded_today {
                    insert_entry(conn, goal_id, goal.target_value, Some(COMPLETION_NOTE), now)
                        .await?;
                }
                write_status(conn, goal_id, GoalStatus::Completed, now).await?;

                guard.commit().await?;
                info!(goal.id = goal_id, terminal_entry = !recorded_today, "Goal completed");
                Ok(())
            },
            TRANSACTION_RETRIES,
        )
        .await?;
        self.get(goal_id).await
    }

    /// Plain status write, no history entry
    ///
    /// # Errors
    ///
    /// Returns not-found if the goal does not exist
    pub async fn set_status(&self, goal_id: i64, status: GoalStatus) -> AppResult<()> {
        let mut conn = self.connection().await?;
        write_status(&mut conn, goal_id, status, Utc::now()).await?;
        info!(goal.id = goal_id, status = status.as_str(), "Goal status changed");
        Ok(())
    }
}

async fn ensure_goal_exists(conn: &mut SqliteConnection, goal_id: i64) -> AppResult<()> {
    sqlx::query("SELECT 1 FROM goals WHERE id = $1")
        .bind(goal_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to check goal: {e}")))?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found(format!("Goal {goal_id}")))
}

async fn write_status(
    conn: &mut SqliteConnection,
    goal_id: i64,
    status: GoalStatus,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let result = sqlx::query("UPDATE goals SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status.as_str())
        .bind(format_timestamp(&now))
        .bind(goal_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to update goal status: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!("Goal {goal_id}")));
    }
    Ok(())
}

async fn insert_entry(
    conn: &mut SqliteConnection,
    goal_id: i64,
    value: f64,
    notes: Option<&str>,
    recorded_at: DateTime<Utc>,
) -> AppResult<GoalHistoryEntry> {
    let result = sqlx::query(
        "INSERT INTO goal_history (goal_id, value, notes, recorded_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(goal_id)
    .bind(value)
    .bind(notes)
    .bind(format_timestamp(&recorded_at))
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to append goal history: {e}")))?;

    Ok(GoalHistoryEntry {
        id: result.last_insert_rowid(),
        goal_id,
        value,
        notes: notes.map(str::to_owned),
        recorded_at,
    })
}

async fn fetch_goal(conn: &mut SqliteConnection, id: i64) -> AppResult<Goal> {
    let row = sqlx::query(&format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to get goal: {e}")))?
        .ok_or_else(|| AppError::not_found(format!("Goal {id}")))?;
    let history = fetch_history(conn, id).await?;
    row_to_goal(&row, history)
}

async fn fetch_history(conn: &mut SqliteConnection, goal_id: i64) -> AppResult<Vec<GoalHistoryEntry>> {
    let rows = sqlx::query(
        r"
        SELECT id, goal_id, value, notes, recorded_at FROM goal_history
        WHERE goal_id = $1 ORDER BY recorded_at, id
        ",
    )
    .bind(goal_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to load goal history: {e}")))?;

    rows.iter()
        .map(|row| {
            let recorded_at: String = row.get("recorded_at");
            Ok(GoalHistoryEntry {
                id: row.get("id"),
                goal_id: row.get("goal_id"),
                value: row.get("value"),
                notes: row.get("notes"),
                recorded_at: parse_timestamp(&recorded_at)?,
            })
        })
        .collect()
}

fn row_to_goal(row: &SqliteRow, history: Vec<GoalHistoryEntry>) -> AppResult<Goal> {
    let status: String = row.get("status");
    let start_date: String = row.get("start_date");
    let target_date: Option<String> = row.get("target_date");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Goal {
        id: row.get("id"),
        subject_id: row.get("athlete_id"),
        title: row.get("title"),
        metric_label: row.get("metric_label"),
        unit: row.get("unit"),
        start_value: row.get("start_value"),
        target_value: row.get("target_value"),
        start_date: parse_date(&start_date)?,
        target_date: target_date.as_deref().map(parse_date).transpose()?,
        status: GoalStatus::parse(&status),
        strategy_notes: row.get("strategy_notes"),
        history,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
