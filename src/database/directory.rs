// ABOUTME: Sport and athlete directory persistence
// ABOUTME: Minimal identity records that templates, sessions, goals and records reference by id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use tracing::info;

use super::{format_timestamp, parse_timestamp, SqliteTransactionGuard};
use crate::constants::fields::MAX_LABEL_LENGTH;
use crate::errors::{AppError, AppResult};
use crate::models::{Athlete, Sport, Subject};

/// Request to create a sport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSportRequest {
    /// Display name
    pub name: String,
}

/// Request to create an athlete
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAthleteRequest {
    /// Display name
    pub name: String,
    /// Sports the athlete practices
    #[serde(default)]
    pub sport_ids: Vec<i64>,
}

/// Trim and bound a display name
///
/// # Errors
///
/// Returns a validation error for blank or overlong names
pub fn validate_name(field: &str, name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_field(field, "must not be empty"));
    }
    if trimmed.chars().count() > MAX_LABEL_LENGTH {
        return Err(AppError::invalid_field(
            field,
            format!("must be at most {MAX_LABEL_LENGTH} characters"),
        ));
    }
    Ok(trimmed.to_owned())
}

/// Sport persistence
pub struct SportsManager {
    pool: SqlitePool,
}

impl SportsManager {
    /// Create a new sports manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a sport
    ///
    /// # Errors
    ///
    /// Returns an error on a blank name or database failure
    pub async fn create(&self, request: &CreateSportRequest) -> AppResult<Sport> {
        let name = validate_name("name", &request.name)?;
        let now = Utc::now();

        let result = sqlx::query("INSERT INTO sports (name, created_at) VALUES ($1, $2)")
            .bind(&name)
            .bind(format_timestamp(&now))
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create sport: {e}")))?;

        let id = result.last_insert_rowid();
        info!(sport.id = id, sport.name = %name, "Sport created");
        Ok(Sport {
            id,
            name,
            created_at: now,
        })
    }

    /// Get a sport by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get(&self, id: i64) -> AppResult<Option<Sport>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::database(format!("Failed to acquire connection: {e}")))?;
        fetch_sport(&mut conn, id).await
    }

    /// List all sports by name
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list(&self) -> AppResult<Vec<Sport>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM sports ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list sports: {e}")))?;
        rows.iter().map(row_to_sport).collect()
    }
}

/// Load a sport on an existing connection
///
/// # Errors
///
/// Returns an error if the query fails
pub async fn fetch_sport(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<Sport>> {
    let row = sqlx::query("SELECT id, name, created_at FROM sports WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to get sport: {e}")))?;
    row.as_ref().map(row_to_sport).transpose()
}

/// Athlete persistence
pub struct AthletesManager {
    pool: SqlitePool,
}

impl AthletesManager {
    /// Create a new athletes manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an athlete and link their sports
    ///
    /// # Errors
    ///
    /// Returns an error on a blank name, an unknown sport, or database failure
    pub async fn create(&self, request: &CreateAthleteRequest) -> AppResult<Athlete> {
        let name = validate_name("name", &request.name)?;
        let mut sport_ids = request.sport_ids.clone();
        sport_ids.sort_unstable();
        sport_ids.dedup();
        let now = Utc::now();

        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;
        let mut guard = SqliteTransactionGuard::new(tx);
        let conn = guard.executor()?;

        let result = sqlx::query("INSERT INTO athletes (name, created_at) VALUES ($1, $2)")
            .bind(&name)
            .bind(format_timestamp(&now))
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database(format!("Failed to create athlete: {e}")))?;
        let id = result.last_insert_rowid();

        for sport_id in &sport_ids {
            if fetch_sport(conn, *sport_id).await?.is_none() {
                return Err(AppError::not_found(format!("Sport {sport_id}")));
            }
            sqlx::query("INSERT INTO athlete_sports (athlete_id, sport_id) VALUES ($1, $2)")
                .bind(id)
                .bind(sport_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| AppError::database(format!("Failed to link athlete sport: {e}")))?;
        }

        guard.commit().await?;
        info!(athlete.id = id, sports = sport_ids.len(), "Athlete created");

        Ok(Athlete {
            id,
            name,
            sport_ids,
            created_at: now,
        })
    }

    /// Get an athlete with their sports
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get(&self, id: i64) -> AppResult<Option<Athlete>> {
        let row = sqlx::query("SELECT id, name, created_at FROM athletes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get athlete: {e}")))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let sport_ids = self.sport_ids(id).await?;
        row_to_athlete(&row, sport_ids).map(Some)
    }

    /// List all athletes by name
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list(&self) -> AppResult<Vec<Athlete>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM athletes ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list athletes: {e}")))?;

        let mut athletes = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.get("id");
            athletes.push(row_to_athlete(row, self.sport_ids(id).await?)?);
        }
        Ok(athletes)
    }

    /// Whether an athlete exists
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn exists(&self, id: i64) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM athletes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to check athlete: {e}")))?;
        Ok(row.is_some())
    }

    async fn sport_ids(&self, athlete_id: i64) -> AppResult<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT sport_id FROM athlete_sports WHERE athlete_id = $1 ORDER BY sport_id",
        )
        .bind(athlete_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load athlete sports: {e}")))?;
        Ok(rows.iter().map(|row| row.get("sport_id")).collect())
    }
}

/// Resolve subjects by id on an existing connection, preserving input order
///
/// # Errors
///
/// Returns not-found for the first unknown id
pub async fn fetch_subjects(conn: &mut SqliteConnection, ids: &[i64]) -> AppResult<Vec<Subject>> {
    let mut subjects = Vec::with_capacity(ids.len());
    for id in ids {
        let row = sqlx::query("SELECT id, name FROM athletes WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::database(format!("Failed to get athlete: {e}")))?
            .ok_or_else(|| AppError::not_found(format!("Athlete {id}")))?;
        subjects.push(Subject {
            id: row.get("id"),
            name: row.get("name"),
        });
    }
    Ok(subjects)
}

fn row_to_sport(row: &SqliteRow) -> AppResult<Sport> {
    let created_at: String = row.get("created_at");
    Ok(Sport {
        id: row.get("id"),
        name: row.get("name"),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_athlete(row: &SqliteRow, sport_ids: Vec<i64>) -> AppResult<Athlete> {
    let created_at: String = row.get("created_at");
    Ok(Athlete {
        id: row.get("id"),
        name: row.get("name"),
        sport_ids,
        created_at: parse_timestamp(&created_at)?,
    })
}
