// ABOUTME: Template persistence with soft deletion
// ABOUTME: Name, description and sport per template; deleted templates stay readable for history
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use tracing::info;

use super::directory::{fetch_sport, validate_name};
use super::{double_option, format_timestamp, parse_timestamp};
use crate::errors::{AppError, AppResult};
use crate::models::{LifecycleStatus, Template};

const TEMPLATE_COLUMNS: &str = "id, name, description, sport_id, status, created_at, updated_at";

/// Request to create a template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    /// Display name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Owning sport
    pub sport_id: i64,
}

/// Partial template update; absent keys are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New description, `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    /// New sport
    #[serde(default)]
    pub sport_id: Option<i64>,
}

/// Template persistence
pub struct TemplatesManager {
    pool: SqlitePool,
}

impl TemplatesManager {
    /// Create a new templates manager
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

    /// Create a template under an existing sport
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name, not-found for an unknown sport
    pub async fn create(&self, request: &CreateTemplateRequest) -> AppResult<Template> {
        let name = validate_name("name", &request.name)?;
        let mut conn = self.connection().await?;
        if fetch_sport(&mut conn, request.sport_id).await?.is_none() {
            return Err(AppError::not_found(format!("Sport {}", request.sport_id)));
        }

        let now = Utc::now();
        let description = normalize_description(request.description.as_deref());
        let result = sqlx::query(
            r"
            INSERT INTO templates (name, description, sport_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ",
        )
        .bind(&name)
        .bind(&description)
        .bind(request.sport_id)
        .bind(LifecycleStatus::Active.as_str())
        .bind(format_timestamp(&now))
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to create template: {e}")))?;

        let id = result.last_insert_rowid();
        info!(template.id = id, sport.id = request.sport_id, "Template created");

        Ok(Template {
            id,
            name,
            description,
            sport_id: request.sport_id,
            status: LifecycleStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a template by id, including soft-deleted ones
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get(&self, id: i64) -> AppResult<Option<Template>> {
        let mut conn = self.connection().await?;
        fetch_template(&mut conn, id).await
    }

    /// List active templates, optionally for one sport
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list(&self, sport_id: Option<i64>) -> AppResult<Vec<Template>> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {TEMPLATE_COLUMNS} FROM templates
            WHERE status = 'active' AND ($1 IS NULL OR sport_id = $1)
            ORDER BY name, id
            "
        ))
        .bind(sport_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list templates: {e}")))?;
        rows.iter().map(row_to_template).collect()
    }

    /// Patch an active template
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing or deleted template or unknown sport
    pub async fn update(&self, id: i64, patch: &UpdateTemplateRequest) -> AppResult<Template> {
        let mut conn = self.connection().await?;
        let mut template = fetch_template(&mut conn, id)
            .await?
            .filter(|t| t.status == LifecycleStatus::Active)
            .ok_or_else(|| AppError::not_found(format!("Template {id}")))?;

        if let Some(name) = &patch.name {
            template.name = validate_name("name", name)?;
        }
        if let Some(description) = &patch.description {
            template.description = normalize_description(description.as_deref());
        }
        if let Some(sport_id) = patch.sport_id {
            if fetch_sport(&mut conn, sport_id).await?.is_none() {
                return Err(AppError::not_found(format!("Sport {sport_id}")));
            }
            template.sport_id = sport_id;
        }
        template.updated_at = Utc::now();

        sqlx::query(
            r"
            UPDATE templates SET name = $1, description = $2, sport_id = $3, updated_at = $4
            WHERE id = $5
            ",
        )
        .bind(&template.name)
        .bind(&template.description)
        .bind(template.sport_id)
        .bind(format_timestamp(&template.updated_at))
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to update template: {e}")))?;

        info!(template.id = id, "Template updated");
        Ok(template)
    }

    /// Mark a template deleted; its fields and past sessions are untouched
    ///
    /// # Errors
    ///
    /// Returns not-found if the template is missing or already deleted
    pub async fn soft_delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE templates SET status = 'deleted', updated_at = $1 WHERE id = $2 AND status = 'active'",
        )
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete template: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Template {id}")));
        }
        info!(template.id = id, "Template soft-deleted");
        Ok(())
    }
}

/// Load a template on an existing connection
///
/// # Errors
///
/// Returns an error if the query fails
pub async fn fetch_template(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<Template>> {
    let row = sqlx::query(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to get template: {e}")))?;
    row.as_ref().map(row_to_template).transpose()
}

/// Load an active template or fail with not-found
///
/// # Errors
///
/// Returns not-found for a missing or soft-deleted template
pub async fn fetch_active_template(conn: &mut SqliteConnection, id: i64) -> AppResult<Template> {
    fetch_template(conn, id)
        .await?
        .filter(|t| t.status == LifecycleStatus::Active)
        .ok_or_else(|| AppError::not_found(format!("Template {id}")))
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_owned)
}

fn row_to_template(row: &SqliteRow) -> AppResult<Template> {
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    Ok(Template {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        sport_id: row.get("sport_id"),
        status: LifecycleStatus::parse(&status),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
