// ABOUTME: Field definition persistence for template schemas
// ABOUTME: Unique key assignment, scoped sort order, config merge, cycle-checked reparenting, atomic reorder
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! # Field Schema Store
//!
//! Fields form a tree through a nullable `parent_id`, stored flat. Keys are
//! unique among the active fields of a template (enforced by a partial unique
//! index); soft deletion frees the key. Deleting a parent never cascades.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::directory::validate_name;
use super::templates::fetch_active_template;
use super::{
    double_option, format_timestamp, parse_timestamp, retry_transaction, SqliteTransactionGuard,
    TRANSACTION_RETRIES,
};
use crate::errors::{AppError, AppResult, FieldError};
use crate::models::{
    derive_key, merge_config, unique_key, FieldDefinition, FieldKind, FieldScope, FieldType,
    LifecycleStatus,
};

const FIELD_COLUMNS: &str = "id, template_id, key, label, field_type, unit, sort_order, required, \
     form_scope, parent_id, config, status, created_at, updated_at";

/// Request to create a field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFieldRequest {
    /// Display label; the key is derived from it
    pub label: String,
    /// Field type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Capture scope
    #[serde(default)]
    pub form_scope: FieldScope,
    /// Composite parent in the same template
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Type-specific configuration
    #[serde(default)]
    pub config: Option<Value>,
    /// Unit shown next to the value
    #[serde(default)]
    pub unit: Option<String>,
    /// Whether a value is expected
    #[serde(default)]
    pub required: bool,
}

/// Partial field update; absent keys are left untouched
///
/// The key never changes, even when the label does.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFieldRequest {
    /// New label
    #[serde(default)]
    pub label: Option<String>,
    /// Unit, `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub unit: Option<Option<String>>,
    /// Required flag
    #[serde(default)]
    pub required: Option<bool>,
    /// Config patch, merged shallowly over the stored config
    #[serde(default)]
    pub config: Option<Value>,
    /// New parent, `null` moves the field to the root
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<i64>>,
}

/// One entry of a batch reorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOrder {
    /// Field id
    pub id: i64,
    /// New sort order
    pub sort_order: i64,
}

/// Field definition persistence
pub struct FieldsManager {
    pool: SqlitePool,
}

impl FieldsManager {
    /// Create a new fields manager
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

    /// Create a field with a derived unique key and the next sort order
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing template, a validation error for a bad
    /// label, config or parent
    pub async fn create(
        &self,
        template_id: i64,
        request: &CreateFieldRequest,
    ) -> AppResult<FieldDefinition> {
        let label = validate_name("label", &request.label)?;
        let kind = FieldKind::from_parts(
            request.field_type,
            request.config.as_ref().unwrap_or(&Value::Null),
        )?;
        let unit = normalize_unit(request.unit.as_deref());

        retry_transaction(
            || {
                let label = label.clone();
                let kind = kind.clone();
                let unit = unit.clone();
                async move {
                    let mut guard = self.begin().await?;
                    let conn = guard.executor()?;
                    fetch_active_template(conn, template_id).await?;

                    if let Some(parent_id) = request.parent_id {
                        let parent = fetch_field(conn, parent_id).await?;
                        validate_parent(&parent, template_id, request.form_scope, None)?;
                    }

                    let key = unique_key(&derive_key(&label), &active_keys(conn, template_id).await?);
                    let sort_order =
                        next_sort_order(conn, template_id, request.form_scope, request.parent_id)
                            .await?;
                    let now = Utc::now();

                    let result = sqlx::query(
                        r"
                        INSERT INTO template_fields (
                            template_id, key, label, field_type, unit, sort_order, required,
                            form_scope, parent_id, config, status, created_at, updated_at
                        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
                        ",
                    )
                    .bind(template_id)
                    .bind(&key)
                    .bind(&label)
                    .bind(kind.field_type().as_str())
                    .bind(&unit)
                    .bind(sort_order)
                    .bind(request.required)
                    .bind(request.form_scope.as_str())
                    .bind(request.parent_id)
                    .bind(kind.config_value().to_string())
                    .bind(LifecycleStatus::Active.as_str())
                    .bind(format_timestamp(&now))
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| AppError::database(format!("Failed to create field: {e}")))?;
                    let id = result.last_insert_rowid();

                    guard.commit().await?;
                    info!(
                        field.id = id,
                        template.id = template_id,
                        field.key = %key,
                        field.kind = kind.field_type().as_str(),
                        "Field created"
                    );

                    Ok(FieldDefinition {
                        id,
                        template_id,
                        key,
                        label,
                        kind,
                        unit,
                        sort_order,
                        required: request.required,
                        scope: request.form_scope,
                        parent_id: request.parent_id,
                        status: LifecycleStatus::Active,
                        created_at: now,
                        updated_at: now,
                    })
                }
            },
            TRANSACTION_RETRIES,
        )
        .await
    }

    /// Get a field by id, including soft-deleted ones
    ///
    /// # Errors
    ///
    /// Returns not-found if no field has this id
    pub async fn get(&self, id: i64) -> AppResult<FieldDefinition> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::database(format!("Failed to acquire connection: {e}")))?;
        fetch_field(&mut conn, id).await
    }

    /// Patch an active field
    ///
    /// `config` is merged shallowly over the stored config and re-validated
    /// against the field type. A new parent is checked for the same template,
    /// composite type, same scope and absence of cycles.
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing or deleted field, validation errors
    /// for bad input
    pub async fn update(&self, id: i64, patch: &UpdateFieldRequest) -> AppResult<FieldDefinition> {
        retry_transaction(
            || async move {
                let mut guard = self.begin().await?;
                let conn = guard.executor()?;

                let mut field = fetch_field(conn, id).await?;
                if !field.is_active() {
                    return Err(AppError::not_found(format!("Field {id}")));
                }

                if let Some(label) = &patch.label {
                    field.label = validate_name("label", label)?;
                }
                if let Some(unit) = &patch.unit {
                    field.unit = normalize_unit(unit.as_deref());
                }
                if let Some(required) = patch.required {
                    field.required = required;
                }
                if let Some(config_patch) = &patch.config {
                    let merged = merge_config(&field.kind.config_value(), config_patch)?;
                    field.kind = FieldKind::from_parts(field.field_type(), &merged)?;
                }
                if let Some(parent_id) = patch.parent_id {
                    if parent_id != field.parent_id {
                        if let Some(parent_id) = parent_id {
                            let parent = fetch_field(conn, parent_id).await?;
                            validate_parent(&parent, field.template_id, field.scope, Some(field.id))?;
                            let parents = parent_map(conn, field.template_id).await?;
                            ensure_acyclic(field.id, parent_id, &parents)?;
                        }
                        field.sort_order =
                            next_sort_order(conn, field.template_id, field.scope, parent_id)
                                .await?;
                        field.parent_id = parent_id;
                    }
                }
                field.updated_at = Utc::now();

                sqlx::query(
                    r"
                    UPDATE template_fields
                    SET label = $1, unit = $2, required = $3, config = $4, parent_id = $5,
                        sort_order = $6, updated_at = $7
                    WHERE id = $8
                    ",
                )
                .bind(&field.label)
                .bind(&field.unit)
                .bind(field.required)
                .bind(field.kind.config_value().to_string())
                .bind(field.parent_id)
                .bind(field.sort_order)
                .bind(format_timestamp(&field.updated_at))
                .bind(id)
                .execute(&mut *conn)
                .await
                .map_err(|e| AppError::database(format!("Failed to update field: {e}")))?;

                guard.commit().await?;
                info!(field.id = id, "Field updated");
                Ok(field)
            },
            TRANSACTION_RETRIES,
        )
        .await
    }

    /// Mark a field deleted without touching its children
    ///
    /// Children of a deleted composite stay active but are no longer
    /// reachable from the root.
    ///
    /// # Errors
    ///
    /// Returns not-found if the field is missing or already deleted
    pub async fn soft_delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE template_fields SET status = 'deleted', updated_at = $1
            WHERE id = $2 AND status = 'active'
            ",
        )
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete field: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Field {id}")));
        }
        info!(field.id = id, "Field soft-deleted");
        Ok(())
    }

    /// Apply a batch of sort orders atomically
    ///
    /// Every id must be an active field of `template_id`; otherwise nothing is
    /// written.
    ///
    /// # Errors
    ///
    /// Returns a validation error for duplicate ids, not-found for unknown ones
    pub async fn reorder(&self, template_id: i64, entries: &[FieldOrder]) -> AppResult<()> {
        let mut seen = HashSet::new();
        let duplicates: Vec<FieldError> = entries
            .iter()
            .filter(|entry| !seen.insert(entry.id))
            .map(|entry| FieldError::new("id", format!("field {} listed twice", entry.id)))
            .collect();
        if !duplicates.is_empty() {
            return Err(AppError::validation(duplicates));
        }

        retry_transaction(
            || async move {
                let mut guard = self.begin().await?;
                let conn = guard.executor()?;
                fetch_active_template(conn, template_id).await?;
                let now = format_timestamp(&Utc::now());

                for entry in entries {
                    let result = sqlx::query(
                        r"
                        UPDATE template_fields SET sort_order = $1, updated_at = $2
                        WHERE id = $3 AND template_id = $4 AND status = 'active'
                        ",
                    )
                    .bind(entry.sort_order)
                    .bind(&now)
                    .bind(entry.id)
                    .bind(template_id)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| AppError::database(format!("Failed to reorder fields: {e}")))?;

                    if result.rows_affected() == 0 {
                        warn!(field.id = entry.id, template.id = template_id, "Reorder rejected");
                        return Err(AppError::not_found(format!(
                            "Field {} in template {template_id}",
                            entry.id
                        )));
                    }
                }

                guard.commit().await?;
                info!(template.id = template_id, count = entries.len(), "Fields reordered");
                Ok(())
            },
            TRANSACTION_RETRIES,
        )
        .await
    }

    /// Active root fields of a scope, in display order
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing template
    pub async fn roots(&self, template_id: i64, scope: FieldScope) -> AppResult<Vec<FieldDefinition>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::database(format!("Failed to acquire connection: {e}")))?;
        fetch_active_template(&mut conn, template_id).await?;

        let rows = sqlx::query(&format!(
            r"
            SELECT {FIELD_COLUMNS} FROM template_fields
            WHERE template_id = $1 AND parent_id IS NULL AND form_scope = $2 AND status = 'active'
            ORDER BY sort_order, id
            "
        ))
        .bind(template_id)
        .bind(scope.as_str())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to list root fields: {e}")))?;
        debug!(template.id = template_id, count = rows.len(), "Root fields resolved");
        rows.iter().map(row_to_field).collect()
    }

    /// Active direct children of a field within a scope, in display order
    ///
    /// # Errors
    ///
    /// Returns not-found if the parent field does not exist
    pub async fn children(&self, parent_id: i64, scope: FieldScope) -> AppResult<Vec<FieldDefinition>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::database(format!("Failed to acquire connection: {e}")))?;
        fetch_field(&mut conn, parent_id).await?;

        let rows = sqlx::query(&format!(
            r"
            SELECT {FIELD_COLUMNS} FROM template_fields
            WHERE parent_id = $1 AND form_scope = $2 AND status = 'active'
            ORDER BY sort_order, id
            "
        ))
        .bind(parent_id)
        .bind(scope.as_str())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to list child fields: {e}")))?;
        rows.iter().map(row_to_field).collect()
    }

    /// Every active field of a template, all scopes
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_for_template(&self, template_id: i64) -> AppResult<Vec<FieldDefinition>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::database(format!("Failed to acquire connection: {e}")))?;
        fetch_active_fields(&mut conn, template_id).await
    }
}

/// Load a field by id on an existing connection
///
/// # Errors
///
/// Returns not-found if no field has this id
pub async fn fetch_field(conn: &mut SqliteConnection, id: i64) -> AppResult<FieldDefinition> {
    let row = sqlx::query(&format!(
        "SELECT {FIELD_COLUMNS} FROM template_fields WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to get field: {e}")))?
    .ok_or_else(|| AppError::not_found(format!("Field {id}")))?;
    row_to_field(&row)
}

/// Every active field of a template on an existing connection
///
/// # Errors
///
/// Returns an error if the query fails
pub async fn fetch_active_fields(
    conn: &mut SqliteConnection,
    template_id: i64,
) -> AppResult<Vec<FieldDefinition>> {
    let rows = sqlx::query(&format!(
        r"
        SELECT {FIELD_COLUMNS} FROM template_fields
        WHERE template_id = $1 AND status = 'active'
        ORDER BY sort_order, id
        "
    ))
    .bind(template_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to list fields: {e}")))?;
    rows.iter().map(row_to_field).collect()
}

async fn active_keys(conn: &mut SqliteConnection, template_id: i64) -> AppResult<HashSet<String>> {
    let rows = sqlx::query("SELECT key FROM template_fields WHERE template_id = $1 AND status = 'active'")
        .bind(template_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to load field keys: {e}")))?;
    Ok(rows.iter().map(|row| row.get("key")).collect())
}

async fn next_sort_order(
    conn: &mut SqliteConnection,
    template_id: i64,
    scope: FieldScope,
    parent_id: Option<i64>,
) -> AppResult<i64> {
    let row = sqlx::query(
        r"
        SELECT COALESCE(MAX(sort_order) + 1, 0) AS next_order FROM template_fields
        WHERE template_id = $1 AND form_scope = $2 AND parent_id IS $3 AND status = 'active'
        ",
    )
    .bind(template_id)
    .bind(scope.as_str())
    .bind(parent_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to compute sort order: {e}")))?;
    Ok(row.get("next_order"))
}

/// Parent links of every field in a template, deleted ones included
async fn parent_map(
    conn: &mut SqliteConnection,
    template_id: i64,
) -> AppResult<HashMap<i64, Option<i64>>> {
    let rows = sqlx::query("SELECT id, parent_id FROM template_fields WHERE template_id = $1")
        .bind(template_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to load field parents: {e}")))?;
    Ok(rows
        .iter()
        .map(|row| (row.get("id"), row.get("parent_id")))
        .collect())
}

/// A parent must be an active composite of the same template and scope
fn validate_parent(
    parent: &FieldDefinition,
    template_id: i64,
    scope: FieldScope,
    child_id: Option<i64>,
) -> AppResult<()> {
    if child_id == Some(parent.id) {
        return Err(AppError::invalid_field("parentId", "a field cannot be its own parent"));
    }
    if !parent.is_active() || parent.template_id != template_id {
        return Err(AppError::invalid_field(
            "parentId",
            format!("field {} is not an active field of template {template_id}", parent.id),
        ));
    }
    if !parent.is_composite() {
        return Err(AppError::invalid_field(
            "parentId",
            format!(
                "field {} is of type {} and cannot have children",
                parent.id,
                parent.field_type().as_str()
            ),
        ));
    }
    if parent.scope != scope {
        return Err(AppError::invalid_field(
            "parentId",
            format!("parent is in scope {} but the field is in scope {}", parent.scope.as_str(), scope.as_str()),
        ));
    }
    Ok(())
}

/// Reject moving `field_id` under `new_parent_id` when the parent descends from it
pub fn ensure_acyclic(
    field_id: i64,
    new_parent_id: i64,
    parents: &HashMap<i64, Option<i64>>,
) -> AppResult<()> {
    let mut visited = HashSet::new();
    let mut current = Some(new_parent_id);
    while let Some(ancestor) = current {
        if ancestor == field_id {
            return Err(AppError::invalid_field(
                "parentId",
                "a field cannot be moved under one of its own descendants",
            ));
        }
        if !visited.insert(ancestor) {
            break;
        }
        current = parents.get(&ancestor).copied().flatten();
    }
    Ok(())
}

fn normalize_unit(unit: Option<&str>) -> Option<String> {
    unit.map(str::trim).filter(|u| !u.is_empty()).map(str::to_owned)
}

fn row_to_field(row: &SqliteRow) -> AppResult<FieldDefinition> {
    let field_type: String = row.get("field_type");
    let form_scope: String = row.get("form_scope");
    let status: String = row.get("status");
    let config: String = row.get("config");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    let config: Value = serde_json::from_str(&config)?;
    Ok(FieldDefinition {
        id: row.get("id"),
        template_id: row.get("template_id"),
        key: row.get("key"),
        label: row.get("label"),
        kind: FieldKind::from_parts(FieldType::parse(&field_type)?, &config)?,
        unit: row.get("unit"),
        sort_order: row.get("sort_order"),
        required: row.get("required"),
        scope: FieldScope::parse(&form_scope),
        parent_id: row.get("parent_id"),
        status: LifecycleStatus::parse(&status),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_through_descendant_is_rejected() {
        // 1 -> 2 -> 3
        let parents = HashMap::from([(1, None), (2, Some(1)), (3, Some(2)), (4, None)]);

        assert!(ensure_acyclic(1, 3, &parents).is_err());
        assert!(ensure_acyclic(1, 1, &parents).is_err());
        assert!(ensure_acyclic(3, 4, &parents).is_ok());
        assert!(ensure_acyclic(4, 3, &parents).is_ok());
    }
}
