// ABOUTME: Template service over the field schema store
// ABOUTME: Template CRUD, field editing and scoped tree resolution for editors and capture
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use serde::{Deserialize, Serialize};

use crate::database::fields::{CreateFieldRequest, FieldOrder, UpdateFieldRequest};
use crate::database::templates::{CreateTemplateRequest, UpdateTemplateRequest};
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    build_tree, FieldDefinition, FieldNode, FieldScope, LifecycleStatus, Template,
};

/// A template with its field trees per scope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetail {
    /// The template
    #[serde(flatten)]
    pub template: Template,
    /// Fields captured once per session
    pub general_fields: Vec<FieldNode>,
    /// Fields captured per participant
    pub subject_fields: Vec<FieldNode>,
}

/// Template and field schema operations
#[derive(Clone)]
pub struct TemplateService {
    database: Database,
}

impl TemplateService {
    /// Create a template service
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    /// Create a template
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name, not-found for an unknown sport
    pub async fn create_template(&self, request: &CreateTemplateRequest) -> AppResult<Template> {
        self.database.templates().create(request).await
    }

    /// Active template with its nested field trees
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing or soft-deleted template
    pub async fn get_template(&self, id: i64) -> AppResult<TemplateDetail> {
        let template = self
            .database
            .templates()
            .get(id)
            .await?
            .filter(|t| t.status == LifecycleStatus::Active)
            .ok_or_else(|| AppError::not_found(format!("Template {id}")))?;
        let fields = self.database.fields().list_for_template(id).await?;

        Ok(TemplateDetail {
            general_fields: build_tree(&fields, FieldScope::General),
            subject_fields: build_tree(&fields, FieldScope::Subject),
            template,
        })
    }

    /// Active templates, optionally for one sport
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_templates(&self, sport_id: Option<i64>) -> AppResult<Vec<Template>> {
        self.database.templates().list(sport_id).await
    }

    /// Patch a template
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing template or sport
    pub async fn update_template(
        &self,
        id: i64,
        patch: &UpdateTemplateRequest,
    ) -> AppResult<Template> {
        self.database.templates().update(id, patch).await
    }

    /// Soft-delete a template; sessions keep their snapshots
    ///
    /// # Errors
    ///
    /// Returns not-found if the template is missing or already deleted
    pub async fn delete_template(&self, id: i64) -> AppResult<()> {
        self.database.templates().soft_delete(id).await
    }

    /// Create a field with a unique derived key
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing template, validation errors otherwise
    pub async fn create_field(
        &self,
        template_id: i64,
        request: &CreateFieldRequest,
    ) -> AppResult<FieldDefinition> {
        self.database.fields().create(template_id, request).await
    }

    /// Patch a field, merging its config
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing field, validation errors otherwise
    pub async fn update_field(
        &self,
        id: i64,
        patch: &UpdateFieldRequest,
    ) -> AppResult<FieldDefinition> {
        self.database.fields().update(id, patch).await
    }

    /// Soft-delete a field without cascading
    ///
    /// # Errors
    ///
    /// Returns not-found if the field is missing or already deleted
    pub async fn soft_delete_field(&self, id: i64) -> AppResult<()> {
        self.database.fields().soft_delete(id).await
    }

    /// Apply a batch reorder atomically
    ///
    /// # Errors
    ///
    /// Returns not-found if any id is not an active field of the template
    pub async fn reorder_fields(&self, template_id: i64, entries: &[FieldOrder]) -> AppResult<()> {
        self.database.fields().reorder(template_id, entries).await
    }

    /// Root fields of a scope
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing template
    pub async fn resolve_tree(
        &self,
        template_id: i64,
        scope: FieldScope,
    ) -> AppResult<Vec<FieldDefinition>> {
        self.database.fields().roots(template_id, scope).await
    }

    /// Direct children of a field within a scope
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing parent
    pub async fn children(
        &self,
        field_id: i64,
        scope: FieldScope,
    ) -> AppResult<Vec<FieldDefinition>> {
        self.database.fields().children(field_id, scope).await
    }
}
