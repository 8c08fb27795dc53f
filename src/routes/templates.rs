// ABOUTME: Route handlers for templates and their field schema
// ABOUTME: Template CRUD, field create/update/delete, batch reorder and scoped tree reads
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use super::{deleted, respond, ApiId, ApiJson, ApiQuery};
use crate::database::fields::{CreateFieldRequest, FieldOrder, UpdateFieldRequest};
use crate::database::templates::{CreateTemplateRequest, UpdateTemplateRequest};
use crate::errors::AppError;
use crate::models::FieldScope;
use crate::resources::ServerResources;

/// Query parameters for listing templates
#[derive(Debug, Default, Deserialize)]
pub struct ListTemplatesQuery {
    /// Only templates of this sport
    pub sport_id: Option<i64>,
}

/// Scope selector for tree reads
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    /// Defaults to `general`
    #[serde(default)]
    pub scope: FieldScope,
}

/// Batch reorder body
#[derive(Debug, Deserialize)]
pub struct ReorderBody {
    /// New positions
    pub fields: Vec<FieldOrder>,
}

/// Template routes handler
pub struct TemplateRoutes;

impl TemplateRoutes {
    /// Create all template and field routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/templates",
                post(Self::handle_create).get(Self::handle_list),
            )
            .route(
                "/api/templates/:id",
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .route(
                "/api/templates/:id/fields",
                get(Self::handle_roots).post(Self::handle_create_field),
            )
            .route("/api/templates/:id/fields/order", put(Self::handle_reorder))
            .route(
                "/api/fields/:id",
                put(Self::handle_update_field).delete(Self::handle_delete_field),
            )
            .route("/api/fields/:id/children", get(Self::handle_children))
            .with_state(resources)
    }

    /// Handle POST /api/templates
    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        ApiJson(body): ApiJson<CreateTemplateRequest>,
    ) -> Result<Response, AppError> {
        let template = resources.templates.create_template(&body).await?;
        Ok(respond(StatusCode::CREATED, template))
    }

    /// Handle GET /api/templates
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        ApiQuery(query): ApiQuery<ListTemplatesQuery>,
    ) -> Result<Response, AppError> {
        let templates = resources.templates.list_templates(query.sport_id).await?;
        Ok(respond(StatusCode::OK, templates))
    }

    /// Handle GET /api/templates/:id - template with nested field trees
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
    ) -> Result<Response, AppError> {
        let detail = resources.templates.get_template(id).await?;
        Ok(respond(StatusCode::OK, detail))
    }

    /// Handle PUT /api/templates/:id
    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiJson(body): ApiJson<UpdateTemplateRequest>,
    ) -> Result<Response, AppError> {
        let template = resources.templates.update_template(id, &body).await?;
        Ok(respond(StatusCode::OK, template))
    }

    /// Handle DELETE /api/templates/:id - soft delete
    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
    ) -> Result<Response, AppError> {
        resources.templates.delete_template(id).await?;
        Ok(deleted())
    }

    /// Handle GET /api/templates/:id/fields - root fields of a scope
    async fn handle_roots(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiQuery(query): ApiQuery<ScopeQuery>,
    ) -> Result<Response, AppError> {
        let fields = resources.templates.resolve_tree(id, query.scope).await?;
        Ok(respond(StatusCode::OK, fields))
    }

    /// Handle POST /api/templates/:id/fields
    async fn handle_create_field(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiJson(body): ApiJson<CreateFieldRequest>,
    ) -> Result<Response, AppError> {
        let field = resources.templates.create_field(id, &body).await?;
        Ok(respond(StatusCode::CREATED, field))
    }

    /// Handle PUT /api/templates/:id/fields/order
    async fn handle_reorder(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiJson(body): ApiJson<ReorderBody>,
    ) -> Result<Response, AppError> {
        resources.templates.reorder_fields(id, &body.fields).await?;
        let fields = resources.database.fields().list_for_template(id).await?;
        Ok(respond(StatusCode::OK, fields))
    }

    /// Handle PUT /api/fields/:id
    async fn handle_update_field(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiJson(body): ApiJson<UpdateFieldRequest>,
    ) -> Result<Response, AppError> {
        let field = resources.templates.update_field(id, &body).await?;
        Ok(respond(StatusCode::OK, field))
    }

    /// Handle DELETE /api/fields/:id - soft delete, children are kept
    async fn handle_delete_field(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
    ) -> Result<Response, AppError> {
        resources.templates.soft_delete_field(id).await?;
        Ok(deleted())
    }

    /// Handle GET /api/fields/:id/children
    async fn handle_children(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiQuery(query): ApiQuery<ScopeQuery>,
    ) -> Result<Response, AppError> {
        let fields = resources.templates.children(id, query.scope).await?;
        Ok(respond(StatusCode::OK, fields))
    }
}
