// ABOUTME: Route handlers for session capture
// ABOUTME: Create from a template, replace values, finish with record detection, read and delete
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
use crate::database::sessions::ListSessionsFilter;
use crate::errors::AppError;
use crate::models::FieldScope;
use crate::resources::ServerResources;
use crate::services::{CreateSessionRequest, FinishSessionRequest, UpdateValuesRequest};

/// Query parameters for visible-field resolution
#[derive(Debug, Default, Deserialize)]
pub struct VisibleFieldsQuery {
    /// Defaults to `general`
    #[serde(default)]
    pub scope: FieldScope,
    /// Participant whose values gate subject-scope fields
    pub subject_id: Option<i64>,
}

/// Session routes handler
pub struct SessionRoutes;

impl SessionRoutes {
    /// Create all session routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/sessions",
                post(Self::handle_create).get(Self::handle_list),
            )
            .route(
                "/api/sessions/:id",
                get(Self::handle_get).delete(Self::handle_delete),
            )
            .route("/api/sessions/:id/values", put(Self::handle_update_values))
            .route("/api/sessions/:id/finish", post(Self::handle_finish))
            .route(
                "/api/sessions/:id/visible-fields",
                get(Self::handle_visible_fields),
            )
            .with_state(resources)
    }

    /// Handle POST /api/sessions
    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        ApiJson(body): ApiJson<CreateSessionRequest>,
    ) -> Result<Response, AppError> {
        let session = resources.sessions.create_session(&body).await?;
        Ok(respond(StatusCode::CREATED, session))
    }

    /// Handle GET /api/sessions
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        ApiQuery(filter): ApiQuery<ListSessionsFilter>,
    ) -> Result<Response, AppError> {
        let sessions = resources.sessions.list_sessions(filter).await?;
        Ok(respond(StatusCode::OK, sessions))
    }

    /// Handle GET /api/sessions/:id
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
    ) -> Result<Response, AppError> {
        let session = resources.sessions.get_session(id).await?;
        Ok(respond(StatusCode::OK, session))
    }

    /// Handle PUT /api/sessions/:id/values - whole-map replacement
    async fn handle_update_values(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiJson(body): ApiJson<UpdateValuesRequest>,
    ) -> Result<Response, AppError> {
        let session = resources.sessions.update_values(id, &body).await?;
        Ok(respond(StatusCode::OK, session))
    }

    /// Handle POST /api/sessions/:id/finish
    async fn handle_finish(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiJson(body): ApiJson<FinishSessionRequest>,
    ) -> Result<Response, AppError> {
        let outcome = resources.sessions.finish_session(id, &body).await?;
        Ok(respond(StatusCode::OK, outcome))
    }

    /// Handle DELETE /api/sessions/:id - hard delete
    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
    ) -> Result<Response, AppError> {
        resources.sessions.delete_session(id).await?;
        Ok(deleted())
    }

    /// Handle GET /api/sessions/:id/visible-fields
    async fn handle_visible_fields(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiQuery(query): ApiQuery<VisibleFieldsQuery>,
    ) -> Result<Response, AppError> {
        let fields = resources
            .sessions
            .visible_fields(id, query.scope, query.subject_id)
            .await?;
        Ok(respond(StatusCode::OK, fields))
    }
}
