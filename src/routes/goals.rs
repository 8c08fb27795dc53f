// ABOUTME: Route handlers for goal tracking
// ABOUTME: Goal CRUD, progress marks, status changes and the per-athlete dashboard
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
use crate::database::goals::UpdateGoalRequest;
use crate::errors::AppError;
use crate::models::GoalStatus;
use crate::resources::ServerResources;
use crate::services::{CreateGoalRequest, ProgressRequest, StatusRequest};

/// Query parameters for listing an athlete's goals
#[derive(Debug, Default, Deserialize)]
pub struct ListGoalsQuery {
    /// Only goals with this status
    pub status: Option<GoalStatus>,
}

/// Goal routes handler
pub struct GoalRoutes;

impl GoalRoutes {
    /// Create all goal routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/goals", post(Self::handle_create))
            .route(
                "/api/goals/:id",
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .route("/api/goals/:id/progress", post(Self::handle_progress))
            .route("/api/goals/:id/status", put(Self::handle_status))
            .route("/api/athletes/:id/goals", get(Self::handle_list))
            .route("/api/athletes/:id/dashboard", get(Self::handle_dashboard))
            .with_state(resources)
    }

    /// Handle POST /api/goals
    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        ApiJson(body): ApiJson<CreateGoalRequest>,
    ) -> Result<Response, AppError> {
        let goal = resources.goals.create_goal(&body).await?;
        Ok(respond(StatusCode::CREATED, goal))
    }

    /// Handle GET /api/goals/:id
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
    ) -> Result<Response, AppError> {
        let goal = resources.goals.get_goal(id).await?;
        Ok(respond(StatusCode::OK, goal))
    }

    /// Handle PUT /api/goals/:id
    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiJson(body): ApiJson<UpdateGoalRequest>,
    ) -> Result<Response, AppError> {
        let goal = resources.goals.update_goal(id, &body).await?;
        Ok(respond(StatusCode::OK, goal))
    }

    /// Handle DELETE /api/goals/:id - hard delete with history
    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
    ) -> Result<Response, AppError> {
        resources.goals.delete_goal(id).await?;
        Ok(deleted())
    }

    /// Handle POST /api/goals/:id/progress
    async fn handle_progress(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiJson(body): ApiJson<ProgressRequest>,
    ) -> Result<Response, AppError> {
        let entry = resources.goals.append_progress(id, &body).await?;
        Ok(respond(StatusCode::CREATED, entry))
    }

    /// Handle PUT /api/goals/:id/status
    async fn handle_status(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiJson(body): ApiJson<StatusRequest>,
    ) -> Result<Response, AppError> {
        let goal = resources.goals.change_status(id, body.status).await?;
        Ok(respond(StatusCode::OK, goal))
    }

    /// Handle GET /api/athletes/:id/goals
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
        ApiQuery(query): ApiQuery<ListGoalsQuery>,
    ) -> Result<Response, AppError> {
        let goals = resources.goals.list_goals(id, query.status).await?;
        Ok(respond(StatusCode::OK, goals))
    }

    /// Handle GET /api/athletes/:id/dashboard
    async fn handle_dashboard(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
    ) -> Result<Response, AppError> {
        let dashboard = resources.goals.dashboard(id).await?;
        Ok(respond(StatusCode::OK, dashboard))
    }
}
