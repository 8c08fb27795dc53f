// ABOUTME: Route handlers for the sport and athlete directory
// ABOUTME: Create and list sports and athletes referenced by templates, sessions and goals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
    Router,
};

use super::{deleted, respond, ApiId, ApiJson};
use crate::database::directory::{CreateAthleteRequest, CreateSportRequest};
use crate::errors::AppError;
use crate::resources::ServerResources;

/// Directory routes handler
pub struct DirectoryRoutes;

impl DirectoryRoutes {
    /// Create all directory routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/sports", post(Self::handle_create_sport))
            .route("/api/sports", get(Self::handle_list_sports))
            .route("/api/athletes", post(Self::handle_create_athlete))
            .route("/api/athletes", get(Self::handle_list_athletes))
            .route("/api/athletes/:id", get(Self::handle_get_athlete))
            .route("/api/athletes/:id/records", get(Self::handle_list_records))
            .route("/api/records/:id", delete(Self::handle_delete_record))
            .with_state(resources)
    }

    /// Handle POST /api/sports
    async fn handle_create_sport(
        State(resources): State<Arc<ServerResources>>,
        ApiJson(body): ApiJson<CreateSportRequest>,
    ) -> Result<Response, AppError> {
        let sport = resources.database.sports().create(&body).await?;
        Ok(respond(StatusCode::CREATED, sport))
    }

    /// Handle GET /api/sports
    async fn handle_list_sports(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let sports = resources.database.sports().list().await?;
        Ok(respond(StatusCode::OK, sports))
    }

    /// Handle POST /api/athletes
    async fn handle_create_athlete(
        State(resources): State<Arc<ServerResources>>,
        ApiJson(body): ApiJson<CreateAthleteRequest>,
    ) -> Result<Response, AppError> {
        let athlete = resources.database.athletes().create(&body).await?;
        Ok(respond(StatusCode::CREATED, athlete))
    }

    /// Handle GET /api/athletes
    async fn handle_list_athletes(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let athletes = resources.database.athletes().list().await?;
        Ok(respond(StatusCode::OK, athletes))
    }

    /// Handle GET /api/athletes/:id
    async fn handle_get_athlete(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
    ) -> Result<Response, AppError> {
        let athlete = resources
            .database
            .athletes()
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Athlete {id}")))?;
        Ok(respond(StatusCode::OK, athlete))
    }

    /// Handle GET /api/athletes/:id/records
    async fn handle_list_records(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
    ) -> Result<Response, AppError> {
        let records = resources.records.list_records(id).await?;
        Ok(respond(StatusCode::OK, records))
    }

    /// Handle DELETE /api/records/:id
    async fn handle_delete_record(
        State(resources): State<Arc<ServerResources>>,
        ApiId(id): ApiId,
    ) -> Result<Response, AppError> {
        resources.records.delete_record(id).await?;
        Ok(deleted())
    }
}
