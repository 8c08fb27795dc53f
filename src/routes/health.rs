// ABOUTME: Health check route handlers for service monitoring and status endpoints
// ABOUTME: Liveness reports the service identity, readiness round-trips the database
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! Health check routes for service monitoring

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Router};
use serde_json::json;

use super::respond;
use crate::constants::service_names::TRAINBOOK_SERVER;
use crate::errors::AppError;
use crate::resources::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .route("/ready", get(Self::handle_ready))
            .with_state(resources)
    }

    async fn handle_health() -> Response {
        respond(
            StatusCode::OK,
            json!({
                "status": "healthy",
                "service": TRAINBOOK_SERVER,
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }),
        )
    }

    async fn handle_ready(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        resources.database.ping().await?;
        Ok(respond(
            StatusCode::OK,
            json!({
                "status": "ready",
                "database": "ok",
                "timestamp": chrono::Utc::now().to_rfc3339()
            }),
        ))
    }
}
