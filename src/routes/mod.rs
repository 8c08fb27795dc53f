// ABOUTME: HTTP route assembly for the trainbook server
// ABOUTME: Success envelope, rejection-mapping extractors and the layered axum router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! Route module for the trainbook server
//!
//! Each domain module holds route definitions and thin handlers that delegate
//! to the service layer. Every response uses the `{success, data?, error?}`
//! envelope, including extractor rejections.

/// Sport and athlete directory routes
pub mod directory;
/// Goal tracking routes
pub mod goals;
/// Health and readiness routes
pub mod health;
/// Session capture routes
pub mod sessions;
/// Template and field schema routes
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use http::{header::HeaderName, Method};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::errors::AppError;
use crate::resources::ServerResources;

pub use directory::DirectoryRoutes;
pub use goals::GoalRoutes;
pub use health::HealthRoutes;
pub use sessions::SessionRoutes;
pub use templates::TemplateRoutes;

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Always `true`
    pub success: bool,
    /// Payload, omitted for deletes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Wrap `data` in the success envelope
pub fn respond<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        Json(ApiResponse {
            success: true,
            data: Some(data),
        }),
    )
        .into_response()
}

/// Success envelope without payload
pub fn deleted() -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse::<()> {
            success: true,
            data: None,
        }),
    )
        .into_response()
}

/// JSON body extractor whose rejections use the error envelope
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| AppError::invalid_input(rejection.body_text()))
    }
}

/// Query string extractor whose rejections use the error envelope
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection| AppError::invalid_input(rejection.body_text()))
    }
}

/// Numeric path identifier extractor
pub struct ApiId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for ApiId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<i64>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| Self(id))
            .map_err(|rejection| AppError::invalid_input(rejection.body_text()))
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("origin"),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
}

/// Assemble every route with tracing, request ids, timeouts and CORS
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let timeout = Duration::from_secs(resources.config.limits.request_timeout_secs);
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(HealthRoutes::routes(resources.clone()))
        .merge(DirectoryRoutes::routes(resources.clone()))
        .merge(TemplateRoutes::routes(resources.clone()))
        .merge(SessionRoutes::routes(resources.clone()))
        .merge(GoalRoutes::routes(resources))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}
