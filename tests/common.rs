// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: In-memory database, fixture builders for sports, athletes, templates and fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used
)]
//! Shared test utilities for `trainbook_server`

use std::sync::{Arc, Once};

use axum::Router;
use serde_json::{json, Value};
use trainbook_server::{
    config::environment::ServerConfig,
    database::{
        directory::{CreateAthleteRequest, CreateSportRequest},
        fields::CreateFieldRequest,
        templates::CreateTemplateRequest,
        Database,
    },
    models::{Athlete, FieldDefinition, FieldScope, FieldType, Sport, Template},
    resources::ServerResources,
    routes::build_router,
};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// Standard test database setup
pub async fn create_test_database() -> Database {
    init_test_logging();
    Database::new("sqlite::memory:").await.unwrap()
}

/// Resources over a fresh in-memory database with default configuration
pub async fn create_test_resources() -> Arc<ServerResources> {
    let database = create_test_database().await;
    Arc::new(ServerResources::new(
        database,
        Arc::new(ServerConfig::default()),
    ))
}

/// Full router over fresh resources
pub async fn create_test_router() -> (Router, Arc<ServerResources>) {
    let resources = create_test_resources().await;
    (build_router(resources.clone()), resources)
}

pub async fn create_sport(database: &Database, name: &str) -> Sport {
    database
        .sports()
        .create(&CreateSportRequest {
            name: name.to_owned(),
        })
        .await
        .unwrap()
}

pub async fn create_athlete(database: &Database, name: &str, sport_id: i64) -> Athlete {
    database
        .athletes()
        .create(&CreateAthleteRequest {
            name: name.to_owned(),
            sport_ids: vec![sport_id],
        })
        .await
        .unwrap()
}

pub async fn create_template(database: &Database, name: &str, sport_id: i64) -> Template {
    database
        .templates()
        .create(&CreateTemplateRequest {
            name: name.to_owned(),
            description: None,
            sport_id,
        })
        .await
        .unwrap()
}

/// Field request with defaults: general scope, root, optional, no config
pub fn field_request(label: &str, field_type: FieldType) -> CreateFieldRequest {
    CreateFieldRequest {
        label: label.to_owned(),
        field_type,
        form_scope: FieldScope::General,
        parent_id: None,
        config: None,
        unit: None,
        required: false,
    }
}

pub async fn create_field(
    database: &Database,
    template_id: i64,
    request: CreateFieldRequest,
) -> FieldDefinition {
    database
        .fields()
        .create(template_id, &request)
        .await
        .unwrap()
}

/// Number field in kilograms
pub async fn create_number_field(
    database: &Database,
    template_id: i64,
    label: &str,
) -> FieldDefinition {
    let mut request = field_request(label, FieldType::Number);
    request.unit = Some("kg".to_owned());
    request.config = Some(json!({"min": 0}));
    create_field(database, template_id, request).await
}

/// A sport, one athlete and a "Strength" template with a `squat_weight` field
pub struct StrengthFixture {
    pub sport: Sport,
    pub athlete: Athlete,
    pub template: Template,
    pub squat: FieldDefinition,
}

pub async fn strength_fixture(database: &Database) -> StrengthFixture {
    let sport = create_sport(database, "Powerlifting").await;
    let athlete = create_athlete(database, "Ana", sport.id).await;
    let template = create_template(database, "Strength", sport.id).await;
    let squat = create_number_field(database, template.id, "Squat Weight").await;
    StrengthFixture {
        sport,
        athlete,
        template,
        squat,
    }
}

/// `{"key": value}` as a value map
pub fn values(pairs: &[(&str, Value)]) -> trainbook_server::models::FieldValues {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}
