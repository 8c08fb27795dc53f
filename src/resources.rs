// ABOUTME: Shared server resources handed to every route handler
// ABOUTME: Owns the database handle, configuration and the domain services built on them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use std::sync::Arc;

use crate::config::environment::ServerConfig;
use crate::database::Database;
use crate::services::{GoalService, RecordDetectionService, SessionService, TemplateService};

/// Centralized resource container for dependency injection
#[derive(Clone)]
pub struct ServerResources {
    /// Database handle
    pub database: Database,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Template and field editing
    pub templates: TemplateService,
    /// Session capture
    pub sessions: SessionService,
    /// Personal records
    pub records: RecordDetectionService,
    /// Goal tracking
    pub goals: GoalService,
}

impl ServerResources {
    /// Build the services on a shared database and configuration
    #[must_use]
    pub fn new(database: Database, config: Arc<ServerConfig>) -> Self {
        Self {
            templates: TemplateService::new(database.clone()),
            sessions: SessionService::new(
                database.clone(),
                config.limits.max_session_participants,
            ),
            records: RecordDetectionService::new(database.clone()),
            goals: GoalService::new(database.clone(), config.goals.near_deadline_days),
            database,
            config,
        }
    }
}
