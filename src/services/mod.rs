// ABOUTME: Domain service layer for business logic extracted from route handlers
// ABOUTME: Template editing, session capture, record detection and goal tracking
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! Domain service layer
//!
//! Services are protocol-agnostic: route handlers and integration tests call
//! the same operations and observe the same rules.

/// Goal lifecycle, progress and the athlete dashboard
pub mod goals;

/// Personal record detection during session finish
pub mod records;

/// Session creation, value capture and finish
pub mod sessions;

/// Template and field schema editing
pub mod templates;

pub use goals::{
    CreateGoalRequest, GoalDashboard, GoalService, GoalView, ProgressRequest, StatusRequest,
};
pub use records::{ParticipantRecords, RecordDetectionService};
pub use sessions::{
    CreateSessionRequest, FinishOutcome, FinishSessionRequest, MissingRequired, SessionDetail,
    SessionService, UpdateValuesRequest,
};
pub use templates::{TemplateDetail, TemplateService};
