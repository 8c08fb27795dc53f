// ABOUTME: Goal tracking service with derived progress and deadline flags
// ABOUTME: Goal CRUD, progress marks, completion, status changes and the athlete dashboard
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use trainbook_intelligence::{current_value, deadline_status, progress_percentage, DeadlineStatus};

use crate::database::directory::validate_name;
use crate::database::goals::{NewGoal, UpdateGoalRequest};
use crate::database::Database;
use crate::errors::{AppError, AppResult, FieldError};
use crate::models::{Athlete, Goal, GoalHistoryEntry, GoalStatus, PersonalRecord};

/// Request to create a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalRequest {
    /// Athlete the goal belongs to
    pub subject_id: i64,
    /// Display title
    pub title: String,
    /// Name of the measured metric
    #[serde(default)]
    pub metric_label: Option<String>,
    /// Unit of the values
    pub unit: String,
    /// Baseline value
    pub start_value: f64,
    /// Value that completes the goal
    pub target_value: f64,
    /// Defaults to today (UTC)
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Optional deadline
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    /// Coach notes on how to get there
    #[serde(default)]
    pub strategy_notes: Option<String>,
    /// Note for the initial history entry
    #[serde(default)]
    pub notes: Option<String>,
}

/// A progress mark to append
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRequest {
    /// Measured value
    pub value: f64,
    /// Optional notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Requested status transition
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusRequest {
    /// Target status
    pub status: GoalStatus,
}

/// Goal with derived metrics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalView {
    /// The stored goal with its history
    #[serde(flatten)]
    pub goal: Goal,
    /// Latest history value or the start value
    pub current_value: f64,
    /// Progress toward the target, 0 to 100 with one decimal
    pub progress_percentage: f64,
    /// Computed deadline flag, never written to `status`
    pub deadline: DeadlineStatus,
}

/// Everything a coach sees for one athlete
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDashboard {
    /// The athlete
    pub subject: Athlete,
    /// Active goals with full history
    pub goals: Vec<GoalView>,
    /// Personal records, newest first
    pub records: Vec<PersonalRecord>,
}

/// Goal lifecycle operations
#[derive(Clone)]
pub struct GoalService {
    database: Database,
    near_deadline_days: i64,
}

impl GoalService {
    /// Create a goal service
    #[must_use]
    pub const fn new(database: Database, near_deadline_days: i64) -> Self {
        Self {
            database,
            near_deadline_days,
        }
    }

    fn view(&self, goal: Goal) -> GoalView {
        let today = Utc::now().date_naive();
        GoalView {
            current_value: current_value(&goal),
            progress_percentage: progress_percentage(&goal),
            deadline: deadline_status(&goal, today, self.near_deadline_days),
            goal,
        }
    }

    async fn ensure_athlete(&self, subject_id: i64) -> AppResult<()> {
        if self.database.athletes().exists(subject_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Athlete {subject_id}")))
        }
    }

    /// Create an active goal with its initial history mark
    ///
    /// # Errors
    ///
    /// Returns validation errors for malformed input, not-found for an unknown athlete
    pub async fn create_goal(&self, request: &CreateGoalRequest) -> AppResult<GoalView> {
        let title = validate_name("title", &request.title)?;
        let unit = validate_name("unit", &request.unit)?;
        let start_date = request.start_date.unwrap_or_else(|| Utc::now().date_naive());
        validate_values(request.start_value, request.target_value)?;
        validate_dates(start_date, request.target_date)?;
        self.ensure_athlete(request.subject_id).await?;

        let goal = self
            .database
            .goals()
            .create(&NewGoal {
                subject_id: request.subject_id,
                title,
                metric_label: request.metric_label.clone(),
                unit,
                start_value: request.start_value,
                target_value: request.target_value,
                start_date,
                target_date: request.target_date,
                strategy_notes: request.strategy_notes.clone(),
                initial_note: request.notes.clone(),
            })
            .await?;
        Ok(self.view(goal))
    }

    /// Goal with derived metrics
    ///
    /// # Errors
    ///
    /// Returns not-found if the goal does not exist
    pub async fn get_goal(&self, id: i64) -> AppResult<GoalView> {
        let goal = self.database.goals().get(id).await?;
        Ok(self.view(goal))
    }

    /// Patch a goal; history is left as recorded
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing goal, validation errors for malformed input
    pub async fn update_goal(&self, id: i64, patch: &UpdateGoalRequest) -> AppResult<GoalView> {
        let goals = self.database.goals();
        let mut goal = goals.get(id).await?;

        if let Some(title) = &patch.title {
            goal.title = validate_name("title", title)?;
        }
        if let Some(metric_label) = &patch.metric_label {
            goal.metric_label.clone_from(metric_label);
        }
        if let Some(unit) = &patch.unit {
            goal.unit = validate_name("unit", unit)?;
        }
        if let Some(start_value) = patch.start_value {
            goal.start_value = start_value;
        }
        if let Some(target_value) = patch.target_value {
            goal.target_value = target_value;
        }
        if let Some(target_date) = patch.target_date {
            goal.target_date = target_date;
        }
        if let Some(strategy_notes) = &patch.strategy_notes {
            goal.strategy_notes.clone_from(strategy_notes);
        }
        validate_values(goal.start_value, goal.target_value)?;
        validate_dates(goal.start_date, goal.target_date)?;
        goal.updated_at = Utc::now();

        goals.save(&goal).await?;
        self.get_goal(id).await
    }

    /// Hard-delete a goal and its history
    ///
    /// # Errors
    ///
    /// Returns not-found if the goal does not exist
    pub async fn delete_goal(&self, id: i64) -> AppResult<()> {
        self.database.goals().delete(id).await
    }

    /// Append a progress mark
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing goal, a validation error for a non-finite value
    pub async fn append_progress(
        &self,
        id: i64,
        request: &ProgressRequest,
    ) -> AppResult<GoalHistoryEntry> {
        if !request.value.is_finite() {
            return Err(AppError::invalid_field("value", "must be a finite number"));
        }
        self.database
            .goals()
            .append_history(id, request.value, request.notes.as_deref(), Utc::now())
            .await
    }

    /// Mark a goal completed, adding at most one terminal mark per day
    ///
    /// # Errors
    ///
    /// Returns not-found if the goal does not exist
    pub async fn mark_completed(&self, id: i64) -> AppResult<GoalView> {
        let goal = self.database.goals().complete(id, Utc::now()).await?;
        Ok(self.view(goal))
    }

    /// Change a goal's status; completion goes through [`Self::mark_completed`]
    ///
    /// # Errors
    ///
    /// Returns not-found if the goal does not exist
    pub async fn change_status(&self, id: i64, status: GoalStatus) -> AppResult<GoalView> {
        if status == GoalStatus::Completed {
            return self.mark_completed(id).await;
        }
        self.database.goals().set_status(id, status).await?;
        self.get_goal(id).await
    }

    /// Goals of an athlete, optionally filtered by status
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown athlete
    pub async fn list_goals(
        &self,
        subject_id: i64,
        status: Option<GoalStatus>,
    ) -> AppResult<Vec<GoalView>> {
        self.ensure_athlete(subject_id).await?;
        let goals = self
            .database
            .goals()
            .list_for_athlete(subject_id, status)
            .await?;
        Ok(goals.into_iter().map(|g| self.view(g)).collect())
    }

    /// Active goals and personal records of an athlete
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown athlete
    pub async fn dashboard(&self, subject_id: i64) -> AppResult<GoalDashboard> {
        let subject = self
            .database
            .athletes()
            .get(subject_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Athlete {subject_id}")))?;
        let goals = self
            .database
            .goals()
            .list_for_athlete(subject_id, Some(GoalStatus::Active))
            .await?;
        let records = self.database.records().list_for_athlete(subject_id).await?;

        Ok(GoalDashboard {
            subject,
            goals: goals.into_iter().map(|g| self.view(g)).collect(),
            records,
        })
    }
}

fn validate_values(start_value: f64, target_value: f64) -> AppResult<()> {
    let mut errors = Vec::new();
    if !start_value.is_finite() {
        errors.push(FieldError::new("startValue", "must be a finite number"));
    }
    if !target_value.is_finite() {
        errors.push(FieldError::new("targetValue", "must be a finite number"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        warn!(fields = errors.len(), "Rejected goal values");
        Err(AppError::validation(errors))
    }
}

fn validate_dates(start_date: NaiveDate, target_date: Option<NaiveDate>) -> AppResult<()> {
    match target_date {
        Some(target) if target < start_date => Err(AppError::out_of_range(
            "targetDate",
            "must not be before the start date",
        )),
        _ => Ok(()),
    }
}
