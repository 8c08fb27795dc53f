// ABOUTME: Goal and goal-history models for subject progress tracking
// ABOUTME: Goal status lifecycle and the append-only history entries that drive progress
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Goal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Being worked on
    #[default]
    Active,
    /// Target reached
    Completed,
    /// Abandoned past its deadline (set manually)
    Expired,
}

impl GoalStatus {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "expired" => Self::Expired,
            _ => Self::Active,
        }
    }
}

/// One progress mark of a goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalHistoryEntry {
    /// Unique identifier
    pub id: i64,
    /// Owning goal
    pub goal_id: i64,
    /// Measured value
    pub value: f64,
    /// Optional notes
    pub notes: Option<String>,
    /// When the mark was recorded
    pub recorded_at: DateTime<Utc>,
}

/// A tracked numeric objective for a subject
///
/// The current value is never stored; it is derived from `history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    /// Unique identifier
    pub id: i64,
    /// Athlete the goal belongs to
    pub subject_id: i64,
    /// Display title
    pub title: String,
    /// Name of the measured metric
    pub metric_label: Option<String>,
    /// Unit of `start_value`/`target_value`
    pub unit: String,
    /// Baseline value
    pub start_value: f64,
    /// Value that completes the goal
    pub target_value: f64,
    /// Day the goal started
    pub start_date: NaiveDate,
    /// Optional deadline
    pub target_date: Option<NaiveDate>,
    /// Lifecycle status
    pub status: GoalStatus,
    /// Coach notes on how to get there
    pub strategy_notes: Option<String>,
    /// Progress marks ordered by `recorded_at`
    pub history: Vec<GoalHistoryEntry>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// Most recent history entry by recorded date (ties broken by id)
    #[must_use]
    pub fn latest_entry(&self) -> Option<&GoalHistoryEntry> {
        self.history
            .iter()
            .max_by_key(|entry| (entry.recorded_at, entry.id))
    }
}
