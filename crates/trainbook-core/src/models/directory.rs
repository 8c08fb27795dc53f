// ABOUTME: Sport and athlete directory models referenced by templates, sessions and goals
// ABOUTME: Subjects are owned externally; these records only give them ids and names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sport templates are grouped by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sport {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// An athlete (session participant, goal subject)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Athlete {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Sports the athlete practices
    pub sport_ids: Vec<i64>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}
