// ABOUTME: Personal record facts and the per-field outcome of record detection
// ABOUTME: PersonalRecord is additive only; RecordCheck reports every numeric field checked
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::records::TITLE_SEPARATOR;

/// A subject's confirmed best-ever value for a metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalRecord {
    /// Unique identifier
    pub id: i64,
    /// Athlete who set the record
    pub subject_id: i64,
    /// `"<field label> - <template name>"`
    pub title: String,
    /// Record value
    pub value: f64,
    /// Unit of the value
    pub unit: Option<String>,
    /// When the record was set
    pub achieved_at: DateTime<Utc>,
    /// Session the value was captured in
    pub session_id: Option<i64>,
}

/// Values for a record about to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewPersonalRecord {
    /// Athlete who set the record
    pub subject_id: i64,
    /// Record title
    pub title: String,
    /// Record value
    pub value: f64,
    /// Unit of the value
    pub unit: Option<String>,
    /// When the record was set
    pub achieved_at: DateTime<Utc>,
    /// Source session
    pub session_id: Option<i64>,
}

/// Build a record title from a field label and template name
#[must_use]
pub fn record_title(field_label: &str, template_name: &str) -> String {
    format!("{field_label}{TITLE_SEPARATOR}{template_name}")
}

/// Outcome of checking one numeric field against a subject's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCheck {
    /// Field key
    pub field_key: String,
    /// Field label
    pub field_label: String,
    /// Newly captured value
    pub new_value: f64,
    /// Strictly greater than every historical value (or no history at all)
    pub is_new_record: bool,
    /// Best historical value, if any history exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_record: Option<f64>,
    /// Field unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}
