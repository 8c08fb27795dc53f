// ABOUTME: Personal record detection and persistence for finished sessions
// ABOUTME: Loads completed-session history, runs detection and writes records idempotently
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use trainbook_intelligence::check_records;

use crate::database::records::insert_record_if_absent;
use crate::database::sessions::completed_general_values;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    record_title, FieldDefinition, FieldValues, NewPersonalRecord, PersonalRecord, RecordCheck,
    TemplateSnapshot,
};

/// Detection outcome for one participant of a finished session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecords {
    /// Participant
    pub subject_id: i64,
    /// One check per numeric field, record or not
    pub checks: Vec<RecordCheck>,
    /// Records persisted by this finish
    pub created: Vec<PersonalRecord>,
}

/// Personal record detection and storage
#[derive(Clone)]
pub struct RecordDetectionService {
    database: Database,
}

impl RecordDetectionService {
    /// Create a record detection service
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    /// Check captured values against a subject's completed sessions
    ///
    /// # Errors
    ///
    /// Returns an error if history cannot be loaded
    pub async fn check_records(
        &self,
        subject_id: i64,
        template_id: i64,
        captured: &FieldValues,
        field_defs: &[FieldDefinition],
    ) -> AppResult<Vec<RecordCheck>> {
        let mut conn = self
            .database
            .pool()
            .acquire()
            .await
            .map_err(|e| AppError::database(format!("Failed to acquire connection: {e}")))?;
        detect(&mut conn, subject_id, template_id, None, captured, field_defs).await
    }

    /// Records of an athlete, newest first
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown athlete
    pub async fn list_records(&self, subject_id: i64) -> AppResult<Vec<PersonalRecord>> {
        if !self.database.athletes().exists(subject_id).await? {
            return Err(AppError::not_found(format!("Athlete {subject_id}")));
        }
        self.database.records().list_for_athlete(subject_id).await
    }

    /// Hard-delete a record
    ///
    /// # Errors
    ///
    /// Returns not-found if the record does not exist
    pub async fn delete_record(&self, id: i64) -> AppResult<()> {
        self.database.records().delete(id).await
    }
}

/// Run detection on an existing connection
///
/// `exclude_session_id` keeps a session that is already completed from being
/// compared with itself when it is finished again.
///
/// # Errors
///
/// Returns an error if history cannot be loaded
pub async fn detect(
    conn: &mut SqliteConnection,
    subject_id: i64,
    template_id: i64,
    exclude_session_id: Option<i64>,
    captured: &FieldValues,
    field_defs: &[FieldDefinition],
) -> AppResult<Vec<RecordCheck>> {
    let history =
        completed_general_values(conn, subject_id, template_id, exclude_session_id).await?;
    debug!(
        athlete.id = subject_id,
        template.id = template_id,
        history_sessions = history.len(),
        "Loaded record history"
    );
    Ok(check_records(captured, field_defs, &history))
}

/// Detect and persist records for every participant of a session being finished
///
/// Only general values are consulted. A record already written for the same
/// `(athlete, session, title, value)` is not written again, so re-finishing
/// with a corrected best adds a row for the new value.
///
/// # Errors
///
/// Returns an error if history cannot be loaded or an insert fails
pub async fn record_session_bests(
    conn: &mut SqliteConnection,
    session_id: i64,
    snapshot: &TemplateSnapshot,
    participant_ids: &[i64],
    general_values: &FieldValues,
    achieved_at: DateTime<Utc>,
) -> AppResult<Vec<ParticipantRecords>> {
    let mut outcomes = Vec::with_capacity(participant_ids.len());

    for &subject_id in participant_ids {
        let checks = detect(
            conn,
            subject_id,
            snapshot.template_id,
            Some(session_id),
            general_values,
            &snapshot.fields,
        )
        .await?;

        let mut created = Vec::new();
        for check in checks.iter().filter(|c| c.is_new_record) {
            let record = NewPersonalRecord {
                subject_id,
                title: record_title(&check.field_label, &snapshot.template_name),
                value: check.new_value,
                unit: check.unit.clone(),
                achieved_at,
                session_id: Some(session_id),
            };
            if let Some(saved) = insert_record_if_absent(conn, &record).await? {
                created.push(saved);
            }
        }

        if !created.is_empty() {
            info!(
                session.id = session_id,
                athlete.id = subject_id,
                records = created.len(),
                "New personal records"
            );
        }
        outcomes.push(ParticipantRecords {
            subject_id,
            checks,
            created,
        });
    }

    Ok(outcomes)
}
