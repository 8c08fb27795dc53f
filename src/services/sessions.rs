// ABOUTME: Session capture engine: snapshotting, whole-map value writes and finishing
// ABOUTME: Finishing resolves timing and detects personal records in one transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! # Session Capture
//!
//! A session freezes its template at creation. Later edits to the template
//! never reach an existing session because only the embedded snapshot is read.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::records::{record_session_bests, ParticipantRecords};
use crate::database::directory::{fetch_sport, fetch_subjects};
use crate::database::fields::fetch_active_fields;
use crate::database::sessions::{
    fetch_session, insert_session, write_finish, FinishWrite, ListSessionsFilter,
};
use crate::database::templates::fetch_active_template;
use crate::database::{retry_transaction, Database, TRANSACTION_RETRIES};
use crate::errors::{AppError, AppResult, FieldError};
use crate::models::{
    missing_required, visible_fields, FieldDefinition, FieldScope, FieldValues, FinishTiming,
    Session, SessionStatus, SubjectValues, TemplateSnapshot,
};

/// Request to start a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Template to snapshot
    pub template_id: i64,
    /// Participants, in display order
    pub subject_ids: Vec<i64>,
    /// Calendar day, defaults to today (UTC)
    #[serde(default)]
    pub session_date: Option<NaiveDate>,
}

/// Whole-map value write for a session in progress
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesRequest {
    /// Replaces the stored general map
    #[serde(default)]
    pub general_values: FieldValues,
    /// Replaces the stored per-subject map when present
    #[serde(default)]
    pub subject_values: Option<SubjectValues>,
    /// Replaces the notes when present
    #[serde(default)]
    pub notes: Option<String>,
}

/// Values and optional timing overrides for finishing a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishSessionRequest {
    /// Final general values
    #[serde(default)]
    pub general_values: FieldValues,
    /// Final per-subject values; the stored map is kept when absent
    #[serde(default)]
    pub subject_values: Option<SubjectValues>,
    /// Notes; stored notes are kept when absent
    #[serde(default)]
    pub notes: Option<String>,
    /// Overrides the computed duration
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    /// Overrides and replaces the session start
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Overrides the end, defaults to now
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

/// Required fields that are visible but empty, per scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingRequired {
    /// Missing general field keys
    pub general: Vec<String>,
    /// Missing subject field keys per participant
    pub subjects: BTreeMap<i64, Vec<String>>,
}

/// Session read model
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    /// The stored session
    #[serde(flatten)]
    pub session: Session,
    /// Derived lifecycle state
    pub status: SessionStatus,
    /// Non-blocking completeness report
    pub missing_required: MissingRequired,
}

impl SessionDetail {
    /// Derive status and the missing-required report from the snapshot
    #[must_use]
    pub fn from_session(session: Session) -> Self {
        let fields = &session.template_snapshot.fields;
        let empty = FieldValues::new();
        let subjects = session
            .participants
            .iter()
            .map(|p| {
                let values = session.subject_values.get(&p.id).unwrap_or(&empty);
                (p.id, missing_required(fields, FieldScope::Subject, values))
            })
            .collect();
        let missing_required = MissingRequired {
            general: missing_required(fields, FieldScope::General, &session.general_values),
            subjects,
        };
        Self {
            status: session.status(),
            missing_required,
            session,
        }
    }
}

/// Result of finishing a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishOutcome {
    /// The finished session
    pub session: SessionDetail,
    /// Record detection per participant
    pub records: Vec<ParticipantRecords>,
}

/// Session lifecycle operations
#[derive(Clone)]
pub struct SessionService {
    database: Database,
    max_participants: usize,
}

impl SessionService {
    /// Create a session service
    #[must_use]
    pub const fn new(database: Database, max_participants: usize) -> Self {
        Self {
            database,
            max_participants,
        }
    }

    /// Start a session, freezing the template's active fields into its snapshot
    ///
    /// # Errors
    ///
    /// Returns a validation error without participants, not-found for an
    /// unknown template or athlete
    pub async fn create_session(&self, request: &CreateSessionRequest) -> AppResult<SessionDetail> {
        let subject_ids = self.validate_participants(&request.subject_ids)?;
        let session_date = request
            .session_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let template_id = request.template_id;
        let subject_ids = &subject_ids;

        let id = retry_transaction(
            || async move {
                let mut guard = self.database.begin().await?;
                let conn = guard.executor()?;

                let template = fetch_active_template(conn, template_id).await?;
                let sport = fetch_sport(conn, template.sport_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Sport {}", template.sport_id)))?;
                let participants = fetch_subjects(conn, subject_ids).await?;
                let snapshot = TemplateSnapshot {
                    template_id: template.id,
                    template_name: template.name,
                    sport_id: sport.id,
                    sport_name: sport.name,
                    fields: fetch_active_fields(conn, template_id).await?,
                };

                let id =
                    insert_session(conn, &snapshot, &participants, session_date, Utc::now())
                        .await?;
                guard.commit().await?;
                Ok(id)
            },
            TRANSACTION_RETRIES,
        )
        .await?;

        info!(
            session.id = id,
            template.id = template_id,
            participants = subject_ids.len(),
            "Session created"
        );
        self.get_session(id).await
    }

    /// Session with snapshot, status and missing-required report
    ///
    /// # Errors
    ///
    /// Returns not-found if the session does not exist
    pub async fn get_session(&self, id: i64) -> AppResult<SessionDetail> {
        let session = self.database.sessions().get(id).await?;
        Ok(SessionDetail::from_session(session))
    }

    /// Sessions filtered by participant and template
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_sessions(&self, filter: ListSessionsFilter) -> AppResult<Vec<SessionDetail>> {
        let sessions = self.database.sessions().list(filter).await?;
        Ok(sessions.into_iter().map(SessionDetail::from_session).collect())
    }

    /// Replace the captured values of a session, last write wins
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing session, a validation error when
    /// per-subject values name a non-participant
    pub async fn update_values(
        &self,
        id: i64,
        request: &UpdateValuesRequest,
    ) -> AppResult<SessionDetail> {
        let sessions = self.database.sessions();
        let session = sessions.get(id).await?;
        if let Some(subject_values) = &request.subject_values {
            ensure_participants(&session, subject_values)?;
        }

        sessions
            .replace_values(
                id,
                &request.general_values,
                request.subject_values.as_ref(),
                request.notes.as_deref(),
            )
            .await?;
        self.get_session(id).await
    }

    /// Finish, or re-finish, a session
    ///
    /// Values, notes and timing are written together with any personal
    /// records in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing session, validation errors for a
    /// negative duration or a non-participant in per-subject values
    pub async fn finish_session(
        &self,
        id: i64,
        request: &FinishSessionRequest,
    ) -> AppResult<FinishOutcome> {
        if request.duration_seconds.is_some_and(|d| d < 0) {
            warn!(session.id = id, "Rejected negative session duration");
            return Err(AppError::out_of_range(
                "durationSeconds",
                "must not be negative",
            ));
        }
        let timing = FinishTiming {
            explicit_duration: request.duration_seconds,
            explicit_start: request.start_time,
            explicit_end: request.end_time,
        };

        let records = retry_transaction(
            || async move {
                let mut guard = self.database.begin().await?;
                let conn = guard.executor()?;

                let session = fetch_session(conn, id).await?;
                if let Some(subject_values) = &request.subject_values {
                    ensure_participants(&session, subject_values)?;
                }
                let resolved = timing.resolve(session.start_time, Utc::now());
                if resolved.duration_seconds < 0 {
                    return Err(AppError::out_of_range(
                        "endTime",
                        "must not precede the start time",
                    ));
                }

                let participant_ids: Vec<i64> = session.participants.iter().map(|p| p.id).collect();
                let records = record_session_bests(
                    conn,
                    id,
                    &session.template_snapshot,
                    &participant_ids,
                    &request.general_values,
                    resolved.end_time,
                )
                .await?;

                let write = FinishWrite {
                    general_values: &request.general_values,
                    subject_values: request
                        .subject_values
                        .as_ref()
                        .unwrap_or(&session.subject_values),
                    notes: request.notes.as_deref().or(session.notes.as_deref()),
                    timing: resolved,
                };
                write_finish(conn, id, &write).await?;

                guard.commit().await?;
                Ok(records)
            },
            TRANSACTION_RETRIES,
        )
        .await?;

        let session = self.get_session(id).await?;
        info!(
            session.id = id,
            duration_seconds = ?session.session.duration_seconds,
            new_records = records.iter().map(|r| r.created.len()).sum::<usize>(),
            "Session finished"
        );
        Ok(FinishOutcome { session, records })
    }

    /// Hard-delete a session
    ///
    /// # Errors
    ///
    /// Returns not-found if the session does not exist
    pub async fn delete_session(&self, id: i64) -> AppResult<()> {
        self.database.sessions().delete(id).await
    }

    /// Capturable snapshot fields of a scope given the values captured so far
    ///
    /// Subject scope reads the values of `subject_id`, which must be a participant.
    ///
    /// # Errors
    ///
    /// Returns not-found for a missing session, a validation error when the
    /// subject is missing or not a participant
    pub async fn visible_fields(
        &self,
        id: i64,
        scope: FieldScope,
        subject_id: Option<i64>,
    ) -> AppResult<Vec<FieldDefinition>> {
        let session = self.database.sessions().get(id).await?;
        let empty = FieldValues::new();
        let values = match scope {
            FieldScope::General => &session.general_values,
            FieldScope::Subject => {
                let subject_id = subject_id.ok_or_else(|| AppError::missing_field("subjectId"))?;
                if !session.has_participant(subject_id) {
                    return Err(AppError::invalid_field(
                        "subjectId",
                        format!("athlete {subject_id} is not a participant"),
                    ));
                }
                session.subject_values.get(&subject_id).unwrap_or(&empty)
            }
        };

        Ok(visible_fields(&session.template_snapshot.fields, scope, values)
            .into_iter()
            .cloned()
            .collect())
    }

    fn validate_participants(&self, subject_ids: &[i64]) -> AppResult<Vec<i64>> {
        let mut unique = Vec::with_capacity(subject_ids.len());
        for id in subject_ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        if unique.is_empty() {
            return Err(AppError::validation(vec![FieldError::new(
                "subjectIds",
                "at least one participant is required",
            )]));
        }
        if unique.len() > self.max_participants {
            return Err(AppError::out_of_range(
                "subjectIds",
                format!("at most {} participants are allowed", self.max_participants),
            ));
        }
        Ok(unique)
    }
}

fn ensure_participants(session: &Session, subject_values: &SubjectValues) -> AppResult<()> {
    let strangers: Vec<FieldError> = subject_values
        .keys()
        .filter(|id| !session.has_participant(**id))
        .map(|id| {
            FieldError::new(
                format!("subjectValues.{id}"),
                format!("athlete {id} is not a participant of session {}", session.id),
            )
        })
        .collect();
    if strangers.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(strangers))
    }
}
