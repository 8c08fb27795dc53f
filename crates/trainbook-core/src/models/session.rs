// ABOUTME: Training session model with frozen template snapshot and dual-scope value maps
// ABOUTME: Session status derivation and the participant/value types captured during a session
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::template::TemplateSnapshot;

/// Captured values keyed by field key
pub type FieldValues = BTreeMap<String, serde_json::Value>;

/// Per-participant captured values keyed by subject id
pub type SubjectValues = BTreeMap<i64, FieldValues>;

/// A participant of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Athlete identifier
    pub id: i64,
    /// Display name
    pub name: String,
}

/// Lifecycle state derived from `end_time`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No end time recorded yet
    Active,
    /// End time recorded; still editable and re-finishable
    Completed,
}

/// One executed or ongoing training instance against a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique identifier
    pub id: i64,
    /// Write-once copy of the template taken at creation
    pub template_snapshot: TemplateSnapshot,
    /// Participating subjects
    pub participants: Vec<Subject>,
    /// Values shared by the whole session
    pub general_values: FieldValues,
    /// Values recorded per participant
    pub subject_values: SubjectValues,
    /// Calendar day the session belongs to
    pub session_date: NaiveDate,
    /// Canonical start, may be overwritten when finishing with an explicit start
    pub start_time: DateTime<Utc>,
    /// Set once the session is finished
    pub end_time: Option<DateTime<Utc>>,
    /// Duration in whole seconds
    pub duration_seconds: Option<i64>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Lifecycle state of this session
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        if self.end_time.is_some() {
            SessionStatus::Completed
        } else {
            SessionStatus::Active
        }
    }

    /// Whether `subject_id` takes part in this session
    #[must_use]
    pub fn has_participant(&self, subject_id: i64) -> bool {
        self.participants.iter().any(|p| p.id == subject_id)
    }
}

/// Timing inputs for finishing a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinishTiming {
    /// Overrides the computed duration
    pub explicit_duration: Option<i64>,
    /// Overrides (and replaces) the session start
    pub explicit_start: Option<DateTime<Utc>>,
    /// Overrides the end, defaults to now
    pub explicit_end: Option<DateTime<Utc>>,
}

/// Resolved timing persisted by a finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTiming {
    /// Start written back to the session
    pub start_time: DateTime<Utc>,
    /// End time
    pub end_time: DateTime<Utc>,
    /// Duration in whole seconds
    pub duration_seconds: i64,
}

impl FinishTiming {
    /// Resolve end, start and duration against the session's current start
    ///
    /// `end = explicit_end ?? now`, `start = explicit_start ?? session_start`,
    /// `duration = explicit_duration ?? floor((end - start) in seconds)`.
    #[must_use]
    pub fn resolve(&self, session_start: DateTime<Utc>, now: DateTime<Utc>) -> ResolvedTiming {
        let end_time = self.explicit_end.unwrap_or(now);
        let start_time = self.explicit_start.unwrap_or(session_start);
        let duration_seconds = self.explicit_duration.unwrap_or_else(|| {
            (end_time - start_time).num_milliseconds().div_euclid(1000)
        });
        ResolvedTiming {
            start_time,
            end_time,
            duration_seconds,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_explicit_duration_wins() {
        let timing = FinishTiming {
            explicit_duration: Some(600),
            explicit_start: None,
            explicit_end: Some(at(10, 30, 0)),
        };
        let resolved = timing.resolve(at(10, 0, 0), at(11, 0, 0));
        assert_eq!(resolved.duration_seconds, 600);
        assert_eq!(resolved.end_time, at(10, 30, 0));
    }

    #[test]
    fn test_duration_is_floored_seconds() {
        let timing = FinishTiming::default();
        let now = at(10, 0, 42) + Duration::milliseconds(999);
        let resolved = timing.resolve(at(10, 0, 0), now);
        assert_eq!(resolved.duration_seconds, 42);
        assert_eq!(resolved.start_time, at(10, 0, 0));
    }

    #[test]
    fn test_explicit_start_replaces_session_start() {
        let timing = FinishTiming {
            explicit_duration: None,
            explicit_start: Some(at(9, 0, 0)),
            explicit_end: Some(at(10, 0, 0)),
        };
        let resolved = timing.resolve(at(9, 45, 0), at(12, 0, 0));
        assert_eq!(resolved.start_time, at(9, 0, 0));
        assert_eq!(resolved.duration_seconds, 3600);
    }
}
