// ABOUTME: Goal progress computation from append-only history entries
// ABOUTME: Derived current value, clamped percentage rounded to one decimal and deadline flags
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use trainbook_core::models::{Goal, GoalStatus};

/// Derived current value: latest history entry, else the start value
#[must_use]
pub fn current_value(goal: &Goal) -> f64 {
    goal.latest_entry()
        .map_or(goal.start_value, |entry| entry.value)
}

/// Progress towards the target as a percentage in `[0, 100]`, one decimal
///
/// `progress = clamp((current - start) / (target - start), 0, 1)`; a goal whose
/// target equals its start reports `0`. Works for decreasing targets
/// (e.g. body weight) since the delta keeps its sign.
#[must_use]
pub fn progress_percentage(goal: &Goal) -> f64 {
    let delta = goal.target_value - goal.start_value;
    if delta == 0.0 || !delta.is_finite() {
        return 0.0;
    }
    let progress = ((current_value(goal) - goal.start_value) / delta).clamp(0.0, 1.0);
    let rounded = (progress * 1000.0).round() / 10.0;
    rounded.max(0.0)
}

/// Deadline flag computed for display; never written back to `status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    /// No target date, or the goal is no longer active
    None,
    /// Deadline is further away than the warning window
    OnTrack,
    /// Deadline falls within the warning window
    NearDeadline,
    /// Deadline has passed while the goal is still active
    Overdue,
}

/// Classify an active goal's deadline relative to `today`
#[must_use]
pub fn deadline_status(goal: &Goal, today: NaiveDate, near_deadline_days: i64) -> DeadlineStatus {
    if goal.status != GoalStatus::Active {
        return DeadlineStatus::None;
    }
    let Some(target_date) = goal.target_date else {
        return DeadlineStatus::None;
    };
    let days_left = (target_date - today).num_days();
    if days_left < 0 {
        DeadlineStatus::Overdue
    } else if days_left <= near_deadline_days {
        DeadlineStatus::NearDeadline
    } else {
        DeadlineStatus::OnTrack
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use trainbook_core::models::GoalHistoryEntry;

    fn goal(start_value: f64, target_value: f64, history: &[f64]) -> Goal {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        Goal {
            id: 1,
            subject_id: 1,
            title: "Squat".into(),
            metric_label: None,
            unit: "kg".into(),
            start_value,
            target_value,
            start_date: base.date_naive(),
            target_date: None,
            status: GoalStatus::Active,
            strategy_notes: None,
            history: history
                .iter()
                .enumerate()
                .map(|(i, value)| GoalHistoryEntry {
                    id: i64::try_from(i).unwrap() + 1,
                    goal_id: 1,
                    value: *value,
                    notes: None,
                    recorded_at: base + Duration::days(i64::try_from(i).unwrap()),
                })
                .collect(),
            created_at: base,
            updated_at: base,
        }
    }

    #[test]
    fn test_zero_delta_is_zero_percent() {
        assert!(progress_percentage(&goal(50.0, 50.0, &[])).abs() < f64::EPSILON);
        assert!(progress_percentage(&goal(50.0, 50.0, &[50.0, 80.0])).abs() < f64::EPSILON);
    }

    #[test]
    fn test_general_case_rounds_to_one_decimal() {
        let g = goal(10.0, 50.0, &[10.0, 35.0]);
        assert!((progress_percentage(&g) - 62.5).abs() < f64::EPSILON);

        let g = goal(0.0, 3.0, &[0.0, 1.0]);
        assert!((progress_percentage(&g) - 33.3).abs() < 1e-9);
    }

    #[test]
    fn test_progress_is_clamped() {
        assert!((progress_percentage(&goal(10.0, 50.0, &[70.0])) - 100.0).abs() < f64::EPSILON);
        assert!(progress_percentage(&goal(10.0, 50.0, &[5.0])).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decreasing_target() {
        let g = goal(90.0, 80.0, &[90.0, 85.0]);
        assert!((progress_percentage(&g) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_current_value_defaults_to_start() {
        assert!((current_value(&goal(12.0, 20.0, &[])) - 12.0).abs() < f64::EPSILON);
        assert!((current_value(&goal(12.0, 20.0, &[12.0, 14.0, 13.0])) - 13.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deadline_flags() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let mut g = goal(1.0, 2.0, &[]);
        assert_eq!(deadline_status(&g, today, 7), DeadlineStatus::None);

        g.target_date = NaiveDate::from_ymd_opt(2025, 6, 9);
        assert_eq!(deadline_status(&g, today, 7), DeadlineStatus::Overdue);

        g.target_date = NaiveDate::from_ymd_opt(2025, 6, 17);
        assert_eq!(deadline_status(&g, today, 7), DeadlineStatus::NearDeadline);

        g.target_date = NaiveDate::from_ymd_opt(2025, 7, 1);
        assert_eq!(deadline_status(&g, today, 7), DeadlineStatus::OnTrack);

        g.status = GoalStatus::Completed;
        g.target_date = NaiveDate::from_ymd_opt(2025, 6, 1);
        assert_eq!(deadline_status(&g, today, 7), DeadlineStatus::None);
    }
}
