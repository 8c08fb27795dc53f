// ABOUTME: Personal record detection comparing newly captured numbers to a subject's history
// ABOUTME: Strictly-greater comparison; no history means the first value is always a record
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use serde_json::Value;
use trainbook_core::models::{FieldDefinition, FieldType, FieldValues, RecordCheck};

/// Interpret a captured value as a finite number
///
/// Accepts JSON numbers and numeric strings; anything else (including `NaN`)
/// is not numeric.
#[must_use]
pub fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Check every numeric captured value against historical values
///
/// `history` holds the general-value maps of the subject's completed
/// sessions for the same template, excluding the session being checked.
/// Per-subject values are never consulted.
///
/// One [`RecordCheck`] is produced per number field (in `field_defs` order)
/// whose captured value is numeric, whether or not it is a record:
///
/// - no historical value for the key: always a record, no `previous_record`
/// - otherwise a record only when strictly greater than the historical max
#[must_use]
pub fn check_records(
    captured: &FieldValues,
    field_defs: &[FieldDefinition],
    history: &[FieldValues],
) -> Vec<RecordCheck> {
    field_defs
        .iter()
        .filter(|field| field.field_type() == FieldType::Number)
        .filter_map(|field| {
            let new_value = captured.get(&field.key).and_then(numeric_value)?;

            let previous_record = history
                .iter()
                .filter_map(|values| values.get(&field.key).and_then(numeric_value))
                .reduce(f64::max);

            let is_new_record = previous_record.map_or(true, |best| new_value > best);

            tracing::debug!(
                field.key = %field.key,
                new_value,
                previous_record = ?previous_record,
                is_new_record,
                "Checked captured value against history"
            );

            Some(RecordCheck {
                field_key: field.key.clone(),
                field_label: field.label.clone(),
                new_value,
                is_new_record,
                previous_record,
                unit: field.unit.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use trainbook_core::models::{FieldKind, FieldScope, LifecycleStatus, NumberConfig};

    fn field(key: &str, kind: FieldKind) -> FieldDefinition {
        let now = Utc::now();
        FieldDefinition {
            id: 1,
            template_id: 1,
            key: key.into(),
            label: key.replace('_', " "),
            kind,
            unit: Some("kg".into()),
            sort_order: 0,
            required: false,
            scope: FieldScope::General,
            parent_id: None,
            status: LifecycleStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn values(pairs: &[(&str, Value)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn squat() -> Vec<FieldDefinition> {
        vec![field("squat_weight", FieldKind::Number(NumberConfig::default()))]
    }

    #[test]
    fn test_no_history_is_always_a_record() {
        let checks = check_records(&values(&[("squat_weight", json!(80))]), &squat(), &[]);

        assert_eq!(checks.len(), 1);
        assert!(checks[0].is_new_record);
        assert_eq!(checks[0].previous_record, None);
        assert_eq!(checks[0].unit.as_deref(), Some("kg"));
    }

    #[test]
    fn test_tie_is_not_a_record() {
        let history = vec![
            values(&[("squat_weight", json!(90))]),
            values(&[("squat_weight", json!(100))]),
        ];
        let checks = check_records(&values(&[("squat_weight", json!(100))]), &squat(), &history);

        assert!(!checks[0].is_new_record);
        assert_eq!(checks[0].previous_record, Some(100.0));
    }

    #[test]
    fn test_strict_improvement_is_a_record() {
        let history = vec![values(&[("squat_weight", json!(100))])];
        let checks = check_records(&values(&[("squat_weight", json!(105))]), &squat(), &history);

        assert!(checks[0].is_new_record);
        assert_eq!(checks[0].previous_record, Some(100.0));
        assert!((checks[0].new_value - 105.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_history_without_the_key_counts_as_no_history() {
        let history = vec![values(&[("bench_weight", json!(70))])];
        let checks = check_records(&values(&[("squat_weight", json!(60))]), &squat(), &history);

        assert!(checks[0].is_new_record);
        assert_eq!(checks[0].previous_record, None);
    }

    #[test]
    fn test_non_numeric_fields_and_values_are_skipped() {
        let defs = vec![
            field("squat_weight", FieldKind::Number(NumberConfig::default())),
            field("notes", FieldKind::Text),
            field("bench_weight", FieldKind::Number(NumberConfig::default())),
        ];
        let captured = values(&[
            ("squat_weight", json!("not a number")),
            ("notes", json!("42")),
            ("bench_weight", json!(" 72.5 ")),
        ]);

        let checks = check_records(&captured, &defs, &[]);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].field_key, "bench_weight");
        assert!((checks[0].new_value - 72.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_numeric_value_rejects_nan() {
        assert_eq!(numeric_value(&json!("NaN")), None);
        assert_eq!(numeric_value(&json!(true)), None);
        assert_eq!(numeric_value(&json!(3)), Some(3.0));
    }
}
