// ABOUTME: Integration tests for personal record detection across finished sessions
// ABOUTME: Strictly-greater comparison, per-participant history, idempotent re-finish and record deletion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use trainbook_server::{
    errors::ErrorCode,
    resources::ServerResources,
    services::{CreateSessionRequest, FinishOutcome, FinishSessionRequest},
};

use common::{create_athlete, create_test_resources, strength_fixture, values};

async fn run_session(
    resources: &ServerResources,
    template_id: i64,
    subject_ids: Vec<i64>,
    squat: Value,
    day: u32,
) -> FinishOutcome {
    let session = resources
        .sessions
        .create_session(&CreateSessionRequest {
            template_id,
            subject_ids,
            session_date: None,
        })
        .await
        .unwrap();
    let start = Utc.with_ymd_and_hms(2025, 4, day, 9, 0, 0).unwrap();
    resources
        .sessions
        .finish_session(
            session.session.id,
            &FinishSessionRequest {
                general_values: values(&[("squat_weight", squat)]),
                start_time: Some(start),
                end_time: Some(start + Duration::hours(1)),
                ..FinishSessionRequest::default()
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_records_require_strictly_greater_values() {
    let resources = create_test_resources().await;
    let db = &resources.database;
    let fx = strength_fixture(db).await;
    let ana = fx.athlete.id;

    let first = run_session(&resources, fx.template.id, vec![ana], json!(100), 1).await;
    let check = &first.records[0].checks[0];
    assert!(check.is_new_record);
    assert_eq!(check.previous_record, None);
    assert_eq!(check.unit.as_deref(), Some("kg"));
    assert_eq!(first.records[0].created.len(), 1);

    let tie = run_session(&resources, fx.template.id, vec![ana], json!(100), 2).await;
    let check = &tie.records[0].checks[0];
    assert!(!check.is_new_record);
    assert_eq!(check.previous_record, Some(100.0));
    assert!(tie.records[0].created.is_empty());

    let better = run_session(&resources, fx.template.id, vec![ana], json!("105"), 3).await;
    let check = &better.records[0].checks[0];
    assert!(check.is_new_record);
    assert_eq!(check.previous_record, Some(100.0));
    assert!((check.new_value - 105.0).abs() < f64::EPSILON);

    let records = resources.records.list_records(ana).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!((records[0].value - 105.0).abs() < f64::EPSILON);
    assert_eq!(records[0].title, "Squat Weight - Strength");
    assert_eq!(
        records[0].achieved_at,
        Utc.with_ymd_and_hms(2025, 4, 3, 10, 0, 0).unwrap()
    );
    assert_eq!(records[0].session_id, Some(better.session.session.id));
}

#[tokio::test]
async fn test_refinish_does_not_duplicate_records() {
    let resources = create_test_resources().await;
    let db = &resources.database;
    let fx = strength_fixture(db).await;

    let outcome = run_session(&resources, fx.template.id, vec![fx.athlete.id], json!(120), 5).await;
    let id = outcome.session.session.id;

    let again = resources
        .sessions
        .finish_session(
            id,
            &FinishSessionRequest {
                general_values: values(&[("squat_weight", json!(120))]),
                ..FinishSessionRequest::default()
            },
        )
        .await
        .unwrap();
    let check = &again.records[0].checks[0];
    assert!(check.is_new_record);
    assert_eq!(check.previous_record, None);
    assert!(again.records[0].created.is_empty());

    let records = resources.records.list_records(fx.athlete.id).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_refinish_with_corrected_best_stores_new_value() {
    let resources = create_test_resources().await;
    let db = &resources.database;
    let fx = strength_fixture(db).await;

    let outcome = run_session(&resources, fx.template.id, vec![fx.athlete.id], json!(100), 5).await;
    let id = outcome.session.session.id;

    let corrected = resources
        .sessions
        .finish_session(
            id,
            &FinishSessionRequest {
                general_values: values(&[("squat_weight", json!(120))]),
                ..FinishSessionRequest::default()
            },
        )
        .await
        .unwrap();
    let check = &corrected.records[0].checks[0];
    assert!(check.is_new_record);
    assert_eq!(corrected.records[0].created.len(), 1);
    assert!((corrected.records[0].created[0].value - 120.0).abs() < f64::EPSILON);

    let stored: Vec<f64> = resources
        .records
        .list_records(fx.athlete.id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.value)
        .collect();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().any(|v| (v - 120.0).abs() < f64::EPSILON));
    assert!(stored.iter().all(|v| *v <= 120.0));
}

#[tokio::test]
async fn test_each_participant_is_checked_against_own_history() {
    let resources = create_test_resources().await;
    let db = &resources.database;
    let fx = strength_fixture(db).await;
    let bo = create_athlete(db, "Bo", fx.sport.id).await;

    run_session(&resources, fx.template.id, vec![fx.athlete.id], json!(140), 1).await;
    let shared = run_session(
        &resources,
        fx.template.id,
        vec![fx.athlete.id, bo.id],
        json!(130),
        2,
    )
    .await;

    let ana = shared
        .records
        .iter()
        .find(|r| r.subject_id == fx.athlete.id)
        .unwrap();
    let bo_records = shared.records.iter().find(|r| r.subject_id == bo.id).unwrap();
    assert!(!ana.checks[0].is_new_record);
    assert_eq!(ana.checks[0].previous_record, Some(140.0));
    assert!(bo_records.checks[0].is_new_record);
    assert_eq!(bo_records.created.len(), 1);
}

#[tokio::test]
async fn test_non_numeric_values_are_skipped() {
    let resources = create_test_resources().await;
    let db = &resources.database;
    let fx = strength_fixture(db).await;

    let outcome = run_session(&resources, fx.template.id, vec![fx.athlete.id], json!("heavy"), 1).await;
    assert!(outcome.records[0].checks.is_empty());
    assert!(resources
        .records
        .list_records(fx.athlete.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_check_records_reads_only_completed_sessions() {
    let resources = create_test_resources().await;
    let db = &resources.database;
    let fx = strength_fixture(db).await;
    let fields = vec![fx.squat.clone()];

    resources
        .sessions
        .create_session(&CreateSessionRequest {
            template_id: fx.template.id,
            subject_ids: vec![fx.athlete.id],
            session_date: None,
        })
        .await
        .unwrap();

    let checks = resources
        .records
        .check_records(
            fx.athlete.id,
            fx.template.id,
            &values(&[("squat_weight", json!(60))]),
            &fields,
        )
        .await
        .unwrap();
    assert!(checks[0].is_new_record);
    assert_eq!(checks[0].previous_record, None);
}

#[tokio::test]
async fn test_delete_record_and_unknown_athlete() {
    let resources = create_test_resources().await;
    let db = &resources.database;
    let fx = strength_fixture(db).await;
    let outcome = run_session(&resources, fx.template.id, vec![fx.athlete.id], json!(80), 1).await;
    let record_id = outcome.records[0].created[0].id;

    resources.records.delete_record(record_id).await.unwrap();
    assert!(resources
        .records
        .list_records(fx.athlete.id)
        .await
        .unwrap()
        .is_empty());

    let err = resources.records.delete_record(record_id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
    let err = resources.records.list_records(404).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}
