// ABOUTME: File-backed database tests
// ABOUTME: Schema creation in a fresh directory, data surviving a reconnect and edits under a busy writer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use std::time::Duration;

use serde_json::json;
use sqlx::{Connection, SqliteConnection};
use tempfile::TempDir;
use trainbook_server::{
    database::{fields::UpdateFieldRequest, Database},
    services::SessionService,
};

use common::{init_test_logging, strength_fixture, values};
use trainbook_server::services::{CreateSessionRequest, FinishSessionRequest};

#[tokio::test]
async fn test_sessions_survive_reconnect() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("trainbook.db");
    let url = format!("sqlite:{}", path.display());

    let session_id = {
        let database = Database::new(&url).await.unwrap();
        let fx = strength_fixture(&database).await;
        let sessions = SessionService::new(database.clone(), 10);
        let session = sessions
            .create_session(&CreateSessionRequest {
                template_id: fx.template.id,
                subject_ids: vec![fx.athlete.id],
                session_date: None,
            })
            .await
            .unwrap();
        sessions
            .finish_session(
                session.session.id,
                &FinishSessionRequest {
                    general_values: values(&[("squat_weight", json!(110))]),
                    ..FinishSessionRequest::default()
                },
            )
            .await
            .unwrap();
        session.session.id
    };
    assert!(path.exists());

    let database = Database::new(&url).await.unwrap();
    let session = database.sessions().get(session_id).await.unwrap();
    assert_eq!(session.general_values["squat_weight"], json!(110));
    assert!(session.end_time.is_some());
    assert_eq!(session.template_snapshot.fields.len(), 1);

    let athlete_id = session.participants[0].id;
    let records = database.records().list_for_athlete(athlete_id).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_field_edit_survives_a_concurrent_writer() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}", dir.path().join("trainbook.db").display());
    let database = Database::new(&url).await.unwrap();
    let fx = strength_fixture(&database).await;

    let mut writer = SqliteConnection::connect(&url).await.unwrap();
    sqlx::query("BEGIN IMMEDIATE").execute(&mut writer).await.unwrap();
    sqlx::query("INSERT INTO sports (name, created_at) VALUES ('Rowing', $1)")
        .bind("2025-01-01T00:00:00.000000Z")
        .execute(&mut writer)
        .await
        .unwrap();
    let release = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(25)).await;
        sqlx::query("COMMIT").execute(&mut writer).await.unwrap();
    });

    let updated = database
        .fields()
        .update(
            fx.squat.id,
            &UpdateFieldRequest {
                label: Some("Back Squat".to_owned()),
                ..UpdateFieldRequest::default()
            },
        )
        .await
        .unwrap();
    release.await.unwrap();

    assert_eq!(updated.label, "Back Squat");
    assert_eq!(updated.key, "squat_weight");
    assert_eq!(database.sports().list().await.unwrap().len(), 2);
}
