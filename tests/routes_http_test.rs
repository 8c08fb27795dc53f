// ABOUTME: HTTP-level tests for the assembled router
// ABOUTME: Response envelope, status codes, extractor rejections, request ids and a full capture flow
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

#![allow(missing_docs, clippy::unwrap_used)]

mod common;
mod helpers;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::create_test_router;
use helpers::axum_test::AxumTestRequest;

#[tokio::test]
async fn test_health_and_ready() {
    let (app, _) = create_test_router().await;

    let health = AxumTestRequest::get("/health").send(app.clone()).await.data();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "trainbook-server");

    let ready = AxumTestRequest::get("/ready").send(app).await.data();
    assert_eq!(ready["database"], "ok");
}

#[tokio::test]
async fn test_request_id_is_generated_and_propagated() {
    let (app, _) = create_test_router().await;

    let response = AxumTestRequest::get("/health").send(app.clone()).await;
    let generated = response.header("x-request-id").unwrap();
    assert!(!generated.is_empty());

    let response = AxumTestRequest::get("/health")
        .header("x-request-id", "abc-123")
        .send(app)
        .await;
    assert_eq!(response.header("x-request-id").as_deref(), Some("abc-123"));
}

#[tokio::test]
async fn test_error_envelope_for_unknown_and_malformed_input() {
    let (app, _) = create_test_router().await;

    let error = AxumTestRequest::get("/api/templates/999")
        .send(app.clone())
        .await
        .error(StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "RESOURCE_NOT_FOUND");

    let error = AxumTestRequest::get("/api/sessions/not-a-number")
        .send(app.clone())
        .await
        .error(StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_INPUT");

    let error = AxumTestRequest::post("/api/sports")
        .raw_json("{\"name\": ")
        .send(app.clone())
        .await
        .error(StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_INPUT");

    let error = AxumTestRequest::post("/api/sports")
        .json(&json!({"name": "  "}))
        .send(app.clone())
        .await
        .error(StatusCode::BAD_REQUEST);
    assert!(error["details"]["fields"].is_array());

    let error = AxumTestRequest::get("/api/templates/1/fields?scope=everyone")
        .send(app)
        .await
        .error(StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_template_editing_over_http() {
    let (app, _) = create_test_router().await;

    let sport = AxumTestRequest::post("/api/sports")
        .json(&json!({"name": "Athletics"}))
        .send(app.clone())
        .await;
    assert_eq!(sport.status(), 201);
    let sport = sport.data();

    let template = AxumTestRequest::post("/api/templates")
        .json(&json!({"name": "Sprints", "sportId": sport["id"]}))
        .send(app.clone())
        .await
        .data();
    let tid = template["id"].as_i64().unwrap();

    let field = AxumTestRequest::post(&format!("/api/templates/{tid}/fields"))
        .json(&json!({
            "label": "Best Time",
            "type": "number",
            "unit": "s",
            "config": {"min": 0, "max": 60}
        }))
        .send(app.clone())
        .await
        .data();
    assert_eq!(field["key"], "best_time");
    assert_eq!(field["type"], "number");
    assert_eq!(field["formScope"], "general");
    assert_eq!(field["config"]["max"], 60.0);

    let error = AxumTestRequest::put(&format!("/api/fields/{}", field["id"]))
        .json(&json!({"config": {"min": 100}}))
        .send(app.clone())
        .await
        .error(StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALUE_OUT_OF_RANGE");

    let wind = AxumTestRequest::post(&format!("/api/templates/{tid}/fields"))
        .json(&json!({"label": "Wind", "type": "choice", "config": {"options": [
            {"id": "head", "label": "Headwind"},
            {"id": "tail", "label": "Tailwind"}
        ]}}))
        .send(app.clone())
        .await
        .data();

    let ordered = AxumTestRequest::put(&format!("/api/templates/{tid}/fields/order"))
        .json(&json!({"fields": [
            {"id": field["id"], "sortOrder": 1},
            {"id": wind["id"], "sortOrder": 0}
        ]}))
        .send(app.clone())
        .await
        .data();
    assert_eq!(ordered.as_array().unwrap().len(), 2);

    let detail = AxumTestRequest::get(&format!("/api/templates/{tid}"))
        .send(app.clone())
        .await
        .data();
    let keys: Vec<_> = detail["generalFields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["key"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(keys, vec!["wind", "best_time"]);

    let response = AxumTestRequest::delete(&format!("/api/templates/{tid}"))
        .send(app.clone())
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body, json!({"success": true}));

    let listed = AxumTestRequest::get("/api/templates").send(app).await.data();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_capture_flow_over_http() {
    let (app, _) = create_test_router().await;

    let sport = AxumTestRequest::post("/api/sports")
        .json(&json!({"name": "Powerlifting"}))
        .send(app.clone())
        .await
        .data();
    let athlete = AxumTestRequest::post("/api/athletes")
        .json(&json!({"name": "Ana", "sportIds": [sport["id"]]}))
        .send(app.clone())
        .await
        .data();
    let aid = athlete["id"].as_i64().unwrap();
    let template = AxumTestRequest::post("/api/templates")
        .json(&json!({"name": "Strength", "sportId": sport["id"]}))
        .send(app.clone())
        .await
        .data();
    let tid = template["id"].as_i64().unwrap();
    AxumTestRequest::post(&format!("/api/templates/{tid}/fields"))
        .json(&json!({"label": "Squat Weight", "type": "number", "unit": "kg", "required": true}))
        .send(app.clone())
        .await
        .data();

    let session = AxumTestRequest::post("/api/sessions")
        .json(&json!({"templateId": tid, "subjectIds": [aid]}))
        .send(app.clone())
        .await
        .data();
    let sid = session["id"].as_i64().unwrap();
    assert_eq!(session["status"], "active");
    assert_eq!(session["missingRequired"]["general"], json!(["squat_weight"]));

    let error = AxumTestRequest::put(&format!("/api/sessions/{sid}/values"))
        .json(&json!({"generalValues": {}, "subjectValues": {"999": {"rpe": 7}}}))
        .send(app.clone())
        .await
        .error(StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_INPUT");

    let outcome = AxumTestRequest::post(&format!("/api/sessions/{sid}/finish"))
        .json(&json!({"generalValues": {"squat_weight": 140}, "durationSeconds": 3600}))
        .send(app.clone())
        .await
        .data();
    assert_eq!(outcome["session"]["status"], "completed");
    assert_eq!(outcome["session"]["durationSeconds"], 3600);
    assert_eq!(outcome["records"][0]["checks"][0]["isNewRecord"], true);

    let records = AxumTestRequest::get(&format!("/api/athletes/{aid}/records"))
        .send(app.clone())
        .await
        .data();
    assert_eq!(records[0]["title"], "Squat Weight - Strength");

    let listed = AxumTestRequest::get(&format!("/api/sessions?subject_id={aid}"))
        .send(app.clone())
        .await
        .data();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let goal = AxumTestRequest::post("/api/goals")
        .json(&json!({
            "subjectId": aid,
            "title": "Squat 180",
            "unit": "kg",
            "startValue": 140,
            "targetValue": 180
        }))
        .send(app.clone())
        .await
        .data();
    let gid = goal["id"].as_i64().unwrap();

    let progress = AxumTestRequest::post(&format!("/api/goals/{gid}/progress"))
        .json(&json!({"value": 150}))
        .send(app.clone())
        .await;
    assert_eq!(progress.status(), 201);

    let dashboard = AxumTestRequest::get(&format!("/api/athletes/{aid}/dashboard"))
        .send(app.clone())
        .await
        .data();
    assert_eq!(dashboard["goals"][0]["progressPercentage"], 25.0);
    assert_eq!(dashboard["records"].as_array().unwrap().len(), 1);

    let completed = AxumTestRequest::put(&format!("/api/goals/{gid}/status"))
        .json(&json!({"status": "completed"}))
        .send(app.clone())
        .await
        .data();
    assert_eq!(completed["status"], "completed");

    let error = AxumTestRequest::put(&format!("/api/goals/{gid}/status"))
        .json(&json!({"status": "paused"}))
        .send(app)
        .await
        .error(StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_INPUT");
}
