// ABOUTME: Tests for environment-driven server configuration
// ABOUTME: Defaults, overrides, parse failures and cross-field validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

#![allow(missing_docs, clippy::unwrap_used)]

use serial_test::serial;
use std::env;
use trainbook_server::config::environment::{LogLevel, ServerConfig, DEFAULT_DATABASE_URL};

const VARS: &[&str] = &[
    "HOST",
    "HTTP_PORT",
    "RUST_LOG",
    "DATABASE_URL",
    "GOAL_NEAR_DEADLINE_DAYS",
    "REQUEST_TIMEOUT_SECS",
    "MAX_SESSION_PARTICIPANTS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();
    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.http_port, 8081);
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
    assert_eq!(config.goals.near_deadline_days, 7);
    assert_eq!(config.limits.max_session_participants, 100);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
#[serial]
fn test_environment_overrides() {
    clear_env();
    env::set_var("HTTP_PORT", "9000");
    env::set_var("DATABASE_URL", "sqlite::memory:");
    env::set_var("GOAL_NEAR_DEADLINE_DAYS", "14");
    env::set_var("RUST_LOG", "DEBUG");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.http_port, 9000);
    assert!(config.database.is_in_memory());
    assert_eq!(config.goals.near_deadline_days, 14);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.summary().contains("SQLite (in-memory)"));
}

#[test]
#[serial]
fn test_unparseable_value_is_an_error() {
    clear_env();
    env::set_var("HTTP_PORT", "not-a-port");
    let result = ServerConfig::from_env();
    clear_env();

    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("HTTP_PORT"));
}

#[test]
#[serial]
fn test_zero_participant_limit_is_rejected() {
    clear_env();
    env::set_var("MAX_SESSION_PARTICIPANTS", "0");
    let result = ServerConfig::from_env();
    clear_env();
    assert!(result.is_err());
}

#[test]
fn test_validate_rejects_negative_deadline_window() {
    let mut config = ServerConfig::default();
    assert!(config.validate().is_ok());
    config.goals.near_deadline_days = -1;
    assert!(config.validate().is_err());
}
