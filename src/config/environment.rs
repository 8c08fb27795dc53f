// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses environment variables into a typed ServerConfig with defaults and a startup summary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! Environment-based configuration management

use crate::constants::{goals, ports};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Default database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/trainbook.db";
/// Default bind address
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Default cap on participants per session
pub const DEFAULT_MAX_SESSION_PARTICIPANTS: usize = 100;

/// Strongly typed log level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational
    #[default]
    Info,
    /// Debugging
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL (`sqlite::memory:` supported)
    pub url: String,
}

impl DatabaseConfig {
    /// Whether the database lives in memory only
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Goal tracking settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoalConfig {
    /// Days before the deadline at which active goals are flagged
    pub near_deadline_days: i64,
}

/// Request and capture limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimitsConfig {
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Maximum participants accepted when creating a session
    pub max_session_participants: usize,
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// HTTP port
    pub http_port: u16,
    /// Log level
    pub log_level: LogLevel,
    /// Database settings
    pub database: DatabaseConfig,
    /// Goal settings
    pub goals: GoalConfig,
    /// Request limits
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            http_port: ports::DEFAULT_HTTP_PORT,
            log_level: LogLevel::default(),
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_owned(),
            },
            goals: GoalConfig {
                near_deadline_days: goals::DEFAULT_NEAR_DEADLINE_DAYS,
            },
            limits: LimitsConfig {
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                max_session_participants: DEFAULT_MAX_SESSION_PARTICIPANTS,
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let config = Self {
            host: env_var_or("HOST", DEFAULT_HOST),
            http_port: parse_env("HTTP_PORT", ports::DEFAULT_HTTP_PORT)?,
            log_level: LogLevel::from_str_or_default(&env_var_or("RUST_LOG", "info")),
            database: DatabaseConfig {
                url: env_var_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            },
            goals: GoalConfig {
                near_deadline_days: parse_env(
                    "GOAL_NEAR_DEADLINE_DAYS",
                    goals::DEFAULT_NEAR_DEADLINE_DAYS,
                )?,
            },
            limits: LimitsConfig {
                request_timeout_secs: parse_env(
                    "REQUEST_TIMEOUT_SECS",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                )?,
                max_session_participants: parse_env(
                    "MAX_SESSION_PARTICIPANTS",
                    DEFAULT_MAX_SESSION_PARTICIPANTS,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns an error for zero limits or a negative deadline window
    pub fn validate(&self) -> Result<()> {
        if self.goals.near_deadline_days < 0 {
            anyhow::bail!("GOAL_NEAR_DEADLINE_DAYS must not be negative");
        }
        if self.limits.max_session_participants == 0 {
            anyhow::bail!("MAX_SESSION_PARTICIPANTS must be at least 1");
        }
        if self.limits.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }

    /// One-block configuration summary for startup logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Trainbook Server Configuration:\n\
             - Listen: {}:{}\n\
             - Log Level: {}\n\
             - Database: {}\n\
             - Goal near-deadline window: {} days\n\
             - Request timeout: {}s\n\
             - Max session participants: {}",
            self.host,
            self.http_port,
            self.log_level,
            if self.database.is_in_memory() {
                "SQLite (in-memory)"
            } else {
                "SQLite"
            },
            self.goals.near_deadline_days,
            self.limits.request_timeout_secs,
            self.limits.max_session_participants,
        )
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: '{raw}'")),
        Err(_) => Ok(default),
    }
}
