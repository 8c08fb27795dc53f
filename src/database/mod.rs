// ABOUTME: SQLite database handle, schema migrations and per-aggregate manager accessors
// ABOUTME: Shared timestamp/date codecs and JSON column helpers used by every manager
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! # Database Management
//!
//! One `SQLite` pool shared by a manager per aggregate. Timestamps are stored as
//! RFC 3339 text with microsecond precision so lexical and chronological order
//! agree; calendar dates are stored as `YYYY-MM-DD`.

/// Sport and athlete directory
pub mod directory;
/// Template field definitions
pub mod fields;
/// Goals and goal history
pub mod goals;
/// Personal records
pub mod records;
/// Training sessions and participants
pub mod sessions;
/// Templates
pub mod templates;
/// RAII transaction guard and retry helper
pub mod transactions;

use std::fs;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};

pub use directory::{AthletesManager, SportsManager};
pub use fields::FieldsManager;
pub use goals::GoalsManager;
pub use records::RecordsManager;
pub use sessions::SessionsManager;
pub use templates::TemplatesManager;
pub use transactions::{retry_transaction, SqliteTransactionGuard, TransactionGuard};

/// Attempts for transactions that may hit `SQLITE_BUSY`
pub const TRANSACTION_RETRIES: u32 = 3;

/// Database handle shared by every manager
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and run migrations
    ///
    /// In-memory databases use a single connection so every statement sees the
    /// same database.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the file cannot be created, or
    /// migrations fail
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = database_url.contains(":memory:");
        if !in_memory {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }

        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new().connect_with(options).await
        }
        .context("Failed to connect to SQLite database")?;

        let db = Self { pool };
        db.migrate().await?;
        info!(in_memory, "Database initialized");
        Ok(db)
    }

    /// Underlying pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Sport manager
    #[must_use]
    pub fn sports(&self) -> SportsManager {
        SportsManager::new(self.pool.clone())
    }

    /// Athlete manager
    #[must_use]
    pub fn athletes(&self) -> AthletesManager {
        AthletesManager::new(self.pool.clone())
    }

    /// Template manager
    #[must_use]
    pub fn templates(&self) -> TemplatesManager {
        TemplatesManager::new(self.pool.clone())
    }

    /// Field definition manager
    #[must_use]
    pub fn fields(&self) -> FieldsManager {
        FieldsManager::new(self.pool.clone())
    }

    /// Session manager
    #[must_use]
    pub fn sessions(&self) -> SessionsManager {
        SessionsManager::new(self.pool.clone())
    }

    /// Goal manager
    #[must_use]
    pub fn goals(&self) -> GoalsManager {
        GoalsManager::new(self.pool.clone())
    }

    /// Personal record manager
    #[must_use]
    pub fn records(&self) -> RecordsManager {
        RecordsManager::new(self.pool.clone())
    }

    /// Begin a transaction that rolls back unless committed
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be acquired
    pub async fn begin(&self) -> AppResult<SqliteTransactionGuard<'static>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;
        Ok(SqliteTransactionGuard::new(tx))
    }

    /// Round-trip a trivial query, used by the readiness probe
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database ping failed: {e}")))?;
        Ok(())
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any schema statement fails
    pub async fn migrate(&self) -> Result<()> {
        self.migrate_directory().await?;
        self.migrate_templates().await?;
        self.migrate_sessions().await?;
        self.migrate_goals().await?;
        self.migrate_records().await?;
        debug!("Schema migrations applied");
        Ok(())
    }

    async fn execute_all(&self, statements: &[&str]) -> Result<()> {
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Migration statement failed: {statement}"))?;
        }
        Ok(())
    }

    async fn migrate_directory(&self) -> Result<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS sports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS athletes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS athlete_sports (
                athlete_id INTEGER NOT NULL REFERENCES athletes(id) ON DELETE CASCADE,
                sport_id INTEGER NOT NULL REFERENCES sports(id) ON DELETE CASCADE,
                PRIMARY KEY (athlete_id, sport_id)
            )
            ",
        ])
        .await
    }

    async fn migrate_templates(&self) -> Result<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                sport_id INTEGER NOT NULL REFERENCES sports(id),
                status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'deleted')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS template_fields (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                template_id INTEGER NOT NULL REFERENCES templates(id),
                key TEXT NOT NULL,
                label TEXT NOT NULL,
                field_type TEXT NOT NULL,
                unit TEXT,
                sort_order INTEGER NOT NULL,
                required INTEGER NOT NULL DEFAULT 0,
                form_scope TEXT NOT NULL CHECK (form_scope IN ('general', 'subject')),
                parent_id INTEGER REFERENCES template_fields(id),
                config TEXT NOT NULL DEFAULT '{}',
                status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'deleted')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
            // Keys of deleted fields may be reused
            r"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_template_fields_active_key
                ON template_fields(template_id, key) WHERE status = 'active'
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_template_fields_parent
                ON template_fields(template_id, parent_id, form_scope)
            ",
        ])
        .await
    }

    async fn migrate_sessions(&self) -> Result<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                template_id INTEGER NOT NULL REFERENCES templates(id),
                snapshot TEXT NOT NULL,
                general_values TEXT NOT NULL DEFAULT '{}',
                subject_values TEXT NOT NULL DEFAULT '{}',
                session_date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration_seconds INTEGER,
                notes TEXT,
                created_at TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS session_participants (
                session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                athlete_id INTEGER NOT NULL REFERENCES athletes(id),
                position INTEGER NOT NULL,
                PRIMARY KEY (session_id, athlete_id)
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_session_participants_athlete
                ON session_participants(athlete_id)
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_sessions_template
                ON sessions(template_id, end_time)
            ",
        ])
        .await
    }

    async fn migrate_goals(&self) -> Result<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS goals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                athlete_id INTEGER NOT NULL REFERENCES athletes(id),
                title TEXT NOT NULL,
                metric_label TEXT,
                unit TEXT NOT NULL,
                start_value REAL NOT NULL,
                target_value REAL NOT NULL,
                start_date TEXT NOT NULL,
                target_date TEXT,
                status TEXT NOT NULL DEFAULT 'active'
                    CHECK (status IN ('active', 'completed', 'expired')),
                strategy_notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS goal_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                goal_id INTEGER NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
                value REAL NOT NULL,
                notes TEXT,
                recorded_at TEXT NOT NULL
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_goal_history_goal
                ON goal_history(goal_id, recorded_at)
            ",
        ])
        .await
    }

    async fn migrate_records(&self) -> Result<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS personal_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                athlete_id INTEGER NOT NULL REFERENCES athletes(id),
                title TEXT NOT NULL,
                value REAL NOT NULL,
                unit TEXT,
                achieved_at TEXT NOT NULL,
                session_id INTEGER REFERENCES sessions(id) ON DELETE SET NULL
            )
            ",
            r"DROP INDEX IF EXISTS idx_personal_records_session_title",
            // Re-finishing with the same value must not duplicate a record;
            // a corrected best gets its own row
            r"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_personal_records_session_value
                ON personal_records(athlete_id, session_id, title, value)
                WHERE session_id IS NOT NULL
            ",
        ])
        .await
    }
}

/// Encode a timestamp for storage
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp
///
/// # Errors
///
/// Returns an error if the stored text is not RFC 3339
pub fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

/// Decode a stored calendar date
///
/// # Errors
///
/// Returns an error if the stored text is not `YYYY-MM-DD`
pub fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")?)
}

/// Encode a calendar date for storage
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Deserialize a field that distinguishes "absent" from explicit `null`
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// absent yields `None`, `null` yields `Some(None)`.
///
/// # Errors
///
/// Propagates the inner deserializer error
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2025, 1, 9, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        assert!(format_timestamp(&earlier) < format_timestamp(&later));
        assert_eq!(parse_timestamp(&format_timestamp(&later)).unwrap(), later);
    }

    #[test]
    fn test_double_option_distinguishes_null() {
        #[derive(Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "double_option")]
            unit: Option<Option<String>>,
        }

        let absent: Patch = serde_json::from_str("{}").unwrap();
        let cleared: Patch = serde_json::from_str(r#"{"unit": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"unit": "kg"}"#).unwrap();
        assert_eq!(absent.unit, None);
        assert_eq!(cleared.unit, Some(None));
        assert_eq!(set.unit, Some(Some("kg".into())));
    }
}
