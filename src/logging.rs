// ABOUTME: Structured logging setup for the trainbook server
// ABOUTME: Builds the tracing subscriber from the configured level, LOG_FORMAT and noise filters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! Structured logging configuration
//!
//! `RUST_LOG` (through [`ServerConfig::log_level`]) sets the base level for the
//! server crates. Third-party crates are clamped so per-request SQL and
//! connection chatter stay out of normal logs.

use std::env;
use std::io;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::environment::{LogLevel, ServerConfig};
use crate::constants::service_names::TRAINBOOK_SERVER;

/// Directives applied on top of the base level
const NOISE_DIRECTIVES: &[&str] = &[
    "hyper=warn",
    "sqlx=warn",
    "sqlx::query=warn",
    "tower_http=info",
];

/// Crates whose events follow the configured level
const OWN_CRATES: &[&str] = &["trainbook_server", "trainbook_core", "trainbook_intelligence"];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Multi-field human readable output
    #[default]
    Pretty,
    /// Single-line output without targets
    Compact,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value, defaulting to pretty
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base level for the server crates
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
    /// Emit span open/close events (request spans from `TraceLayer`)
    pub include_spans: bool,
    /// Include source file and line
    pub include_location: bool,
}

impl LoggingConfig {
    /// Settings for `config`, with `LOG_FORMAT`, `LOG_INCLUDE_SPANS` and
    /// `LOG_INCLUDE_LOCATION` read from the environment
    #[must_use]
    pub fn for_server(config: &ServerConfig) -> Self {
        Self {
            level: config.log_level,
            format: env::var("LOG_FORMAT")
                .map(|v| LogFormat::from_str_or_default(&v))
                .unwrap_or_default(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            include_location: env::var("LOG_INCLUDE_LOCATION").is_ok(),
        }
    }

    /// Filter with the base level, noise clamps and the server crates pinned
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        let level = self.level.to_string();
        let mut filter = EnvFilter::new(&level);
        let own = OWN_CRATES.iter().map(|krate| format!("{krate}={level}"));
        for directive in NOISE_DIRECTIVES.iter().map(|d| (*d).to_owned()).chain(own) {
            if let Ok(parsed) = directive.parse() {
                filter = filter.add_directive(parsed);
            }
        }
        filter
    }

    fn output_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let spans = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let base = fmt::layer()
            .with_writer(io::stdout)
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_span_events(spans);

        match self.format {
            LogFormat::Json => base.json().boxed(),
            LogFormat::Pretty => base.with_target(true).boxed(),
            LogFormat::Compact => base.compact().with_target(false).boxed(),
        }
    }

    /// Install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        tracing_subscriber::registry()
            .with(self.output_layer())
            .with(self.env_filter())
            .try_init()?;

        info!(
            service.name = TRAINBOOK_SERVER,
            service.version = env!("CARGO_PKG_VERSION"),
            log.level = %self.level,
            log.format = ?self.format,
            log.spans = self.include_spans,
            "Logging configured"
        );
        Ok(())
    }
}

/// Install logging for a loaded server configuration
///
/// # Errors
///
/// Returns an error if logging initialization fails
pub fn init(config: &ServerConfig) -> Result<()> {
    LoggingConfig::for_server(config).init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str_or_default("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_or_default(" compact "), LogFormat::Compact);
        assert_eq!(LogFormat::from_str_or_default("fancy"), LogFormat::Pretty);
    }

    #[test]
    fn test_env_filter_pins_server_crates() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
            format: LogFormat::Json,
            include_spans: false,
            include_location: false,
        };
        let rendered = config.env_filter().to_string();
        assert!(rendered.contains("sqlx=warn"));
        assert!(rendered.contains("trainbook_server=debug"));
        assert!(rendered.contains("trainbook_intelligence=debug"));
    }
}
