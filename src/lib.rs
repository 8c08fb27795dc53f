// ABOUTME: Main library entry point for the trainbook coaching server
// ABOUTME: Wires persistence, domain services and the REST surface for template-driven session capture
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

#![deny(unsafe_code)]

//! # Trainbook Server
//!
//! Coaches define reusable training templates, run sessions against them and
//! capture structured results per session and per participant. Two derived
//! outputs are computed from captured data: personal-record detection and goal
//! progress.
//!
//! ## Architecture
//!
//! - **database**: `SQLite` persistence, one manager per aggregate
//! - **services**: Business rules (key derivation, snapshots, finish flow, goal transitions)
//! - **routes**: `axum` handlers with the `{success, data}` envelope
//! - **config**/**logging**: Environment-driven configuration and `tracing` setup
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use trainbook_server::config::environment::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("{}", config.summary());
//!     Ok(())
//! }
//! ```

/// Environment-driven server configuration
pub mod config;

/// `SQLite` persistence managers and schema
pub mod database;

/// Unified error types re-exported from the core crate
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Shared server resources handed to route handlers
pub mod resources;

/// `HTTP` route handlers
pub mod routes;

/// Domain services
pub mod services;

pub use trainbook_core::{constants, models};
