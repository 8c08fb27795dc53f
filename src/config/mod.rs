// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Environment-only configuration for network, database, goal and capture limits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! Configuration module for the trainbook server
//!
//! All settings come from environment variables; the binary may override the
//! port and database URL from the command line.

/// Environment and server configuration
pub mod environment;
