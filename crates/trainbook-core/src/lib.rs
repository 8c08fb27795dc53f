// ABOUTME: Core types and constants for the trainbook training capture platform
// ABOUTME: Foundation crate with error handling, schema types and domain models
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

#![deny(unsafe_code)]

//! # Trainbook Core
//!
//! Foundation crate providing shared types for the template/session capture
//! engine. It performs no I/O.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode` and field-level details
//! - **constants**: Application-wide constants organized by domain
//! - **models**: Field schema, templates, sessions, goals and personal records

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models
pub mod models;
