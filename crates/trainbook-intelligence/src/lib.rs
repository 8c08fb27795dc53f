// ABOUTME: Derived-metric algorithms consuming captured session values and goal history
// ABOUTME: Record detection (best-ever per subject and metric) and goal progress computation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

#![deny(unsafe_code)]

//! # Trainbook Intelligence
//!
//! Stateless algorithms. Callers load history from storage and pass it in,
//! which keeps every computation deterministic and testable.

/// Personal record detection over historical general values
pub mod records;

/// Goal progress percentage, current value and deadline flags
pub mod goal_progress;

pub use goal_progress::{current_value, deadline_status, progress_percentage, DeadlineStatus};
pub use records::{check_records, numeric_value};
