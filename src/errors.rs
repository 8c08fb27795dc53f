// ABOUTME: Re-exports the unified error types from trainbook-core
// ABOUTME: Keeps `crate::errors::AppError` paths stable across the server crate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

pub use trainbook_core::errors::{
    AppError, AppResult, ErrorCode, ErrorResponse, ErrorResponseDetails, FieldError,
};
