// ABOUTME: Constants organized by domain for the trainbook platform
// ABOUTME: Field key rules, goal history notes, record titles, defaults and service names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! Constants grouped by domain

/// Field schema constants
pub mod fields {
    /// Separator used when deriving keys and suffixing duplicates
    pub const KEY_SEPARATOR: char = '_';
    /// Key used when a label contains no alphanumeric characters
    pub const DEFAULT_FIELD_KEY: &str = "field";
    /// Maximum label length accepted on create/update
    pub const MAX_LABEL_LENGTH: usize = 200;
}

/// Goal tracking constants
pub mod goals {
    /// Note on the history entry written at goal creation
    pub const INITIAL_MARK_NOTE: &str = "initial mark";
    /// Note on the terminal history entry written at completion
    pub const COMPLETION_NOTE: &str = "goal completed";
    /// Days before the target date at which a goal is flagged near-deadline
    pub const DEFAULT_NEAR_DEADLINE_DAYS: i64 = 7;
}

/// Personal record constants
pub mod records {
    /// Separator between field label and template name in record titles
    pub const TITLE_SEPARATOR: &str = " - ";
}

/// Network defaults
pub mod ports {
    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8081;
}

/// Service identity
pub mod service_names {
    /// Service name used in structured logs
    pub const TRAINBOOK_SERVER: &str = "trainbook-server";
}
