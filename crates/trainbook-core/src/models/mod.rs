// ABOUTME: Core data models for the trainbook capture engine
// ABOUTME: Re-exports field schema, template, session, goal, record and directory types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! # Data Models
//!
//! - `FieldDefinition`/`FieldKind`: type-tagged template schema entries
//! - `Template`/`TemplateSnapshot`: reusable definitions and their frozen copies
//! - `Session`: captured general and per-subject values
//! - `Goal`/`GoalHistoryEntry`: tracked objectives with append-only progress
//! - `PersonalRecord`/`RecordCheck`: best-ever facts and detection outcomes

mod directory;
mod field;
mod goal;
mod record;
mod session;
mod template;

// Directory
pub use directory::{Athlete, Sport};

// Field schema
pub use field::{
    derive_key, merge_config, unique_key, ChoiceConfig, ChoiceOption, FieldDefinition, FieldKind,
    FieldScope, FieldType, LifecycleStatus, NumberConfig,
};

// Templates and tree resolution
pub use template::{
    build_tree, child_fields, is_filled, missing_required, root_fields, visible_fields, FieldNode,
    Template, TemplateSnapshot,
};

// Sessions
pub use session::{
    FieldValues, FinishTiming, ResolvedTiming, Session, SessionStatus, Subject, SubjectValues,
};

// Goals
pub use goal::{Goal, GoalHistoryEntry, GoalStatus};

// Records
pub use record::{record_title, NewPersonalRecord, PersonalRecord, RecordCheck};
