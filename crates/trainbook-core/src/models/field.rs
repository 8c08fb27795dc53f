// ABOUTME: Field definition model for template schemas with type-tagged configuration
// ABOUTME: FieldKind tagged union, scope and lifecycle enums, key derivation and config merge
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::constants::fields::{DEFAULT_FIELD_KEY, KEY_SEPARATOR};
use crate::errors::{AppError, AppResult};

/// Discriminant of a [`FieldKind`], used on the wire and in storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    /// Free text
    Text,
    /// Numeric value with optional bounds
    Number,
    /// True/false
    Boolean,
    /// Single selection among options
    Choice,
    /// Multiple selections among options
    MultipleChoice,
    /// Pure container without a value
    Group,
    /// Boolean that gates its children
    ExpandableBoolean,
}

impl FieldType {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Choice => "choice",
            Self::MultipleChoice => "multiple-choice",
            Self::Group => "group",
            Self::ExpandableBoolean => "expandable-boolean",
        }
    }

    /// Parse from database string representation
    ///
    /// # Errors
    ///
    /// Returns an error for unknown type names
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "choice" => Ok(Self::Choice),
            "multiple-choice" => Ok(Self::MultipleChoice),
            "group" => Ok(Self::Group),
            "expandable-boolean" => Ok(Self::ExpandableBoolean),
            other => Err(AppError::invalid_field(
                "type",
                format!("unknown field type '{other}'"),
            )),
        }
    }

    /// Whether fields of this type may own children
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Group | Self::ExpandableBoolean)
    }
}

/// Bounds for numeric fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberConfig {
    /// Inclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// One selectable option of a choice field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Stable option identifier stored as the captured value
    pub id: String,
    /// Display label
    pub label: String,
}

/// Options for choice and multiple-choice fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceConfig {
    /// Selectable options in display order
    #[serde(default)]
    pub options: Vec<ChoiceOption>,
}

/// Field type together with the configuration that type allows
///
/// Options on a text field or bounds on a boolean cannot be expressed.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Free text
    Text,
    /// Numeric value
    Number(NumberConfig),
    /// True/false
    Boolean,
    /// Single selection
    Choice(ChoiceConfig),
    /// Multiple selections
    MultipleChoice(ChoiceConfig),
    /// Container
    Group,
    /// Gating boolean with children
    ExpandableBoolean,
}

impl FieldKind {
    /// Discriminant of this kind
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Text => FieldType::Text,
            Self::Number(_) => FieldType::Number,
            Self::Boolean => FieldType::Boolean,
            Self::Choice(_) => FieldType::Choice,
            Self::MultipleChoice(_) => FieldType::MultipleChoice,
            Self::Group => FieldType::Group,
            Self::ExpandableBoolean => FieldType::ExpandableBoolean,
        }
    }

    /// Build a kind from its discriminant and a raw JSON config object
    ///
    /// Keys that the type does not understand are dropped.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the config is not an object, has the wrong
    /// shape for the type, or violates the type's own rules (`min > max`,
    /// duplicate option ids).
    pub fn from_parts(field_type: FieldType, config: &Value) -> AppResult<Self> {
        let config = match config {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => config.clone(),
            _ => {
                return Err(AppError::invalid_field(
                    "config",
                    "must be a JSON object",
                ))
            }
        };

        let kind = match field_type {
            FieldType::Text => Self::Text,
            FieldType::Boolean => Self::Boolean,
            FieldType::Group => Self::Group,
            FieldType::ExpandableBoolean => Self::ExpandableBoolean,
            FieldType::Number => Self::Number(
                serde_json::from_value(config)
                    .map_err(|e| AppError::invalid_field("config", e.to_string()))?,
            ),
            FieldType::Choice => Self::Choice(
                serde_json::from_value(config)
                    .map_err(|e| AppError::invalid_field("config", e.to_string()))?,
            ),
            FieldType::MultipleChoice => Self::MultipleChoice(
                serde_json::from_value(config)
                    .map_err(|e| AppError::invalid_field("config", e.to_string()))?,
            ),
        };
        kind.validate()?;
        Ok(kind)
    }

    /// Configuration as a JSON object (`{}` for kinds without configuration)
    #[must_use]
    pub fn config_value(&self) -> Value {
        let value = match self {
            Self::Number(config) => serde_json::to_value(config),
            Self::Choice(config) | Self::MultipleChoice(config) => serde_json::to_value(config),
            Self::Text | Self::Boolean | Self::Group | Self::ExpandableBoolean => {
                return Value::Object(Map::new())
            }
        };
        value.unwrap_or_else(|_| Value::Object(Map::new()))
    }

    fn validate(&self) -> AppResult<()> {
        match self {
            Self::Number(NumberConfig {
                min: Some(min),
                max: Some(max),
            }) if min > max => Err(AppError::out_of_range(
                "config.min",
                format!("min ({min}) must not exceed max ({max})"),
            )),
            Self::Choice(config) | Self::MultipleChoice(config) => {
                let mut seen = HashSet::new();
                for option in &config.options {
                    if !seen.insert(option.id.as_str()) {
                        return Err(AppError::invalid_field(
                            "config.options",
                            format!("duplicate option id '{}'", option.id),
                        ));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Whether a field is captured once per session or once per participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldScope {
    /// Shared value for the whole session
    #[default]
    General,
    /// Value recorded per participant
    Subject,
}

impl FieldScope {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Subject => "subject",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "subject" => Self::Subject,
            _ => Self::General,
        }
    }
}

/// Soft-deletion lifecycle for templates and fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// Visible and editable
    #[default]
    Active,
    /// Soft-deleted, retained for history
    Deleted,
}

impl LifecycleStatus {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "deleted" => Self::Deleted,
            _ => Self::Active,
        }
    }
}

/// One entry of a template schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "FieldDefinitionRepr", try_from = "FieldDefinitionRepr")]
pub struct FieldDefinition {
    /// Unique identifier
    pub id: i64,
    /// Owning template
    pub template_id: i64,
    /// Machine key, unique among the template's active fields
    pub key: String,
    /// Display label
    pub label: String,
    /// Type and type-specific configuration
    pub kind: FieldKind,
    /// Display unit
    pub unit: Option<String>,
    /// Position among siblings
    pub sort_order: i64,
    /// Whether a value is expected before the session is considered complete
    pub required: bool,
    /// Capture scope
    pub scope: FieldScope,
    /// Parent composite field, `None` for root fields
    pub parent_id: Option<i64>,
    /// Soft-deletion status
    pub status: LifecycleStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl FieldDefinition {
    /// Discriminant of this field's kind
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    /// Whether this field may own children
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        self.kind.field_type().is_composite()
    }

    /// Whether this field is not soft-deleted
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == LifecycleStatus::Active
    }
}

/// Flat wire/storage shape: `{ "type": "number", "config": { "min": 0 } }`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldDefinitionRepr {
    id: i64,
    template_id: i64,
    key: String,
    label: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    unit: Option<String>,
    sort_order: i64,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    form_scope: FieldScope,
    #[serde(default)]
    parent_id: Option<i64>,
    #[serde(default)]
    config: Value,
    #[serde(default)]
    status: LifecycleStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FieldDefinition> for FieldDefinitionRepr {
    fn from(field: FieldDefinition) -> Self {
        Self {
            id: field.id,
            template_id: field.template_id,
            key: field.key,
            label: field.label,
            field_type: field.kind.field_type(),
            unit: field.unit,
            sort_order: field.sort_order,
            required: field.required,
            form_scope: field.scope,
            parent_id: field.parent_id,
            config: field.kind.config_value(),
            status: field.status,
            created_at: field.created_at,
            updated_at: field.updated_at,
        }
    }
}

impl TryFrom<FieldDefinitionRepr> for FieldDefinition {
    type Error = AppError;

    fn try_from(repr: FieldDefinitionRepr) -> AppResult<Self> {
        Ok(Self {
            id: repr.id,
            template_id: repr.template_id,
            key: repr.key,
            label: repr.label,
            kind: FieldKind::from_parts(repr.field_type, &repr.config)?,
            unit: repr.unit,
            sort_order: repr.sort_order,
            required: repr.required,
            scope: repr.form_scope,
            parent_id: repr.parent_id,
            status: repr.status,
            created_at: repr.created_at,
            updated_at: repr.updated_at,
        })
    }
}

/// Derive a machine key from a display label
///
/// Lower-cases, strips accents and collapses every run of non-alphanumeric
/// characters into a single `_`. Leading and trailing separators are dropped.
#[must_use]
pub fn derive_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    let mut pending_separator = false;

    for c in label.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if pending_separator && !key.is_empty() {
                key.push(KEY_SEPARATOR);
            }
            pending_separator = false;
            key.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    if key.is_empty() {
        DEFAULT_FIELD_KEY.to_owned()
    } else {
        key
    }
}

/// Make `base` unique against `taken` by appending `_1`, `_2`, ...
#[must_use]
pub fn unique_key(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_owned();
    }
    (1_u64..)
        .map(|n| format!("{base}{KEY_SEPARATOR}{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_owned())
}

/// Shallow-merge a config patch over the previous config
///
/// Top-level keys present in `patch` replace the previous ones, other keys
/// survive. A `null` patch value removes the key.
///
/// # Errors
///
/// Returns a validation error when the patch is not a JSON object
pub fn merge_config(previous: &Value, patch: &Value) -> AppResult<Value> {
    let Value::Object(patch) = patch else {
        return Err(AppError::invalid_field("config", "must be a JSON object"));
    };
    let mut merged = match previous {
        Value::Object(previous) => previous.clone(),
        _ => Map::new(),
    };
    for (key, value) in patch {
        if value.is_null() {
            merged.remove(key);
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::Object(merged))
}
