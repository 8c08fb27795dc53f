// ABOUTME: Template and snapshot models plus field-tree resolution helpers
// ABOUTME: Builds nested trees from flat parent-referencing fields and applies expandable gating
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Trainbook Contributors

//! Templates and their field trees
//!
//! Fields are stored flat with a nullable `parent_id`. Children are always
//! resolved at read time by filtering on `parent_id`, ordered by
//! `(sort_order, id)`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::field::{FieldDefinition, FieldScope, FieldType, LifecycleStatus};
use super::session::FieldValues;

/// A reusable, sport-scoped definition of what a session collects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Sport this template belongs to
    pub sport_id: i64,
    /// Soft-deletion status
    pub status: LifecycleStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Frozen copy of a template taken when a session is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSnapshot {
    /// Template the snapshot was taken from
    pub template_id: i64,
    /// Template name at snapshot time
    pub template_name: String,
    /// Sport at snapshot time
    pub sport_id: i64,
    /// Sport name at snapshot time
    pub sport_name: String,
    /// Every active field of the template, all scopes
    pub fields: Vec<FieldDefinition>,
}

/// A field with its resolved children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    /// The field itself
    #[serde(flatten)]
    pub field: FieldDefinition,
    /// Children in display order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldNode>,
}

fn sorted<'a>(mut fields: Vec<&'a FieldDefinition>) -> Vec<&'a FieldDefinition> {
    fields.sort_by_key(|f| (f.sort_order, f.id));
    fields
}

/// Root fields of a scope, in display order
#[must_use]
pub fn root_fields(fields: &[FieldDefinition], scope: FieldScope) -> Vec<&FieldDefinition> {
    sorted(
        fields
            .iter()
            .filter(|f| f.parent_id.is_none() && f.scope == scope && f.is_active())
            .collect(),
    )
}

/// Direct children of `parent_id` within a scope, in display order
#[must_use]
pub fn child_fields(
    fields: &[FieldDefinition],
    parent_id: i64,
    scope: FieldScope,
) -> Vec<&FieldDefinition> {
    sorted(
        fields
            .iter()
            .filter(|f| f.parent_id == Some(parent_id) && f.scope == scope && f.is_active())
            .collect(),
    )
}

/// Nested tree of a scope
///
/// Fields whose parent is missing or soft-deleted are unreachable and do not appear.
#[must_use]
pub fn build_tree(fields: &[FieldDefinition], scope: FieldScope) -> Vec<FieldNode> {
    let mut visited = HashSet::new();
    root_fields(fields, scope)
        .into_iter()
        .filter_map(|root| build_node(fields, root, scope, &mut visited))
        .collect()
}

fn build_node(
    fields: &[FieldDefinition],
    field: &FieldDefinition,
    scope: FieldScope,
    visited: &mut HashSet<i64>,
) -> Option<FieldNode> {
    if !visited.insert(field.id) {
        return None;
    }
    let children = if field.is_composite() {
        child_fields(fields, field.id, scope)
            .into_iter()
            .filter_map(|child| build_node(fields, child, scope, visited))
            .collect()
    } else {
        Vec::new()
    };
    Some(FieldNode {
        field: field.clone(),
        children,
    })
}

/// Capturable fields of a scope given the values captured so far
///
/// Depth-first in display order. Groups contribute only their children.
/// Children of an expandable boolean are surfaced only while its value is
/// `true`; values captured under it are never removed, only hidden.
#[must_use]
pub fn visible_fields<'a>(
    fields: &'a [FieldDefinition],
    scope: FieldScope,
    values: &FieldValues,
) -> Vec<&'a FieldDefinition> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    for root in root_fields(fields, scope) {
        collect_visible(fields, root, scope, values, &mut visited, &mut out);
    }
    out
}

fn collect_visible<'a>(
    fields: &'a [FieldDefinition],
    field: &'a FieldDefinition,
    scope: FieldScope,
    values: &FieldValues,
    visited: &mut HashSet<i64>,
    out: &mut Vec<&'a FieldDefinition>,
) {
    if !visited.insert(field.id) {
        return;
    }
    let expand = match field.field_type() {
        FieldType::Group => true,
        FieldType::ExpandableBoolean => {
            out.push(field);
            values.get(&field.key).and_then(Value::as_bool) == Some(true)
        }
        _ => {
            out.push(field);
            false
        }
    };
    if expand {
        for child in child_fields(fields, field.id, scope) {
            collect_visible(fields, child, scope, values, visited, out);
        }
    }
}

/// Whether a captured value counts as filled
#[must_use]
pub fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Keys of required, currently visible fields that have no value
#[must_use]
pub fn missing_required(
    fields: &[FieldDefinition],
    scope: FieldScope,
    values: &FieldValues,
) -> Vec<String> {
    visible_fields(fields, scope, values)
        .into_iter()
        .filter(|f| f.required && !is_filled(values.get(&f.key)))
        .map(|f| f.key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::{FieldKind, NumberConfig};
    use serde_json::json;

    fn field(
        id: i64,
        key: &str,
        kind: FieldKind,
        scope: FieldScope,
        parent_id: Option<i64>,
        sort_order: i64,
    ) -> FieldDefinition {
        let now = Utc::now();
        FieldDefinition {
            id,
            template_id: 1,
            key: key.into(),
            label: key.into(),
            kind,
            unit: None,
            sort_order,
            required: true,
            scope,
            parent_id,
            status: LifecycleStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> Vec<FieldDefinition> {
        vec![
            field(1, "warmup", FieldKind::Group, FieldScope::General, None, 1),
            field(2, "injured", FieldKind::ExpandableBoolean, FieldScope::General, None, 0),
            field(3, "injury_notes", FieldKind::Text, FieldScope::General, Some(2), 0),
            field(
                4,
                "warmup_minutes",
                FieldKind::Number(NumberConfig::default()),
                FieldScope::General,
                Some(1),
                0,
            ),
            field(5, "rpe", FieldKind::Text, FieldScope::Subject, None, 0),
            field(6, "cooldown", FieldKind::Boolean, FieldScope::General, Some(1), 1),
        ]
    }

    #[test]
    fn test_build_tree_nests_and_orders() {
        let fields = sample();
        let tree = build_tree(&fields, FieldScope::General);

        let roots: Vec<_> = tree.iter().map(|n| n.field.key.as_str()).collect();
        assert_eq!(roots, vec!["injured", "warmup"]);
        let warmup_children: Vec<_> = tree[1].children.iter().map(|n| n.field.key.as_str()).collect();
        assert_eq!(warmup_children, vec!["warmup_minutes", "cooldown"]);
    }

    #[test]
    fn test_expandable_children_hidden_until_checked() {
        let fields = sample();
        let mut values = FieldValues::new();
        values.insert("injured".into(), json!(false));
        values.insert("injury_notes".into(), json!("left knee"));

        let keys: Vec<_> = visible_fields(&fields, FieldScope::General, &values)
            .iter()
            .map(|f| f.key.as_str())
            .collect();
        assert_eq!(keys, vec!["injured", "warmup_minutes", "cooldown"]);

        values.insert("injured".into(), json!(true));
        let keys: Vec<_> = visible_fields(&fields, FieldScope::General, &values)
            .iter()
            .map(|f| f.key.as_str())
            .collect();
        assert_eq!(keys, vec!["injured", "injury_notes", "warmup_minutes", "cooldown"]);
    }

    #[test]
    fn test_missing_required_ignores_gated_children() {
        let fields = sample();
        let mut values = FieldValues::new();
        values.insert("injured".into(), json!(false));
        values.insert("warmup_minutes".into(), json!(10));

        assert_eq!(
            missing_required(&fields, FieldScope::General, &values),
            vec!["cooldown".to_owned()]
        );

        values.insert("injured".into(), json!(true));
        values.insert("injury_notes".into(), json!("   "));
        assert_eq!(
            missing_required(&fields, FieldScope::General, &values),
            vec!["injury_notes".to_owned(), "cooldown".to_owned()]
        );
    }

    #[test]
    fn test_children_of_deleted_parent_are_unreachable() {
        let mut fields = sample();
        fields[0].status = LifecycleStatus::Deleted;

        let tree = build_tree(&fields, FieldScope::General);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].field.key, "injured");
    }
}
