//! Reconciliation Engine
//!
//! The core comparison engine that lines up target branch protection settings
//! against what is currently configured. Think "git diff" followed by a
//! three-way-free merge: the target is a sparse overlay on the current tree.
//!
//! The walk is driven by the shape of the *current* tree. A target leaf whose
//! path does not exist in the current tree is never visited, so it produces no
//! change and is not written back.

use crate::settings::{SettingsMap, SettingsNode};
use serde::{Deserialize, Serialize};

/// A single leaf that differs from the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Dot-separated path (e.g., "required_pull_request_reviews.dismiss_stale_reviews")
    pub key_path: String,
    /// Value currently configured
    pub current_value: SettingsNode,
    /// Value the policy requires
    pub target_value: SettingsNode,
}

impl ChangeRecord {
    /// Human-readable finding text
    pub fn message(&self) -> String {
        format!("protections.{} should be: {}", self.key_path, self.target_value)
    }
}

impl std::fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Result of reconciling target settings against current settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Current settings with every change applied and mandatory fields set;
    /// always a complete update payload
    pub merged: SettingsNode,
    /// Changes in walk order
    pub changes: Vec<ChangeRecord>,
}

impl Reconciliation {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.changes.iter().map(ChangeRecord::message).collect()
    }
}

/// Fields the update endpoint requires, with the value meaning "disabled"
fn mandatory_defaults() -> [(&'static str, SettingsNode); 4] {
    [
        ("enforce_admins", SettingsNode::Bool(false)),
        ("required_status_checks", SettingsNode::Null),
        ("required_pull_request_reviews", SettingsNode::Null),
        ("restrictions", SettingsNode::Null),
    ]
}

/// The engine that reconciles target settings with current settings
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Compute the changes needed to bring `current` in line with `target`,
    /// and the merged payload to write back
    pub fn reconcile(target: &SettingsNode, current: &SettingsNode) -> Reconciliation {
        let mut merged = current.clone();
        let mut changes = Vec::new();
        let mut path = Vec::new();

        Self::walk(&mut merged, &mut path, target, &mut changes);
        Self::apply_mandatory_defaults(&mut merged);

        Reconciliation { merged, changes }
    }

    /// Depth-first over `node`, keys in map order
    fn walk(
        node: &mut SettingsNode,
        path: &mut Vec<String>,
        target: &SettingsNode,
        changes: &mut Vec<ChangeRecord>,
    ) {
        if let SettingsNode::Object(map) = &mut *node {
            if !map.is_empty() {
                for (key, child) in map.iter_mut() {
                    path.push(key.clone());
                    Self::walk(child, path, target, changes);
                    path.pop();
                }
                return;
            }
        }

        // The root itself is not a leaf with a path
        if path.is_empty() {
            return;
        }

        if let Some(target_value) = target.lookup(path.as_slice()) {
            if *node != *target_value {
                changes.push(ChangeRecord {
                    key_path: path.join("."),
                    current_value: node.clone(),
                    target_value: target_value.clone(),
                });
                *node = target_value.clone();
            }
        }
    }

    fn apply_mandatory_defaults(merged: &mut SettingsNode) {
        if merged.as_object().is_none() {
            *merged = SettingsNode::Object(SettingsMap::new());
        }
        if let Some(map) = merged.as_object_mut() {
            for (field, default) in mandatory_defaults() {
                let unset = map.get(field).map_or(true, SettingsNode::is_falsy);
                if unset {
                    map.insert(field.to_string(), default);
                }
            }
        }
    }
}
