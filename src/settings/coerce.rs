//! Settings Coercion
//!
//! Massages a branch protection read response into the shape the update
//! endpoint accepts, so current and target settings compare leaf by leaf.

use crate::settings::SettingsNode;

/// Fields the read API wraps as `{ "enabled": bool, ... }`
pub const BOOLEAN_WRAPPER_FIELDS: [&str; 4] = [
    "enforce_admins",
    "required_linear_history",
    "allow_force_pushes",
    "allow_deletions",
];

/// Normalize a settings tree in place.
///
/// - keys containing `url` are dropped (HATEOAS links)
/// - boolean wrapper fields collapse to their `enabled` value
/// - every other object or list is coerced recursively
///
/// Idempotent: coercing an already coerced tree changes nothing.
pub fn coerce(node: &mut SettingsNode) {
    match node {
        SettingsNode::Object(map) => {
            map.retain(|key, _| !key.contains("url"));
            for (key, value) in map.iter_mut() {
                if BOOLEAN_WRAPPER_FIELDS.contains(&key.as_str()) {
                    while let Some(enabled) = value.get("enabled").cloned() {
                        *value = enabled;
                    }
                }
                coerce(value);
            }
        }
        SettingsNode::List(items) => items.iter_mut().for_each(coerce),
        _ => {}
    }
}

/// Coerced copy of a settings tree
pub fn coerced(mut node: SettingsNode) -> SettingsNode {
    coerce(&mut node);
    node
}
