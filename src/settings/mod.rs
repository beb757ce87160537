//! Branch Protection Settings
//!
//! The heart of policy enforcement - comparing what a branch should look like
//! with what the platform says it looks like.
//! This module provides:
//! - A typed settings tree (nested objects over scalar leaves)
//! - Coercion of API-shaped responses into write-back shape
//! - Reconciliation (sparse target overlay → change list + merged payload)

pub mod coerce;
pub mod reconcile;

pub use reconcile::ReconciliationEngine;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Object node children, visited in key order
pub type SettingsMap = BTreeMap<String, SettingsNode>;

/// A node in a settings tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum SettingsNode {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<SettingsNode>),
    Object(SettingsMap),
}

impl Default for SettingsNode {
    fn default() -> Self {
        SettingsNode::Object(SettingsMap::new())
    }
}

impl SettingsNode {
    /// An empty object (e.g., a branch that was never protected)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_object(&self) -> Option<&SettingsMap> {
        match self {
            SettingsNode::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut SettingsMap> {
        match self {
            SettingsNode::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Anything that is not a non-empty object is compared as a whole
    pub fn is_leaf(&self) -> bool {
        !matches!(self, SettingsNode::Object(map) if !map.is_empty())
    }

    /// Unset in the write-back sense: null, false, 0, "" or NaN
    pub fn is_falsy(&self) -> bool {
        match self {
            SettingsNode::Null => true,
            SettingsNode::Bool(b) => !b,
            SettingsNode::Number(n) => n.as_f64().map_or(false, |f| f == 0.0 || f.is_nan()),
            SettingsNode::String(s) => s.is_empty(),
            SettingsNode::List(_) | SettingsNode::Object(_) => false,
        }
    }

    /// Follow a key path through nested objects
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&SettingsNode> {
        path.iter().try_fold(self, |node, key| node.as_object()?.get(key.as_ref()))
    }

    pub fn get(&self, key: &str) -> Option<&SettingsNode> {
        self.as_object()?.get(key)
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

impl PartialEq for SettingsNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SettingsNode::Null, SettingsNode::Null) => true,
            (SettingsNode::Bool(a), SettingsNode::Bool(b)) => a == b,
            (SettingsNode::Number(a), SettingsNode::Number(b)) => numbers_equal(a, b),
            (SettingsNode::String(a), SettingsNode::String(b)) => a == b,
            (SettingsNode::List(a), SettingsNode::List(b)) => a == b,
            (SettingsNode::Object(a), SettingsNode::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Value> for SettingsNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => SettingsNode::Null,
            Value::Bool(b) => SettingsNode::Bool(b),
            Value::Number(n) => SettingsNode::Number(n),
            Value::String(s) => SettingsNode::String(s),
            Value::Array(items) => SettingsNode::List(items.into_iter().map(SettingsNode::from).collect()),
            Value::Object(map) => SettingsNode::Object(
                map.into_iter().map(|(k, v)| (k, SettingsNode::from(v))).collect(),
            ),
        }
    }
}

impl From<SettingsNode> for Value {
    fn from(node: SettingsNode) -> Self {
        match node {
            SettingsNode::Null => Value::Null,
            SettingsNode::Bool(b) => Value::Bool(b),
            SettingsNode::Number(n) => Value::Number(n),
            SettingsNode::String(s) => Value::String(s),
            SettingsNode::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            SettingsNode::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Renders leaves the way they read in a finding: strings unquoted,
/// lists comma-joined, objects as JSON
impl std::fmt::Display for SettingsNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsNode::Null => write!(f, "null"),
            SettingsNode::Bool(b) => write!(f, "{}", b),
            SettingsNode::Number(n) => write!(f, "{}", n),
            SettingsNode::String(s) => write!(f, "{}", s),
            SettingsNode::List(items) => {
                let rendered: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", rendered.join(","))
            }
            SettingsNode::Object(_) => write!(f, "{}", Value::from(self.clone())),
        }
    }
}
