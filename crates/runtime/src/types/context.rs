//! Per-step execution context.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Device class the session is rendered on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

/// Immutable metadata a step runs under.
///
/// A step never mutates the caller's context. `setContext` actions write
/// into a copy, and the step returns that copy as its updated context.
/// Keys the runtime does not know are kept in `attributes` so that rules
/// can still address them as `context.<key>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub tenant_id: String,
    pub user_id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub device: Device,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    #[serde(default)]
    pub feature_flags: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_id: Option<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ExecutionContext {
    /// True if `role` or any entry of `roles` equals `candidate`.
    pub fn has_role(&self, candidate: &str) -> bool {
        self.role == candidate || self.roles.contains(candidate)
    }

    pub fn to_json(&self) -> serde_json::Value {
        // A struct of strings, sets and maps always serializes.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
