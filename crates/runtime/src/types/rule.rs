//! Rule sets, rule scopes and rule actions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::condition::Condition;
use super::context::ExecutionContext;

/// A single mutation or side-channel emitted by a matched rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleAction {
    SetField {
        path: String,
        value: serde_json::Value,
    },
    SetContext {
        path: String,
        value: serde_json::Value,
    },
    AddItem {
        path: String,
        value: serde_json::Value,
    },
    RemoveField {
        path: String,
    },
    MapField {
        from: String,
        to: String,
    },
    EmitEvent {
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    ThrowError {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl RuleAction {
    pub fn kind(&self) -> &'static str {
        match self {
            RuleAction::SetField { .. } => "setField",
            RuleAction::SetContext { .. } => "setContext",
            RuleAction::AddItem { .. } => "addItem",
            RuleAction::RemoveField { .. } => "removeField",
            RuleAction::MapField { .. } => "mapField",
            RuleAction::EmitEvent { .. } => "emitEvent",
            RuleAction::ThrowError { .. } => "throwError",
        }
    }
}

/// Allow-lists restricting which contexts a rule applies to.
///
/// Every populated list must contain the matching context value. An
/// absent list imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countries: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenants: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orgs: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programs: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuers: Option<BTreeSet<String>>,
}

impl RuleScope {
    pub fn matches(&self, ctx: &ExecutionContext) -> bool {
        fn allows(list: &Option<BTreeSet<String>>, value: Option<&str>) -> bool {
            match list {
                None => true,
                Some(allowed) => value.is_some_and(|v| allowed.contains(v)),
            }
        }

        let roles_ok = match &self.roles {
            None => true,
            Some(allowed) => allowed.iter().any(|r| ctx.has_role(r)),
        };

        roles_ok
            && allows(&self.countries, Some(ctx.country.as_str()))
            && allows(&self.tenants, Some(ctx.tenant_id.as_str()))
            && allows(&self.orgs, ctx.org_id.as_deref())
            && allows(&self.programs, ctx.program_id.as_deref())
            && allows(&self.issuers, ctx.issuer_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: f64,
    pub when: Condition,
    #[serde(default)]
    pub actions: Vec<RuleAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<RuleScope>,
}

impl Rule {
    pub fn applies_to(&self, ctx: &ExecutionContext) -> bool {
        self.scope.as_ref().map_or(true, |s| s.matches(ctx))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }
}
