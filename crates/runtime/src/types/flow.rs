//! Flow schema: a finite state machine over UI pages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::condition::Condition;
use super::rule::RuleAction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<Condition>,
    /// Rule ids or flow-level action names to run after the transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_id: Option<String>,
}

impl Transition {
    pub fn to(target: impl Into<String>) -> Self {
        Transition {
            target: target.into(),
            guard: None,
            actions: None,
            api_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub ui_page_id: String,
    #[serde(default)]
    pub on: BTreeMap<String, Transition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSchema {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub flow_id: String,
    pub initial_state: String,
    pub states: BTreeMap<String, State>,
    /// Named action blocks a transition may reference instead of a rule id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, Vec<RuleAction>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_flow() {
        let flow: FlowSchema = serde_json::from_value(json!({
            "version": "1",
            "flowId": "checkout",
            "initialState": "start",
            "states": {
                "start": { "uiPageId": "p1", "on": { "next": { "target": "review" } } },
                "review": { "uiPageId": "p2" }
            }
        }))
        .unwrap();
        assert_eq!(flow.initial_state, "start");
        assert_eq!(flow.states["start"].on["next"], Transition::to("review"));
        assert!(flow.states["review"].on.is_empty());
        assert!(flow.actions.is_empty());
    }

    #[test]
    fn parses_transition_extras() {
        let t: Transition = serde_json::from_value(json!({
            "target": "done",
            "guard": { "op": "exists", "left": { "path": "data.email" } },
            "actions": ["apply_discount"],
            "apiId": "submitOrder"
        }))
        .unwrap();
        assert_eq!(t.actions.as_deref(), Some(&["apply_discount".to_string()][..]));
        assert_eq!(t.api_id.as_deref(), Some("submitOrder"));
        assert!(t.guard.is_some());
    }
}
