//! Waypoint runtime -- drives a configuration-defined application from
//! data alone.
//!
//! A [`FlowSchema`] decides which page comes next, a [`RuleSet`] mutates
//! data and context and emits events, and [`ApiMapping`]s describe the
//! external calls a transition makes. Nothing tenant-supplied is ever
//! executed as code.
//!
//! [`run_step`] composes the three for a single event and returns the
//! next state, the updated context and data, and a [`RuntimeTrace`]
//! explaining what was read, matched, changed and called. Network I/O
//! goes through an injected [`Transport`], so a step with a stub
//! transport is fully deterministic.

pub mod action;
pub mod api;
pub mod compare;
pub mod error;
pub mod flow;
pub mod path;
pub mod predicate;
pub mod provenance;
pub mod rules;
pub mod step;
pub mod trace;
pub mod transport;
pub mod types;
pub mod validate;

pub use api::{dispatch, ApiOutcome};
pub use error::{ConfigError, TraceError, TraceErrorKind};
pub use rules::{evaluate, RulesOutcome};
pub use step::{run_step, StepInput, StepOutcome};
pub use trace::{EvalMode, FlowTrace, RulesTrace, RuntimeTrace, TransitionReason};
pub use transport::{Transport, TransportError, TransportRequest, TransportResponse};
pub use types::{ApiMapping, DataMap, ExecutionContext, FlowSchema, RuleSet};

/// Parse a rule set from JSON and evaluate it in `predicate` mode.
///
/// Convenience for callers that only need to know which rules match.
pub fn evaluate_json(
    rule_set: &serde_json::Value,
    context: &serde_json::Value,
    data: &serde_json::Value,
) -> Result<RulesOutcome, String> {
    let rule_set: RuleSet =
        serde_json::from_value(rule_set.clone()).map_err(|e| format!("invalid rule set: {}", e))?;
    let context = ExecutionContext::from_json(context.clone())
        .map_err(|e| format!("invalid context: {}", e))?;
    let data = match data {
        serde_json::Value::Object(map) => map.clone(),
        serde_json::Value::Null => DataMap::new(),
        _ => return Err("data must be a JSON object".to_string()),
    };
    evaluate(&rule_set, &context, &data, EvalMode::Predicate).map_err(|e| e.to_string())
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use serde_json::json;

    /// End-to-end predicate evaluation from raw JSON.
    #[test]
    fn evaluate_json_rule_set() {
        let rules = json!({
            "version": "2024-01",
            "rules": [
                {
                    "ruleId": "vip",
                    "when": {
                        "op": "all",
                        "children": [
                            { "op": "eq", "left": { "path": "context.country" }, "right": { "value": "FR" } },
                            { "op": "gte", "left": { "path": "data.spend" }, "right": { "value": 1000 } }
                        ]
                    },
                    "actions": [ { "type": "setField", "path": "tier", "value": "vip" } ]
                },
                {
                    "ruleId": "newcomer",
                    "when": { "op": "not", "child": { "op": "exists", "left": { "path": "data.spend" } } },
                    "actions": []
                }
            ]
        });
        let context = json!({ "tenantId": "t1", "userId": "u1", "country": "FR" });
        let data = json!({ "spend": 1200.50 });

        let out = evaluate_json(&rules, &context, &data).unwrap();
        assert_eq!(out.trace.rules_considered, vec!["vip", "newcomer"]);
        assert_eq!(out.trace.rules_matched, vec!["vip"]);
        // predicate mode never writes
        assert!(out.data.get("tier").is_none());

        let vip = out.trace.entry("vip").unwrap();
        let paths: Vec<&str> = vip.reads.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["context.country", "data.spend"]);
    }

    #[test]
    fn evaluate_json_rejects_bad_input() {
        let rules = json!({ "rules": [] });
        let context = json!({ "tenantId": "t1", "userId": "u1", "country": "FR", "device": "tv" });
        let err = evaluate_json(&rules, &context, &json!({})).unwrap_err();
        assert!(err.starts_with("invalid context"));

        let context = json!({ "tenantId": "t1", "userId": "u1", "country": "FR" });
        let err = evaluate_json(&rules, &context, &json!([1, 2])).unwrap_err();
        assert_eq!(err, "data must be a JSON object");
    }

    #[test]
    fn evaluate_json_reports_duplicate_ids() {
        let rules = json!({
            "version": "1",
            "rules": [
                { "ruleId": "a", "when": { "op": "all" }, "actions": [] },
                { "ruleId": "a", "when": { "op": "all" }, "actions": [] }
            ]
        });
        let context = json!({ "tenantId": "t1", "userId": "u1", "country": "FR" });
        let err = evaluate_json(&rules, &context, &json!({})).unwrap_err();
        assert!(err.contains("duplicate"), "{}", err);
    }
}
