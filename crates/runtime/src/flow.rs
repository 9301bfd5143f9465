//! Flow engine: one state machine transition per event.
//!
//! The flow itself never touches data or context. It only decides where
//! the session goes next and which actions and API call the orchestration
//! step should run on the way.

use tracing::debug;

use crate::error::ConfigError;
use crate::path;
use crate::predicate::eval_condition;
use crate::provenance::ReadCollector;
use crate::trace::{FlowTrace, GuardTrace, TransitionReason};
use crate::types::{DataMap, ExecutionContext, FlowSchema};

/// Resolve `event` from `state_id`.
///
/// A missing event or a false guard is a normal outcome reported in
/// [`FlowTrace::reason`] with the state unchanged. A state or target that
/// does not exist is a configuration error.
pub fn transition(
    flow: &FlowSchema,
    state_id: &str,
    event: &str,
    context: &ExecutionContext,
    data: &DataMap,
) -> Result<FlowTrace, ConfigError> {
    let state = flow
        .states
        .get(state_id)
        .ok_or_else(|| ConfigError::UnknownState {
            flow_id: flow.flow_id.clone(),
            state_id: state_id.to_string(),
        })?;

    let mut trace = FlowTrace {
        flow_id: flow.flow_id.clone(),
        from_state: state_id.to_string(),
        event: event.to_string(),
        to_state: state_id.to_string(),
        ui_page_id: state.ui_page_id.clone(),
        reason: TransitionReason::NoTransition,
        guard: None,
        actions_to_run: Vec::new(),
        api_id: None,
    };

    let Some(transition) = state.on.get(event) else {
        debug!(flow_id = %flow.flow_id, state_id, event, "no transition");
        return Ok(trace);
    };

    if let Some(guard) = &transition.guard {
        let root = path::make_root(data.clone(), context.to_json());
        let mut collector = ReadCollector::new();
        let result = eval_condition(guard, &root, &mut collector);
        trace.guard = Some(GuardTrace {
            result,
            reads: collector.into_reads(),
        });
        if !result {
            debug!(flow_id = %flow.flow_id, state_id, event, "guard failed");
            trace.reason = TransitionReason::GuardFailed;
            return Ok(trace);
        }
    }

    let target = flow
        .states
        .get(&transition.target)
        .ok_or_else(|| ConfigError::UnknownTarget {
            flow_id: flow.flow_id.clone(),
            from: state_id.to_string(),
            event: event.to_string(),
            target: transition.target.clone(),
        })?;

    debug!(flow_id = %flow.flow_id, from = state_id, to = %transition.target, event, "transition");
    trace.reason = TransitionReason::Ok;
    trace.to_state = transition.target.clone();
    trace.ui_page_id = target.ui_page_id.clone();
    trace.actions_to_run = transition.actions.clone().unwrap_or_default();
    trace.api_id = transition.api_id.clone();
    Ok(trace)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ExecutionContext {
        ExecutionContext {
            tenant_id: "t1".into(),
            user_id: "u1".into(),
            country: "FR".into(),
            ..Default::default()
        }
    }

    fn data(v: serde_json::Value) -> DataMap {
        v.as_object().cloned().unwrap_or_default()
    }

    fn flow() -> FlowSchema {
        serde_json::from_value(json!({
            "version": "1",
            "flowId": "checkout",
            "initialState": "start",
            "states": {
                "start": {
                    "uiPageId": "p1",
                    "on": {
                        "next": { "target": "review" },
                        "submit": {
                            "target": "done",
                            "guard": { "op": "gt", "left": { "path": "data.total" }, "right": { "value": 0 } },
                            "actions": ["price"],
                            "apiId": "submitOrder"
                        },
                        "broken": { "target": "ghost" }
                    }
                },
                "review": { "uiPageId": "p2", "on": {} },
                "done": { "uiPageId": "p3" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn simple_transition() {
        let t = transition(&flow(), "start", "next", &ctx(), &DataMap::new()).unwrap();
        assert_eq!(t.reason, TransitionReason::Ok);
        assert_eq!(t.to_state, "review");
        assert_eq!(t.ui_page_id, "p2");
        assert!(t.actions_to_run.is_empty());
        assert!(t.guard.is_none());
    }

    #[test]
    fn missing_event_is_no_transition() {
        let t = transition(&flow(), "review", "next", &ctx(), &DataMap::new()).unwrap();
        assert_eq!(t.reason, TransitionReason::NoTransition);
        assert_eq!(t.to_state, "review");
        assert_eq!(t.ui_page_id, "p2");
    }

    #[test]
    fn guard_failure_keeps_state() {
        let t = transition(&flow(), "start", "submit", &ctx(), &data(json!({ "total": 0 }))).unwrap();
        assert_eq!(t.reason, TransitionReason::GuardFailed);
        assert_eq!(t.to_state, "start");
        assert_eq!(t.ui_page_id, "p1");
        assert!(t.actions_to_run.is_empty());
        let guard = t.guard.unwrap();
        assert!(!guard.result);
        assert_eq!(guard.reads[0].path, "data.total");
    }

    #[test]
    fn guard_pass_carries_actions_and_api() {
        let t = transition(&flow(), "start", "submit", &ctx(), &data(json!({ "total": 5 }))).unwrap();
        assert_eq!(t.reason, TransitionReason::Ok);
        assert_eq!(t.to_state, "done");
        assert_eq!(t.ui_page_id, "p3");
        assert_eq!(t.actions_to_run, vec!["price"]);
        assert_eq!(t.api_id.as_deref(), Some("submitOrder"));
        assert!(t.guard.unwrap().result);
    }

    #[test]
    fn unknown_state_is_config_error() {
        let err = transition(&flow(), "limbo", "next", &ctx(), &DataMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownState { .. }));
    }

    #[test]
    fn unknown_target_is_config_error() {
        let err = transition(&flow(), "start", "broken", &ctx(), &DataMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTarget { .. }));
    }
}
