//! Configuration checks run before any step logic.
//!
//! Upstream tooling is expected to reject bad bundles. These checks exist
//! so that a bundle which slipped through fails loudly with a
//! [`ConfigError`] instead of producing a misleading trace.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ConfigError;
use crate::types::{ApiMapping, FlowSchema, RuleSet};

/// Every rule id in the set is unique.
pub fn check_rule_set(rule_set: &RuleSet) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for rule in &rule_set.rules {
        if !seen.insert(rule.rule_id.as_str()) {
            return Err(ConfigError::DuplicateRuleId {
                version: rule_set.version.clone(),
                rule_id: rule.rule_id.clone(),
            });
        }
    }
    Ok(())
}

/// The initial state and every transition target exist.
pub fn check_flow(flow: &FlowSchema) -> Result<(), ConfigError> {
    if !flow.states.contains_key(&flow.initial_state) {
        return Err(ConfigError::UnknownInitialState {
            flow_id: flow.flow_id.clone(),
            state_id: flow.initial_state.clone(),
        });
    }
    for (state_id, state) in &flow.states {
        for (event, transition) in &state.on {
            if !flow.states.contains_key(&transition.target) {
                return Err(ConfigError::UnknownTarget {
                    flow_id: flow.flow_id.clone(),
                    from: state_id.clone(),
                    event: event.clone(),
                    target: transition.target.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Every map key matches its mapping's `apiId`.
pub fn check_api_mappings(mappings: &BTreeMap<String, ApiMapping>) -> Result<(), ConfigError> {
    for (key, mapping) in mappings {
        if key != &mapping.api_id {
            return Err(ConfigError::MismatchedApiId {
                key: key.clone(),
                api_id: mapping.api_id.clone(),
            });
        }
    }
    Ok(())
}

/// Full bundle check: each part on its own, then every action name and
/// `apiId` a transition references resolves.
pub fn check_bundle(
    flow: &FlowSchema,
    rule_set: &RuleSet,
    mappings: &BTreeMap<String, ApiMapping>,
) -> Result<(), ConfigError> {
    check_flow(flow)?;
    check_rule_set(rule_set)?;
    check_api_mappings(mappings)?;

    for (state_id, state) in &flow.states {
        for (event, transition) in &state.on {
            for action in transition.actions.iter().flatten() {
                let known =
                    rule_set.get(action).is_some() || flow.actions.contains_key(action.as_str());
                if !known {
                    return Err(ConfigError::UnknownAction {
                        flow_id: flow.flow_id.clone(),
                        from: state_id.clone(),
                        event: event.clone(),
                        action: action.clone(),
                    });
                }
            }
            if let Some(api_id) = &transition.api_id {
                if !mappings.contains_key(api_id) {
                    return Err(ConfigError::UnknownApi {
                        flow_id: flow.flow_id.clone(),
                        from: state_id.clone(),
                        event: event.clone(),
                        api_id: api_id.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
