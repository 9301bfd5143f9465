//! Orchestration step: one event applied to one session.
//!
//! A step runs the flow transition, then the actions the transition
//! names, then its API call. Inputs are never modified; the outcome
//! carries the next state, new context and data, and the full trace.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::api;
use crate::error::{ConfigError, TraceError, TraceErrorKind};
use crate::flow;
use crate::rules;
use crate::trace::{EvalMode, RuntimeTrace, TransitionReason};
use crate::transport::Transport;
use crate::types::{ApiMapping, DataMap, ExecutionContext, FlowSchema, Rule, RuleAction, RuleSet};
use crate::validate;

/// Everything a step needs besides the transport.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    pub flow: &'a FlowSchema,
    pub rules: &'a RuleSet,
    pub apis: &'a BTreeMap<String, ApiMapping>,
    pub state_id: &'a str,
    pub event: &'a str,
    pub context: &'a ExecutionContext,
    pub data: &'a DataMap,
}

/// Result of one orchestration step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub next_state_id: String,
    pub ui_page_id: String,
    pub updated_context: ExecutionContext,
    pub updated_data: DataMap,
    pub trace: RuntimeTrace,
    /// Error raised by a rule during this step, also present in the trace.
    pub error: Option<TraceError>,
}

/// Run one step.
///
/// The bundle is validated first; a [`ConfigError`] means nothing ran.
/// With a deterministic transport, two calls with equal inputs produce
/// equal outcomes apart from timing fields.
pub async fn run_step(
    input: StepInput<'_>,
    transport: &dyn Transport,
) -> Result<StepOutcome, ConfigError> {
    let started_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    let started = Instant::now();

    validate::check_bundle(input.flow, input.rules, input.apis)?;

    let flow_trace = flow::transition(
        input.flow,
        input.state_id,
        input.event,
        input.context,
        input.data,
    )?;

    let mut context = input.context.clone();
    let mut data = input.data.clone();
    let mut rules_trace = None;
    let mut api_trace = None;
    let mut error = None;

    if flow_trace.reason == TransitionReason::Ok {
        if !flow_trace.actions_to_run.is_empty() {
            let (named_rules, flow_actions) = split_actions(input, &flow_trace.actions_to_run);
            let outcome = rules::run(
                &named_rules,
                &flow_actions,
                &context,
                &data,
                EvalMode::Apply,
            );
            if outcome.halted() {
                error = outcome
                    .trace
                    .errors
                    .iter()
                    .find(|e| e.kind == TraceErrorKind::RuleRaised)
                    .cloned();
            }
            context = outcome.context;
            data = outcome.data;
            rules_trace = Some(outcome.trace);
        }

        match (&flow_trace.api_id, &error) {
            (Some(api_id), None) => {
                if let Some(mapping) = input.apis.get(api_id) {
                    let outcome = api::dispatch(mapping, &context, &data, transport).await;
                    data = outcome.data;
                    api_trace = Some(outcome.trace);
                }
            }
            (Some(api_id), Some(e)) => {
                warn!(api_id = %api_id, message = %e.message, "api call skipped after rule error");
            }
            _ => {}
        }
    }

    let trace = RuntimeTrace {
        started_at,
        duration_ms: started.elapsed().as_millis() as u64,
        flow: flow_trace,
        rules: rules_trace,
        api: api_trace,
        error: error.clone(),
    };

    info!(
        flow_id = %input.flow.flow_id,
        from = input.state_id,
        to = %trace.flow.to_state,
        event = input.event,
        reason = trace.flow.reason.as_str(),
        "step completed"
    );

    Ok(StepOutcome {
        next_state_id: trace.flow.to_state.clone(),
        ui_page_id: trace.flow.ui_page_id.clone(),
        updated_context: context,
        updated_data: data,
        trace,
        error,
    })
}

/// Partition transition action names into rules and flow-level action
/// blocks. A name that is both a rule id and a flow action runs as the
/// rule. A name listed more than once runs once, at its first position.
fn split_actions<'a>(
    input: StepInput<'a>,
    names: &'a [String],
) -> (Vec<&'a Rule>, Vec<(&'a str, &'a [RuleAction])>) {
    let mut named_rules = Vec::new();
    let mut flow_actions = Vec::new();
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            continue;
        }
        if let Some(rule) = input.rules.get(name) {
            named_rules.push(rule);
        } else if let Some(actions) = input.flow.actions.get(name.as_str()) {
            flow_actions.push((name.as_str(), actions.as_slice()));
        }
    }
    (named_rules, flow_actions)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
