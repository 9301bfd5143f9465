//! Rules engine.
//!
//! Rules whose scope admits the context are evaluated in ascending
//! priority; rules with equal priority keep their declaration order. In
//! `predicate` mode only conditions are evaluated. In `apply` mode a
//! matched rule's actions run in array order against a working copy of
//! `{data, context}`.
//!
//! A `throwError` action stops everything after it. Writes made before
//! the error are kept.

use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use crate::action::apply_action;
use crate::error::{ConfigError, TraceErrorKind};
use crate::path;
use crate::predicate::eval_condition;
use crate::provenance::ReadCollector;
use crate::trace::{ActionSource, EvalMode, RuleTrace, RulesTrace, SkippedRule};
use crate::types::{DataMap, ExecutionContext, Rule, RuleAction, RuleSet};
use crate::validate;

/// Result of a rules engine run.
#[derive(Debug, Clone)]
pub struct RulesOutcome {
    pub data: DataMap,
    pub context: ExecutionContext,
    pub trace: RulesTrace,
}

impl RulesOutcome {
    /// True if a rule raised an error during this run.
    pub fn halted(&self) -> bool {
        self.trace
            .errors
            .iter()
            .any(|e| e.kind == TraceErrorKind::RuleRaised)
    }
}

/// Evaluate a whole rule set.
///
/// Fails only on configuration errors (duplicate rule ids). The caller's
/// `context` and `data` are never modified.
pub fn evaluate(
    rule_set: &RuleSet,
    context: &ExecutionContext,
    data: &DataMap,
    mode: EvalMode,
) -> Result<RulesOutcome, ConfigError> {
    validate::check_rule_set(rule_set)?;
    let rules: Vec<&Rule> = rule_set.rules.iter().collect();
    Ok(run(&rules, &[], context, data, mode))
}

/// Run a selection of rules, then named flow-level action blocks.
///
/// Rules go through the usual scope filter and priority ordering. Flow
/// actions run unconditionally in the order given, unless a rule has
/// already raised an error.
pub(crate) fn run(
    rules: &[&Rule],
    flow_actions: &[(&str, &[RuleAction])],
    context: &ExecutionContext,
    data: &DataMap,
    mode: EvalMode,
) -> RulesOutcome {
    let started = Instant::now();
    let mut evaluation = Evaluation::new(context, data, mode);

    let mut in_scope: Vec<&Rule> = Vec::with_capacity(rules.len());
    for rule in rules.iter().copied() {
        if rule.applies_to(context) {
            in_scope.push(rule);
        } else {
            debug!(rule_id = %rule.rule_id, "rule out of scope");
            evaluation.trace.rules_skipped.push(SkippedRule {
                rule_id: rule.rule_id.clone(),
                reason: "out_of_scope".to_string(),
            });
        }
    }
    // Stable sort: equal priorities keep declaration order.
    in_scope.sort_by(|a, b| a.priority.total_cmp(&b.priority));

    for rule in in_scope {
        if evaluation.halted {
            break;
        }
        evaluation.run_rule(rule);
    }

    if mode == EvalMode::Apply {
        for (name, actions) in flow_actions {
            if evaluation.halted {
                break;
            }
            evaluation.run_flow_action(name, actions);
        }
    }

    let mut outcome = evaluation.finish(context);
    outcome.trace.duration_ms = started.elapsed().as_millis() as u64;
    outcome
}

/// Working state for one rules engine run.
struct Evaluation {
    root: Value,
    mode: EvalMode,
    trace: RulesTrace,
    halted: bool,
}

impl Evaluation {
    fn new(context: &ExecutionContext, data: &DataMap, mode: EvalMode) -> Self {
        Evaluation {
            root: path::make_root(data.clone(), context.to_json()),
            mode,
            trace: RulesTrace::new(mode),
            halted: false,
        }
    }

    fn run_rule(&mut self, rule: &Rule) {
        let mut collector = ReadCollector::new();
        let matched = eval_condition(&rule.when, &self.root, &mut collector);
        debug!(rule_id = %rule.rule_id, priority = rule.priority, matched, "rule evaluated");

        self.trace.rules_considered.push(rule.rule_id.clone());
        if matched {
            self.trace.rules_matched.push(rule.rule_id.clone());
        }

        let mut entry = RuleTrace {
            rule_id: rule.rule_id.clone(),
            source: ActionSource::Rule,
            priority: rule.priority,
            matched,
            reads: collector.into_reads(),
            actions: Vec::new(),
        };
        if matched && self.mode == EvalMode::Apply {
            self.apply_all(&rule.actions, &mut entry);
        }
        self.trace.entries.push(entry);
    }

    fn run_flow_action(&mut self, name: &str, actions: &[RuleAction]) {
        let mut entry = RuleTrace {
            rule_id: name.to_string(),
            source: ActionSource::FlowAction,
            priority: 0.0,
            matched: true,
            reads: Vec::new(),
            actions: Vec::new(),
        };
        self.apply_all(actions, &mut entry);
        self.trace.entries.push(entry);
    }

    fn apply_all(&mut self, actions: &[RuleAction], entry: &mut RuleTrace) {
        for action in actions {
            let outcome = apply_action(action, &mut self.root, &entry.rule_id);
            if let Some(record) = outcome.record {
                entry.actions.push(record);
            }
            if let Some(event) = outcome.event {
                self.trace.events.push(event);
            }
            if let Some(error) = outcome.error {
                warn!(owner = %entry.rule_id, kind = error.kind.as_str(), message = %error.message, "rule action error");
                self.trace.errors.push(error);
            }
            if outcome.halt {
                self.halted = true;
                break;
            }
        }
    }

    fn finish(self, original_context: &ExecutionContext) -> RulesOutcome {
        let Evaluation { root, trace, .. } = self;
        let (data, context) = match root {
            Value::Object(mut map) => {
                let data = match map.remove("data") {
                    Some(Value::Object(d)) => d,
                    _ => DataMap::new(),
                };
                // Each context write was validated when applied.
                let context = map
                    .remove("context")
                    .and_then(|c| ExecutionContext::from_json(c).ok())
                    .unwrap_or_else(|| original_context.clone());
                (data, context)
            }
            _ => (DataMap::new(), original_context.clone()),
        };
        RulesOutcome {
            data,
            context,
            trace,
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
