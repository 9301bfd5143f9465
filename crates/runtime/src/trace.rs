//! Execution trace model.
//!
//! A [`RuntimeTrace`] records everything a step read, matched, changed and
//! called, in the order it happened. It is plain serializable data so that
//! an audit tool can store it and later explain the step without
//! re-running it. Apart from `startedAt` and the `durationMs` fields, a
//! trace is a pure function of the step's inputs.

use serde::{Deserialize, Serialize};

use crate::error::TraceError;
use crate::provenance::PathRead;
use crate::types::HttpMethod;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeTrace {
    /// RFC 3339 wall-clock time the step began.
    pub started_at: String,
    pub duration_ms: u64,
    pub flow: FlowTrace,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RulesTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiTrace>,
    /// Step-level error, set when a rule raised an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TraceError>,
}

impl RuntimeTrace {
    /// Copy with every wall-clock field zeroed, for byte-wise comparison.
    pub fn without_timing(&self) -> RuntimeTrace {
        let mut trace = self.clone();
        trace.started_at = String::new();
        trace.duration_ms = 0;
        if let Some(rules) = trace.rules.as_mut() {
            rules.duration_ms = 0;
        }
        if let Some(api) = trace.api.as_mut() {
            api.duration_ms = 0;
        }
        trace
    }
}

// ──────────────────────────────────────────────
// Flow
// ──────────────────────────────────────────────

/// Why a transition did or did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    Ok,
    NoTransition,
    GuardFailed,
}

impl TransitionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionReason::Ok => "ok",
            TransitionReason::NoTransition => "no_transition",
            TransitionReason::GuardFailed => "guard_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardTrace {
    pub result: bool,
    pub reads: Vec<PathRead>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTrace {
    pub flow_id: String,
    pub from_state: String,
    pub event: String,
    pub to_state: String,
    pub ui_page_id: String,
    pub reason: TransitionReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<GuardTrace>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions_to_run: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_id: Option<String>,
}

// ──────────────────────────────────────────────
// Rules
// ──────────────────────────────────────────────

/// Rules engine mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMode {
    /// Evaluate conditions only; never write.
    Predicate,
    /// Evaluate conditions and run matched rules' actions.
    Apply,
}

/// Where a block of actions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionSource {
    Rule,
    FlowAction,
}

/// Value at `path` before and after a write. `None` means undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiff {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    /// Action type tag, e.g. `setField`.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// False when the action could not write (bad path, wrong shape).
    pub applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<FieldDiff>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTrace {
    pub rule_id: String,
    pub source: ActionSource,
    pub priority: f64,
    pub matched: bool,
    pub reads: Vec<PathRead>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionRecord>,
}

impl RuleTrace {
    pub fn diffs(&self) -> impl Iterator<Item = &FieldDiff> {
        self.actions.iter().filter_map(|a| a.diff.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRule {
    pub rule_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmittedEvent {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub emitted_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesTrace {
    pub mode: EvalMode,
    /// Rules whose scope matched, in evaluation order.
    pub rules_considered: Vec<String>,
    pub rules_matched: Vec<String>,
    /// Rules filtered out before evaluation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules_skipped: Vec<SkippedRule>,
    pub entries: Vec<RuleTrace>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EmittedEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<TraceError>,
    pub duration_ms: u64,
}

impl RulesTrace {
    pub fn new(mode: EvalMode) -> Self {
        RulesTrace {
            mode,
            rules_considered: Vec::new(),
            rules_matched: Vec::new(),
            rules_skipped: Vec::new(),
            entries: Vec::new(),
            events: Vec::new(),
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn entry(&self, rule_id: &str) -> Option<&RuleTrace> {
        self.entries.iter().find(|e| e.rule_id == rule_id)
    }

    pub fn diffs(&self) -> impl Iterator<Item = &FieldDiff> {
        self.entries.iter().flat_map(|e| e.diffs())
    }
}

// ──────────────────────────────────────────────
// API
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequestRecord {
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub headers: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponseRecord {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTrace {
    pub api_id: String,
    pub method: HttpMethod,
    /// Fully resolved URL, including query string.
    pub endpoint: String,
    pub request: ApiRequestRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ApiResponseRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TraceError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diffs: Vec<FieldDiff>,
    pub duration_ms: u64,
}
