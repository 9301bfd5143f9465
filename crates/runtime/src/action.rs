//! Rule action application.
//!
//! Actions run against a working `{data, context}` root owned by the
//! current evaluation, never against the caller's values. Data actions
//! address paths under `data` and context actions paths under `context`.
//! The scope prefix may be omitted: `discount` and `data.discount` name
//! the same field for `setField`.

use serde_json::Value;

use crate::error::{TraceError, TraceErrorKind};
use crate::path;
use crate::trace::{ActionRecord, EmittedEvent, FieldDiff};
use crate::types::{ExecutionContext, RuleAction};

const DATA: &str = "data";
const CONTEXT: &str = "context";

/// What applying one action produced.
#[derive(Debug, Default)]
pub struct ActionOutcome {
    pub record: Option<ActionRecord>,
    pub event: Option<EmittedEvent>,
    pub error: Option<TraceError>,
    /// Stop all further action and rule processing for the step.
    pub halt: bool,
}

/// Qualify `path` with `scope` unless it already starts with it.
///
/// Returns `None` for the bare scope name: actions may not replace the
/// whole `data` or `context` object.
pub fn scoped_path(scope: &str, path: &str) -> Option<String> {
    if path == scope {
        return None;
    }
    let rooted = path
        .strip_prefix(scope)
        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['));
    if rooted {
        Some(path.to_string())
    } else {
        Some(format!("{}.{}", scope, path))
    }
}

/// Resolve a read-side path: explicit `context.`/`data.` roots are kept,
/// anything else is read from `data`.
pub(crate) fn source_path(path: &str) -> Option<String> {
    match scoped_path(CONTEXT, path) {
        Some(p) if p == path => Some(p),
        _ => scoped_path(DATA, path),
    }
}

/// Apply one action to `root`. `owner` is the rule id or flow action name.
pub fn apply_action(action: &RuleAction, root: &mut Value, owner: &str) -> ActionOutcome {
    match action {
        RuleAction::SetField { path, value } => {
            write_value(action.kind(), scoped_path(DATA, path), root, value.clone())
        }

        RuleAction::SetContext { path, value } => {
            let Some(target) = scoped_path(CONTEXT, path) else {
                return unapplied(action.kind(), None);
            };
            let previous_context = root.get(CONTEXT).cloned().unwrap_or(Value::Null);
            let outcome = write_value(action.kind(), Some(target.clone()), root, value.clone());
            let current = root.get(CONTEXT).cloned().unwrap_or(Value::Null);
            if let Err(e) = ExecutionContext::from_json(current) {
                path::write(root, CONTEXT, previous_context);
                return ActionOutcome {
                    record: Some(ActionRecord {
                        kind: action.kind().to_string(),
                        path: Some(target.clone()),
                        applied: false,
                        diff: None,
                    }),
                    error: Some(
                        TraceError::new(
                            TraceErrorKind::InvalidContext,
                            format!("write to '{}' rejected: {}", target, e),
                        )
                        .with_rule(owner),
                    ),
                    ..Default::default()
                };
            }
            outcome
        }

        RuleAction::AddItem { path, value } => {
            let Some(target) = scoped_path(DATA, path) else {
                return unapplied(action.kind(), None);
            };
            let existing = path::get(root, &target).cloned();
            let index = match &existing {
                None | Some(Value::Null) => 0,
                Some(Value::Array(items)) => items.len(),
                Some(_) => return unapplied(action.kind(), Some(target)),
            };
            if existing.is_none() || existing == Some(Value::Null) {
                path::write(root, &target, Value::Array(Vec::new()));
            }
            let item_path = format!("{}[{}]", target, index);
            write_value(action.kind(), Some(item_path), root, value.clone())
        }

        RuleAction::RemoveField { path } => {
            let Some(target) = scoped_path(DATA, path) else {
                return unapplied(action.kind(), None);
            };
            match path::remove(root, &target) {
                Some(before) => applied(
                    action.kind(),
                    FieldDiff {
                        path: target,
                        before: Some(before),
                        after: None,
                    },
                ),
                None => unapplied(action.kind(), Some(target)),
            }
        }

        RuleAction::MapField { from, to } => {
            let value = source_path(from).and_then(|p| path::get(root, &p).cloned());
            match value {
                Some(v) => write_value(action.kind(), scoped_path(DATA, to), root, v),
                None => unapplied(action.kind(), scoped_path(DATA, to)),
            }
        }

        RuleAction::EmitEvent { event, payload } => ActionOutcome {
            record: Some(ActionRecord {
                kind: action.kind().to_string(),
                path: None,
                applied: true,
                diff: None,
            }),
            event: Some(EmittedEvent {
                event: event.clone(),
                payload: payload.clone(),
                emitted_by: owner.to_string(),
            }),
            ..Default::default()
        },

        RuleAction::ThrowError { message, code } => ActionOutcome {
            record: Some(ActionRecord {
                kind: action.kind().to_string(),
                path: None,
                applied: true,
                diff: None,
            }),
            error: Some(
                TraceError::new(TraceErrorKind::RuleRaised, message.clone())
                    .with_code(code.clone())
                    .with_rule(owner),
            ),
            halt: true,
            ..Default::default()
        },
    }
}

fn write_value(kind: &str, target: Option<String>, root: &mut Value, value: Value) -> ActionOutcome {
    let Some(target) = target else {
        return unapplied(kind, None);
    };
    let before = path::get(root, &target).cloned();
    if !path::write(root, &target, value) {
        return unapplied(kind, Some(target));
    }
    let after = path::get(root, &target).cloned();
    applied(
        kind,
        FieldDiff {
            path: target,
            before,
            after,
        },
    )
}

fn applied(kind: &str, diff: FieldDiff) -> ActionOutcome {
    ActionOutcome {
        record: Some(ActionRecord {
            kind: kind.to_string(),
            path: Some(diff.path.clone()),
            applied: true,
            diff: Some(diff),
        }),
        ..Default::default()
    }
}

fn unapplied(kind: &str, target: Option<String>) -> ActionOutcome {
    ActionOutcome {
        record: Some(ActionRecord {
            kind: kind.to_string(),
            path: target,
            applied: false,
            diff: None,
        }),
        ..Default::default()
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
