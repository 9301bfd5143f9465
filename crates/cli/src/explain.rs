//! `waypoint explain` — human-readable account of one step.
//!
//! Renders a stored [`RuntimeTrace`] in four sections:
//! 1. Transition — where the session went and why
//! 2. Rules — what was read, matched, changed and emitted
//! 3. API Call — the request sent and what came back
//! 4. Outcome — errors, if any, and timing

use waypoint_runtime::trace::{ActionSource, ApiTrace, FieldDiff, RulesTrace};
use waypoint_runtime::{RuntimeTrace, TransitionReason};

/// Output format for the explain command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainFormat {
    Terminal,
    Markdown,
}

/// Extract a trace from either a bare trace document or full `step`
/// output (which carries it under `trace`).
pub fn load_trace(doc: &serde_json::Value) -> Result<RuntimeTrace, String> {
    let trace = match doc.get("trace") {
        Some(inner) if doc.get("flow").is_none() => inner,
        _ => doc,
    };
    serde_json::from_value(trace.clone()).map_err(|e| format!("not a runtime trace: {}", e))
}

/// Produce the narrative for `trace`.
pub fn explain(trace: &RuntimeTrace, format: ExplainFormat, verbose: bool) -> String {
    let mut out = String::new();

    section_transition(&mut out, format, trace, verbose);
    if let Some(rules) = &trace.rules {
        out.push('\n');
        section_rules(&mut out, format, rules, verbose);
    }
    if let Some(api) = &trace.api {
        out.push('\n');
        section_api(&mut out, format, api, verbose);
    }
    out.push('\n');
    section_outcome(&mut out, format, trace);

    out
}

// ─── Section 1: Transition ───────────────────────────────────────────────────

fn section_transition(out: &mut String, format: ExplainFormat, trace: &RuntimeTrace, verbose: bool) {
    let flow = &trace.flow;
    heading(out, format, "TRANSITION");

    emit_line(
        out,
        format,
        &format!(
            "Flow {}: event {} in state {}",
            styled_name(format, &flow.flow_id),
            styled_name(format, &flow.event),
            styled_name(format, &flow.from_state)
        ),
    );

    match flow.reason {
        TransitionReason::Ok => emit_checkmark(
            out,
            format,
            &format!(
                "moved to {} (page {})",
                styled_name(format, &flow.to_state),
                styled_name(format, &flow.ui_page_id)
            ),
        ),
        TransitionReason::NoTransition => emit_warning(
            out,
            format,
            &format!(
                "no transition for this event; stayed on page {}",
                styled_name(format, &flow.ui_page_id)
            ),
        ),
        TransitionReason::GuardFailed => emit_warning(
            out,
            format,
            &format!(
                "guard rejected the transition; stayed on page {}",
                styled_name(format, &flow.ui_page_id)
            ),
        ),
    }

    if let Some(guard) = &flow.guard {
        emit_line(
            out,
            format,
            &format!(
                "{}Guard evaluated to {}",
                indent(1),
                if guard.result { "true" } else { "false" }
            ),
        );
        if verbose {
            for read in &guard.reads {
                emit_line(
                    out,
                    format,
                    &format!("{}read {} = {}", indent(2), read.path, show(read.value.as_ref())),
                );
            }
        }
    }

    if !flow.actions_to_run.is_empty() {
        emit_line(
            out,
            format,
            &format!("{}Actions: {}", indent(1), flow.actions_to_run.join(", ")),
        );
    }
    if let Some(api_id) = &flow.api_id {
        emit_line(out, format, &format!("{}API: {}", indent(1), api_id));
    }
}

// ─── Section 2: Rules ────────────────────────────────────────────────────────

fn section_rules(out: &mut String, format: ExplainFormat, rules: &RulesTrace, verbose: bool) {
    heading(out, format, "RULES");

    emit_line(
        out,
        format,
        &format!(
            "{} considered, {} matched, {} skipped",
            rules.rules_considered.len(),
            rules.rules_matched.len(),
            rules.rules_skipped.len()
        ),
    );

    for entry in &rules.entries {
        let label = match entry.source {
            ActionSource::Rule => format!(
                "rule {} (priority {})",
                styled_name(format, &entry.rule_id),
                entry.priority
            ),
            ActionSource::FlowAction => {
                format!("flow action {}", styled_name(format, &entry.rule_id))
            }
        };
        if entry.matched {
            emit_checkmark(out, format, &format!("{} matched", label));
        } else {
            emit_line(out, format, &format!("{}{} did not match", indent(1), label));
        }

        if verbose || !entry.matched {
            for read in &entry.reads {
                emit_line(
                    out,
                    format,
                    &format!("{}read {} = {}", indent(2), read.path, show(read.value.as_ref())),
                );
            }
        }

        for action in &entry.actions {
            match (&action.diff, action.applied) {
                (Some(diff), true) => emit_line(
                    out,
                    format,
                    &format!("{}{} {}", indent(2), action.kind, describe_diff(diff)),
                ),
                (None, true) => {
                    emit_line(out, format, &format!("{}{}", indent(2), action.kind))
                }
                (_, false) => emit_line(
                    out,
                    format,
                    &format!(
                        "{}{} {} not applied",
                        indent(2),
                        action.kind,
                        action.path.as_deref().unwrap_or("")
                    ),
                ),
            }
        }
    }

    for skipped in &rules.rules_skipped {
        emit_line(
            out,
            format,
            &format!(
                "{}rule {} skipped ({})",
                indent(1),
                styled_name(format, &skipped.rule_id),
                humanize_id(&skipped.reason)
            ),
        );
    }

    for event in &rules.events {
        emit_line(
            out,
            format,
            &format!(
                "{}event {} emitted by {}",
                indent(1),
                styled_name(format, &event.event),
                event.emitted_by
            ),
        );
    }

    for error in &rules.errors {
        emit_warning(
            out,
            format,
            &format!("{}: {}", humanize_id(error.kind.as_str()), error.message),
        );
    }
}

// ─── Section 3: API Call ─────────────────────────────────────────────────────

fn section_api(out: &mut String, format: ExplainFormat, api: &ApiTrace, verbose: bool) {
    heading(out, format, "API CALL");

    emit_line(
        out,
        format,
        &format!(
            "{} {} {}",
            styled_name(format, &api.api_id),
            api.method,
            api.endpoint
        ),
    );

    if verbose {
        for (name, value) in &api.request.headers {
            emit_line(out, format, &format!("{}header {}: {}", indent(1), name, show(Some(value))));
        }
        if let Some(body) = &api.request.body {
            emit_line(out, format, &format!("{}body {}", indent(1), body));
        }
    }

    match (&api.response, &api.error) {
        (_, Some(error)) => {
            let status = api
                .response
                .as_ref()
                .map(|r| format!(" (status {})", r.status))
                .unwrap_or_default();
            emit_warning(out, format, &format!("call failed{}: {}", status, error.message));
        }
        (Some(response), None) => {
            emit_checkmark(out, format, &format!("status {}", response.status));
        }
        (None, None) => {}
    }

    for diff in &api.diffs {
        emit_line(out, format, &format!("{}{}", indent(2), describe_diff(diff)));
    }
}

// ─── Section 4: Outcome ──────────────────────────────────────────────────────

fn section_outcome(out: &mut String, format: ExplainFormat, trace: &RuntimeTrace) {
    heading(out, format, "OUTCOME");

    match &trace.error {
        Some(error) => {
            let rule = error
                .rule_id
                .as_deref()
                .map(|r| format!(" in rule {}", r))
                .unwrap_or_default();
            emit_warning(
                out,
                format,
                &format!("step halted{}: {}", rule, error.message),
            );
        }
        None => emit_checkmark(out, format, "completed without errors"),
    }

    if !trace.started_at.is_empty() {
        emit_line(
            out,
            format,
            &format!("Started {} and took {} ms", trace.started_at, trace.duration_ms),
        );
    }
}

// ─── Formatting helpers ──────────────────────────────────────────────────────

fn describe_diff(diff: &FieldDiff) -> String {
    format!(
        "{}: {} -> {}",
        diff.path,
        show(diff.before.as_ref()),
        show(diff.after.as_ref())
    )
}

fn show(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "undefined".to_string(),
    }
}

fn heading(out: &mut String, format: ExplainFormat, title: &str) {
    match format {
        ExplainFormat::Terminal => {
            out.push_str(&format!("\x1b[1m{}\x1b[0m\n", title));
            out.push_str(&"\u{2550}".repeat(title.len()));
            out.push('\n');
        }
        ExplainFormat::Markdown => {
            out.push_str(&format!("## {}\n\n", title));
        }
    }
}

fn emit_line(out: &mut String, _format: ExplainFormat, text: &str) {
    out.push_str(text);
    out.push('\n');
}

fn emit_checkmark(out: &mut String, format: ExplainFormat, text: &str) {
    match format {
        ExplainFormat::Terminal => {
            out.push_str(&format!("  \x1b[32m[ok]\x1b[0m {}\n", text));
        }
        ExplainFormat::Markdown => {
            out.push_str(&format!("- [x] {}\n", text));
        }
    }
}

fn emit_warning(out: &mut String, format: ExplainFormat, text: &str) {
    match format {
        ExplainFormat::Terminal => {
            out.push_str(&format!("  \x1b[33m[!!]\x1b[0m {}\n", text));
        }
        ExplainFormat::Markdown => {
            out.push_str(&format!("- [ ] {}\n", text));
        }
    }
}

fn styled_name(format: ExplainFormat, name: &str) -> String {
    match format {
        ExplainFormat::Terminal => format!("\x1b[36m{}\x1b[0m", name),
        ExplainFormat::Markdown => format!("`{}`", name),
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn humanize_id(id: &str) -> String {
    id.replace('_', " ")
}
