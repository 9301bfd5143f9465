use std::collections::BTreeMap;
use std::path::Path;
use std::process;

use serde::Serialize;
use tracing::debug;
use waypoint_runtime::{
    run_step, DataMap, ExecutionContext, FlowSchema, RuleSet, RuntimeTrace, StepInput, TraceError,
};

use super::{load, load_apis, read_json};
use crate::config::CliConfig;
use crate::{report_error, OutputFormat};

/// Input files and flags for `waypoint step`.
pub(crate) struct StepArgs<'a> {
    pub flow: &'a Path,
    pub rules: Option<&'a Path>,
    pub apis: Option<&'a Path>,
    pub context: &'a Path,
    pub data: Option<&'a Path>,
    /// Defaults to the flow's initial state.
    pub state: Option<&'a str>,
    pub event: &'a str,
    pub config: Option<&'a Path>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StepReport<'a> {
    next_state_id: &'a str,
    ui_page_id: &'a str,
    updated_context: &'a ExecutionContext,
    updated_data: &'a DataMap,
    trace: &'a RuntimeTrace,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a TraceError>,
}

pub(crate) fn cmd_step(args: StepArgs<'_>, output: OutputFormat, quiet: bool) {
    let config = match CliConfig::load(args.config) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    debug!(
        mode = ?config.transport.mode,
        stub_routes = config.transport.responses.len(),
        "transport configured"
    );
    let transport = match config.build_transport() {
        Ok(t) => t,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let flow: FlowSchema = load(args.flow, "flow schema", output, quiet);
    let rules: RuleSet = match args.rules {
        Some(path) => load(path, "rule set", output, quiet),
        None => RuleSet::default(),
    };
    let apis = match args.apis {
        Some(path) => load_apis(path, output, quiet),
        None => BTreeMap::new(),
    };
    let context: ExecutionContext = load(args.context, "execution context", output, quiet);
    let data = match args.data.map(|path| read_json(path, output, quiet)) {
        None | Some(serde_json::Value::Null) => DataMap::new(),
        Some(serde_json::Value::Object(map)) => map,
        Some(_) => {
            report_error("data must be a JSON object", output, quiet);
            process::exit(1);
        }
    };

    let state_id = args.state.unwrap_or(flow.initial_state.as_str());
    debug!(
        flow_id = %flow.flow_id,
        state_id,
        event = args.event,
        rules = rules.rules.len(),
        apis = apis.len(),
        "step inputs loaded"
    );
    let input = StepInput {
        flow: &flow,
        rules: &rules,
        apis: &apis,
        state_id,
        event: args.event,
        context: &context,
        data: &data,
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to start async runtime: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let outcome = match runtime.block_on(run_step(input, transport.as_ref())) {
        Ok(o) => o,
        Err(e) => {
            report_error(&format!("configuration error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let report = StepReport {
        next_state_id: &outcome.next_state_id,
        ui_page_id: &outcome.ui_page_id,
        updated_context: &outcome.updated_context,
        updated_data: &outcome.updated_data,
        trace: &outcome.trace,
        error: outcome.error.as_ref(),
    };
    let rendered = match output {
        OutputFormat::Text => serde_json::to_string_pretty(&report),
        OutputFormat::Json => serde_json::to_string(&report),
    };
    println!(
        "{}",
        rendered.unwrap_or_else(|e| format!("serialization error: {}", e))
    );
}
