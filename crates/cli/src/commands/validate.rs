use std::path::Path;
use std::process;

use waypoint_runtime::{validate, FlowSchema, RuleSet};

use super::{load, load_apis};
use crate::OutputFormat;

/// Check a flow, and optionally its rule set and API mappings.
///
/// Action names and `apiId` references are only cross-checked when both
/// `--rules` and `--apis` are given.
pub(crate) fn cmd_validate(
    flow_path: &Path,
    rules_path: Option<&Path>,
    apis_path: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let flow: FlowSchema = load(flow_path, "flow schema", output, quiet);
    let rules: Option<RuleSet> = rules_path.map(|p| load(p, "rule set", output, quiet));
    let apis = apis_path.map(|p| load_apis(p, output, quiet));

    let mut errors: Vec<String> = Vec::new();
    if let Err(e) = validate::check_flow(&flow) {
        errors.push(e.to_string());
    }
    if let Some(rules) = &rules {
        if let Err(e) = validate::check_rule_set(rules) {
            errors.push(e.to_string());
        }
    }
    if let Some(apis) = &apis {
        if let Err(e) = validate::check_api_mappings(apis) {
            errors.push(e.to_string());
        }
    }
    if errors.is_empty() {
        if let (Some(rules), Some(apis)) = (&rules, &apis) {
            if let Err(e) = validate::check_bundle(&flow, rules, apis) {
                errors.push(e.to_string());
            }
        }
    }

    if errors.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid"),
                OutputFormat::Json => println!("{{\"valid\": true}}"),
            }
        }
        return;
    }

    match output {
        OutputFormat::Text => {
            if !quiet {
                eprintln!("invalid");
                for err in &errors {
                    eprintln!("  - {}", err);
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "valid": false,
                "errors": errors
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
    }
    process::exit(1);
}
