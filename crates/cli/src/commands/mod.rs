//! Subcommand implementations.

mod explain;
mod step;
mod validate;

pub(crate) use explain::cmd_explain;
pub(crate) use step::{cmd_step, StepArgs};
pub(crate) use validate::cmd_validate;

use std::collections::BTreeMap;
use std::path::Path;
use std::process;

use serde::de::DeserializeOwned;
use waypoint_runtime::ApiMapping;

use crate::{report_error, OutputFormat};

/// Read and parse a JSON file, exiting with status 1 on failure.
pub(crate) fn read_json(path: &Path, output: OutputFormat, quiet: bool) -> serde_json::Value {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Read a JSON file into `T`, naming `what` in the error message.
pub(crate) fn load<T: DeserializeOwned>(
    path: &Path,
    what: &str,
    output: OutputFormat,
    quiet: bool,
) -> T {
    let value = read_json(path, output, quiet);
    match serde_json::from_value(value) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("invalid {} in '{}': {}", what, path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// API mappings may be stored as a list or as an object keyed by `apiId`.
pub(crate) fn load_apis(
    path: &Path,
    output: OutputFormat,
    quiet: bool,
) -> BTreeMap<String, ApiMapping> {
    let value = read_json(path, output, quiet);
    match parse_apis(value) {
        Ok(apis) => apis,
        Err(e) => {
            let msg = format!("invalid API mappings in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn parse_apis(value: serde_json::Value) -> Result<BTreeMap<String, ApiMapping>, serde_json::Error> {
    if value.is_array() {
        let list: Vec<ApiMapping> = serde_json::from_value(value)?;
        Ok(list.into_iter().map(|m| (m.api_id.clone(), m)).collect())
    } else {
        serde_json::from_value(value)
    }
}
