use std::path::Path;
use std::process;

use super::read_json;
use crate::explain::{explain, load_trace, ExplainFormat};
use crate::{report_error, ExplainOutputFormat, OutputFormat};

pub(crate) fn cmd_explain(
    file: &Path,
    format: ExplainOutputFormat,
    verbose: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let doc = read_json(file, output, quiet);

    let trace = match load_trace(&doc) {
        Ok(t) => t,
        Err(e) => {
            let msg = format!("explain error in '{}': {}", file.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let explain_format = match format {
        ExplainOutputFormat::Terminal => ExplainFormat::Terminal,
        ExplainOutputFormat::Markdown => ExplainFormat::Markdown,
    };

    if !quiet {
        print!("{}", explain(&trace, explain_format, verbose));
    }
}
