mod commands;
mod config;
mod explain;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use commands::{cmd_explain, cmd_step, cmd_validate, StepArgs};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Output format for the explain subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExplainOutputFormat {
    Terminal,
    Markdown,
}

/// Deterministic flow, rules and API orchestration runtime.
#[derive(Parser)]
#[command(
    name = "waypoint",
    version,
    about = "Deterministic flow, rules and API orchestration runtime"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one orchestration step and print the outcome with its trace
    Step {
        /// Path to the flow schema JSON
        #[arg(long)]
        flow: PathBuf,
        /// Path to the rule set JSON
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Path to the API mappings JSON (list, or object keyed by apiId)
        #[arg(long)]
        apis: Option<PathBuf>,
        /// Path to the execution context JSON
        #[arg(long)]
        context: PathBuf,
        /// Path to the data JSON object
        #[arg(long)]
        data: Option<PathBuf>,
        /// Current state id (default: the flow's initial state)
        #[arg(long)]
        state: Option<String>,
        /// Event to apply
        #[arg(long)]
        event: String,
        /// Transport config file (default: ./waypoint.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check a flow schema, rule set and API mappings for configuration errors
    Validate {
        /// Path to the flow schema JSON
        #[arg(long)]
        flow: PathBuf,
        /// Path to the rule set JSON
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Path to the API mappings JSON
        #[arg(long)]
        apis: Option<PathBuf>,
    },

    /// Explain a saved trace (or full step output) in plain language
    Explain {
        /// Path to the trace JSON
        file: PathBuf,
        /// Output format (terminal or markdown)
        #[arg(long, default_value = "terminal")]
        format: ExplainOutputFormat,
        /// Show every path read and the request sent
        #[arg(long)]
        verbose: bool,
    },
}

fn main() {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Step {
            flow,
            rules,
            apis,
            context,
            data,
            state,
            event,
            config,
        } => {
            cmd_step(
                StepArgs {
                    flow: &flow,
                    rules: rules.as_deref(),
                    apis: apis.as_deref(),
                    context: &context,
                    data: data.as_deref(),
                    state: state.as_deref(),
                    event: &event,
                    config: config.as_deref(),
                },
                cli.output,
                cli.quiet,
            );
        }
        Commands::Validate { flow, rules, apis } => {
            cmd_validate(
                &flow,
                rules.as_deref(),
                apis.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
        Commands::Explain {
            file,
            format,
            verbose,
        } => {
            cmd_explain(&file, format, verbose, cli.output, cli.quiet);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
