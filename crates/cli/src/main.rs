mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use cschema_core::SchemaError;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Authorization schema toolchain.
#[derive(Parser)]
#[command(name = "cschema", version, about = "Authorization schema toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log resolver and parser activity to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and resolve a schema file
    Check {
        /// Path to the schema source file
        file: PathBuf,
    },

    /// Print a schema file in canonical layout
    Format {
        /// Path to the schema source file
        file: PathBuf,
        /// Exit non-zero if the file is not already canonical
        #[arg(long, conflicts_with = "write")]
        check: bool,
        /// Rewrite the file in place
        #[arg(long)]
        write: bool,
    },

    /// Print the resolved schema as JSON
    Resolve {
        /// Path to the schema source file
        file: PathBuf,
    },

    /// Convert a schema file to the JSON schema format
    Json {
        /// Path to the schema source file
        file: PathBuf,
    },

    /// Convert a JSON-format schema to schema source text
    FromJson {
        /// Path to the JSON schema file
        file: PathBuf,
    },

    /// Validate a JSON-format schema against the formal JSON Schema
    Validate {
        /// Path to the JSON schema file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check { file } => commands::check::cmd_check(&file, cli.output, cli.quiet),
        Commands::Format { file, check, write } => {
            commands::format::cmd_format(&file, check, write, cli.output, cli.quiet)
        }
        Commands::Resolve { file } => commands::json::cmd_resolve(&file, cli.output, cli.quiet),
        Commands::Json { file } => commands::json::cmd_json(&file, cli.output, cli.quiet),
        Commands::FromJson { file } => {
            commands::json::cmd_from_json(&file, cli.output, cli.quiet)
        }
        Commands::Validate { file } => {
            commands::validate::cmd_validate(&file, cli.output, cli.quiet)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "cschema_core=debug,cschema_cli=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Print an error message to stderr in the requested format.
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

/// Report a pipeline failure and exit with status 1. In JSON mode the
/// structured error is printed even when `quiet` is set.
pub(crate) fn fail(e: &SchemaError, output: OutputFormat, quiet: bool) -> ! {
    tracing::debug!(kind = e.kind(), "command failed");
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::to_string_pretty(&e.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", e));
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("error: {}", e);
            }
        }
    }
    process::exit(1);
}

/// Print a JSON value to stdout, pretty.
pub(crate) fn print_json(value: &serde_json::Value) {
    let pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}
