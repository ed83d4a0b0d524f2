use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
#[command(name = "formwork")]
#[command(version)]
#[command(about = "Resolve declarative form schemas: defaults, visibility, validators, missing fields")]
#[command(long_about = "
formwork interprets a JSON form schema against a JSON value store.

Global arguments can be used with any command:
  --verbose     Show progress information on stderr
  --debug       Enable debug tracing
  --quiet       Only log errors
  --format      Output format (json, yaml)
  --config      Read engine settings from this file instead of ./formwork.*

Exit codes: 0 nothing to report, 1 missing fields or validation issues,
2 error.

Example usage:
  formwork initial form.json                   # Default values
  formwork resolve form.json values.json       # Visibility with clearing
  formwork missing form.json values.json       # Soft-required fields still empty
  formwork --format yaml validate form.json values.json
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Engine configuration file (toml, yaml or json)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the value store a fresh form starts from
    Initial {
        /// Schema file: an array of nodes or an object with `components`
        schema: PathBuf,
    },
    /// Apply visibility and clear-on-hide, then report validators and missing fields
    Resolve {
        schema: PathBuf,
        /// Value store file (JSON object)
        values: PathBuf,
        /// Run exactly one visibility pass instead of iterating to a fixpoint
        #[arg(long)]
        once: bool,
        /// Include the resolved node tree in the output
        #[arg(long)]
        tree: bool,
    },
    /// List visible soft-required fields that are empty
    Missing { schema: PathBuf, values: PathBuf },
    /// Run every validator of the visible form
    Validate { schema: PathBuf, values: PathBuf },
}
