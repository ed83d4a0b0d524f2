//! Subcommand implementations. Each returns the process exit code.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use formwork_engine::{EngineConfig, FormEngine, MissingField, ResolvedNode, Resolution};
use formwork_fields::{Diagnostic, Issue, Schema};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::cli::{Cli, Commands, OutputFormat};
use crate::exit_codes::{EXIT_SUCCESS, EXIT_WARNING};

pub async fn run(cli: &Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    match &cli.command {
        Commands::Initial { schema } => {
            let engine = engine(schema, config)?;
            let values = engine.initial_values()?;
            emit(&values, cli.format)?;
            Ok(EXIT_SUCCESS)
        }
        Commands::Resolve {
            schema,
            values,
            once,
            tree,
        } => {
            let engine = engine(schema, config)?;
            let values = read_values(values)?;
            if *once {
                resolve_once(&engine, &values, *tree, cli.format)
            } else {
                resolve(&engine, &values, *tree, cli.format)
            }
        }
        Commands::Missing { schema, values } => {
            let engine = engine(schema, config)?;
            let resolution = engine.resolve(&read_values(values)?)?;
            emit(&resolution.missing, cli.format)?;
            Ok(exit_for(resolution.missing.is_empty()))
        }
        Commands::Validate { schema, values } => {
            let engine = engine(schema, config)?;
            let (resolution, report) = engine.validate(&read_values(values)?).await?;
            let issues: Vec<&Issue> = report.issues().collect();
            info!(issues = issues.len(), valid = report.is_valid(), "validation finished");
            emit(
                &ValidateOutput {
                    valid: report.is_valid(),
                    issues: &issues,
                    missing: &resolution.missing,
                },
                cli.format,
            )?;
            Ok(exit_for(issues.is_empty()))
        }
    }
}

#[derive(Serialize)]
struct ValidateOutput<'r> {
    valid: bool,
    issues: &'r [&'r Issue],
    missing: &'r [MissingField],
}

#[derive(Serialize)]
struct ResolveOutput<'r> {
    values: &'r Value,
    cleared: &'r [String],
    passes: usize,
    converged: bool,
    validators: Vec<&'r str>,
    missing: &'r [MissingField],
    #[serde(skip_serializing_if = "<[Diagnostic]>::is_empty")]
    diagnostics: &'r [Diagnostic],
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<&'r [ResolvedNode<'r>]>,
}

impl<'r> ResolveOutput<'r> {
    fn new(resolution: &'r Resolution<'r>, with_tree: bool) -> Self {
        Self {
            values: &resolution.values,
            cleared: &resolution.cleared,
            passes: resolution.passes,
            converged: resolution.converged,
            validators: resolution.validator_paths(),
            missing: &resolution.missing,
            diagnostics: &resolution.diagnostics,
            tree: with_tree.then_some(resolution.tree.as_slice()),
        }
    }
}

#[derive(Serialize)]
struct PassOutput<'r> {
    values: &'r Value,
    cleared: &'r [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<&'r [ResolvedNode<'r>]>,
}

fn resolve(engine: &FormEngine, values: &Value, with_tree: bool, format: OutputFormat) -> Result<i32> {
    let resolution = engine.resolve(values)?;
    emit(&ResolveOutput::new(&resolution, with_tree), format)?;
    Ok(exit_for(resolution.converged && resolution.missing.is_empty()))
}

fn resolve_once(
    engine: &FormEngine,
    values: &Value,
    with_tree: bool,
    format: OutputFormat,
) -> Result<i32> {
    let outcome = engine.resolve_once(values)?;
    emit(
        &PassOutput {
            values: &outcome.values,
            cleared: &outcome.cleared,
            tree: with_tree.then_some(outcome.tree.as_slice()),
        },
        format,
    )?;
    Ok(EXIT_SUCCESS)
}

fn exit_for(clean: bool) -> i32 {
    if clean {
        EXIT_SUCCESS
    } else {
        EXIT_WARNING
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::load()?,
    };
    debug!(?config, "configuration");
    Ok(config)
}

fn engine(schema: &Path, config: EngineConfig) -> Result<FormEngine> {
    let text = fs::read_to_string(schema)
        .with_context(|| format!("reading schema {}", schema.display()))?;
    let schema = Schema::from_json(&text)
        .with_context(|| format!("parsing schema {}", schema.display()))?;
    Ok(FormEngine::with_config(schema, config)?)
}

fn read_values(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading values {}", path.display()))?;
    let values: Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing values {}", path.display()))?;
    if !values.is_object() {
        bail!("values in {} must be a JSON object", path.display());
    }
    Ok(values)
}

fn emit<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml_ng::to_string(value)?,
    };
    println!("{}", text.trim_end());
    Ok(())
}
