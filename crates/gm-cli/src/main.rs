#![forbid(unsafe_code)]

//! graphmend CLI - turn raw model output into Mermaid flowcharts.
//!
//! # Commands
//!
//! - `render`: Recover a graph from model output and write Mermaid markup
//! - `recover`: Output the recovered graph, outcome and diagnostics as JSON
//! - `validate`: Report whether model output is recoverable, with diagnostics

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gm_core::{Diagnostic, GraphDirection, GraphmendError, LabelPolicy, RecoveryConfig};
use gm_parser::{Recovery, recover_with_config, recovery_evidence_json};
use gm_render::{MermaidRenderConfig, render_mermaid_with_config};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// graphmend CLI - turn raw model output into Mermaid flowcharts.
#[derive(Debug, Parser)]
#[command(
    name = "gm-cli",
    version,
    about = "graphmend CLI - turn raw model output into Mermaid flowcharts",
    long_about = "Recovers a node/edge graph from free-form language model output.\n\n\
        Handles code fences, surrounding prose, trailing commas, duplicated\n\
        closers and responses split into several JSON fragments."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging (can be repeated for more detail: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// TOML configuration file with [recovery] and [render] tables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recover a graph and write Mermaid markup.
    Render {
        /// Input file path, "-" for stdin, or inline model output.
        #[arg(default_value = "-")]
        input: String,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,

        /// Flow direction (TD, TB, BT, LR, RL). Overrides the config file.
        #[arg(short, long)]
        direction: Option<GraphDirection>,

        /// Embed labels without escaping quotes or line breaks.
        #[arg(long)]
        verbatim_labels: bool,

        /// Print a JSON summary (outcome, counts, timing, diagnostics) to stderr
        #[arg(long)]
        json: bool,
    },

    /// Recover a graph and output it as JSON.
    Recover {
        /// Input file path, "-" for stdin, or inline model output.
        #[arg(default_value = "-")]
        input: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output only a summary (outcome and counts)
        #[arg(long)]
        summary: bool,
    },

    /// Check whether model output is recoverable and report diagnostics.
    Validate {
        /// Input file path, "-" for stdin, or inline model output.
        #[arg(default_value = "-")]
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Exit with non-zero status on warnings (not just failure)
        #[arg(long)]
        strict: bool,
    },
}

/// Settings read from `--config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CliConfig {
    recovery: RecoveryConfig,
    render: MermaidRenderConfig,
}

/// Summary printed by `render --json`.
#[derive(Debug, Serialize)]
struct RenderSummary {
    outcome: String,
    node_count: usize,
    edge_count: usize,
    output_bytes: usize,
    recover_time_ms: f64,
    render_time_ms: f64,
    total_time_ms: f64,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Serialize)]
struct ValidateResult {
    valid: bool,
    outcome: Option<String>,
    node_count: usize,
    edge_count: usize,
    warnings: Vec<ValidationWarning>,
    errors: Vec<ValidationError>,
}

#[derive(Debug, Serialize)]
struct ValidationWarning {
    code: String,
    message: String,
    snippet: Option<String>,
}

#[derive(Debug, Serialize)]
struct ValidationError {
    code: String,
    message: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Render {
            input,
            output,
            direction,
            verbatim_labels,
            json,
        } => {
            let render = resolve_render_config(config.render, direction, verbatim_labels);
            cmd_render(&input, &config.recovery, &render, output.as_deref(), json)
        }

        Command::Recover {
            input,
            pretty,
            summary,
        } => cmd_recover(&input, &config.recovery, pretty, summary),

        Command::Validate {
            input,
            json,
            strict,
        } => cmd_validate(&input, &config.recovery, json, strict),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config = parse_config(&text)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    debug!("Loaded config from {}: {config:?}", path.display());
    Ok(config)
}

fn parse_config(text: &str) -> Result<CliConfig> {
    Ok(toml::from_str(text)?)
}

fn resolve_render_config(
    base: MermaidRenderConfig,
    direction: Option<GraphDirection>,
    verbatim_labels: bool,
) -> MermaidRenderConfig {
    let mut config = base;
    if let Some(direction) = direction {
        config.direction = direction;
    }
    if verbatim_labels {
        config.labels = LabelPolicy::Verbatim;
    }
    config
}

fn load_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else if Path::new(input).exists() {
        std::fs::read_to_string(input).context(format!("Failed to read file: {input}"))
    } else {
        // Treat as inline model output
        Ok(input.to_string())
    }
}

fn write_output(output: Option<&str>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).context(format!("Failed to write to: {path}"))?;
            info!("Wrote output to: {path}");
        }
        None => {
            io::stdout()
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

fn log_failure(error: &GraphmendError) {
    for diagnostic in error.diagnostics() {
        debug!("[{}] {}", diagnostic.code(), diagnostic.message);
    }
}

// =============================================================================
// Command: render
// =============================================================================

fn cmd_render(
    input: &str,
    recovery_config: &RecoveryConfig,
    render_config: &MermaidRenderConfig,
    output: Option<&str>,
    json_output: bool,
) -> Result<()> {
    let source = load_input(input)?;
    let total_start = Instant::now();

    let recover_start = Instant::now();
    let recovery = recover_with_config(&source, recovery_config)
        .inspect_err(log_failure)
        .context("could not generate diagram")?;
    let recover_time = recover_start.elapsed();

    debug!("Recovered: {}", recovery_evidence_json(&recovery));

    let render_start = Instant::now();
    let markup = render_mermaid_with_config(&recovery.graph, render_config);
    let render_time = render_start.elapsed();

    let total_time = total_start.elapsed();

    if json_output {
        let summary = RenderSummary {
            outcome: recovery.outcome.as_str().to_string(),
            node_count: recovery.graph.node_count(),
            edge_count: recovery.graph.edge_count(),
            output_bytes: markup.len(),
            recover_time_ms: recover_time.as_secs_f64() * 1000.0,
            render_time_ms: render_time.as_secs_f64() * 1000.0,
            total_time_ms: total_time.as_secs_f64() * 1000.0,
            diagnostics: recovery.diagnostics.clone(),
        };
        eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    }

    write_output(output, &markup)?;

    info!(
        "Rendered {} nodes, {} edges ({}) in {:.2}ms",
        recovery.graph.node_count(),
        recovery.graph.edge_count(),
        recovery.outcome.as_str(),
        total_time.as_secs_f64() * 1000.0
    );

    Ok(())
}

// =============================================================================
// Command: recover
// =============================================================================

fn cmd_recover(input: &str, config: &RecoveryConfig, pretty: bool, summary: bool) -> Result<()> {
    let source = load_input(input)?;

    let recovery: Recovery = match recover_with_config(&source, config) {
        Ok(recovery) => recovery,
        Err(error) => {
            log_failure(&error);
            let failure = serde_json::json!({
                "error": error.code().as_str(),
                "message": error.to_string(),
                "diagnostics": error.diagnostics(),
            });
            println!("{}", to_json(&failure, pretty)?);
            std::process::exit(1);
        }
    };

    let output = if summary {
        let value: serde_json::Value = serde_json::from_str(&recovery_evidence_json(&recovery))?;
        to_json(&value, pretty)?
    } else {
        to_json(&recovery, pretty)?
    };
    println!("{output}");

    for diagnostic in recovery.diagnostics.iter().filter(|d| d.is_warning()) {
        warn!("Recovery warning: {}", diagnostic.message);
    }

    Ok(())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

// =============================================================================
// Command: validate
// =============================================================================

fn cmd_validate(input: &str, config: &RecoveryConfig, json_output: bool, strict: bool) -> Result<()> {
    let source = load_input(input)?;
    let result = validate_source(&source, config, strict);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if result.valid {
            println!(
                "✓ Recoverable ({})",
                result.outcome.as_deref().unwrap_or("unknown")
            );
        } else {
            println!("✗ Not recoverable");
        }

        println!("  Nodes: {}", result.node_count);
        println!("  Edges: {}", result.edge_count);

        if !result.errors.is_empty() {
            println!("\nErrors:");
            for err in &result.errors {
                println!("  [{}] {}", err.code, err.message);
            }
        }

        if !result.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &result.warnings {
                println!("  [{}] {}", warning.code, warning.message);
                if let Some(snippet) = &warning.snippet {
                    println!("       → {snippet}");
                }
            }
        }
    }

    if !result.valid {
        std::process::exit(1);
    }

    Ok(())
}

fn validate_source(source: &str, config: &RecoveryConfig, strict: bool) -> ValidateResult {
    let (recovery, diagnostics, errors) = match recover_with_config(source, config) {
        Ok(recovery) => {
            let diagnostics = recovery.diagnostics.clone();
            (Some(recovery), diagnostics, Vec::new())
        }
        Err(error) => {
            let diagnostics = error.diagnostics().to_vec();
            let errors = vec![ValidationError {
                code: error.code().as_str().to_string(),
                message: error.to_string(),
            }];
            (None, diagnostics, errors)
        }
    };

    let warnings: Vec<ValidationWarning> = diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.is_warning())
        .map(|diagnostic| ValidationWarning {
            code: diagnostic.code(),
            message: diagnostic.message.clone(),
            snippet: diagnostic.snippet.clone(),
        })
        .collect();

    let valid = errors.is_empty() && (!strict || warnings.is_empty());

    ValidateResult {
        valid,
        outcome: recovery
            .as_ref()
            .map(|recovery| recovery.outcome.as_str().to_string()),
        node_count: recovery
            .as_ref()
            .map_or(0, |recovery| recovery.graph.node_count()),
        edge_count: recovery
            .as_ref()
            .map_or(0, |recovery| recovery.graph.edge_count()),
        warnings,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Cli, CliConfig, Command, load_config, parse_config, resolve_render_config,
        validate_source,
    };
    use clap::Parser;
    use gm_core::{GraphDirection, LabelPolicy, RecoveryConfig};
    use gm_render::MermaidRenderConfig;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        assert_eq!(parse_config("").expect("empty config"), CliConfig::default());
    }

    #[test]
    fn config_tables_override_defaults() {
        let config = parse_config(
            r#"
[recovery]
lenient_fragments = false

[render]
direction = "LR"
labels = "verbatim"
"#,
        )
        .expect("valid config");
        assert!(!config.recovery.lenient_fragments);
        assert_eq!(config.recovery.max_snippet_chars, 80);
        assert_eq!(config.render.direction, GraphDirection::LR);
        assert_eq!(config.render.labels, LabelPolicy::Verbatim);
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        assert!(parse_config("[output]\nformat = \"svg\"\n").is_err());
    }

    #[test]
    fn config_is_loaded_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[recovery]\nmax_snippet_chars = 16").expect("write config");
        let config = load_config(Some(file.path())).expect("load config");
        assert_eq!(config.recovery.max_snippet_chars, 16);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        assert!(load_config(Some(missing.as_path())).is_err());
        assert_eq!(load_config(None).expect("no file"), CliConfig::default());
    }

    #[test]
    fn flags_override_render_config() {
        let base = MermaidRenderConfig::default();
        let resolved = resolve_render_config(base, Some(GraphDirection::RL), true);
        assert_eq!(resolved.direction, GraphDirection::RL);
        assert_eq!(resolved.labels, LabelPolicy::Verbatim);
        assert_eq!(resolve_render_config(base, None, false), base);
    }

    #[test]
    fn render_arguments_parse() {
        let cli = Cli::try_parse_from(["gm-cli", "-vv", "render", "out.txt", "-d", "lr", "--json"])
            .expect("valid arguments");
        assert_eq!(cli.verbose, 2);
        let Command::Render {
            input,
            direction,
            json,
            ..
        } = cli.command
        else {
            panic!("expected render command");
        };
        assert_eq!(input, "out.txt");
        assert_eq!(direction, Some(GraphDirection::LR));
        assert!(json);
    }

    #[test]
    fn validate_reports_failure_as_error() {
        let result = validate_source("no graph here", &RecoveryConfig::default(), false);
        assert!(!result.valid);
        assert_eq!(result.errors[0].code, "graphmend/error/no-nodes");
        assert_eq!(result.node_count, 0);
    }

    #[test]
    fn strict_validation_fails_on_warnings() {
        let input = r#"{"nodes":[{"id":"a","label":"A"},{"id":"b"}],"edges":[]}"#;
        let lenient = validate_source(input, &RecoveryConfig::default(), false);
        assert!(lenient.valid);
        assert_eq!(lenient.outcome.as_deref(), Some("strict"));
        assert_eq!(lenient.warnings.len(), 1);

        let strict = validate_source(input, &RecoveryConfig::default(), true);
        assert!(!strict.valid);
    }
}
