//! rules-eval — run the rule engine once against a JSON fact context.
//!
//! Without `--file`, every loaded rule runs in a single pass. With one or more
//! `--file` flags, the named files run sequentially in the given order, each
//! file's output folded into the context for the next.
//!
//! The execution result is printed to stdout as JSON; logs go to stderr.

use std::fs;
use std::io::{self, Read};
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tracing::info;

use constitution_rules::config::{load_dotenv, DEFAULT_RULES_DIR};
use constitution_rules::{ComparisonMode, EngineConfig, RuleEngine};

// ── CLI ─────────────────────────────────────────────────────────────

/// Evaluate JSONL rules against a fact context.
#[derive(Parser, Debug)]
#[command(name = "rules-eval", version, about)]
struct Cli {
    /// Directory containing `*.jsonl` rule files.
    #[arg(long, env = "RULES_DIR", default_value = DEFAULT_RULES_DIR)]
    rules_dir: String,

    /// Path to the JSON fact context, or `-` for stdin.
    #[arg(long, default_value = "-")]
    context: String,

    /// Rule file to run, in order. Repeat for a sequential run.
    #[arg(long = "file")]
    files: Vec<String>,

    /// String comparison mode: `normalized` or `strict`.
    #[arg(long, env = "RULES_COMPARISON", default_value = "normalized")]
    comparison: String,

    /// Pretty-print the result.
    #[arg(long)]
    pretty: bool,
}

fn read_context(source: &str) -> anyhow::Result<Value> {
    let raw = if source == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read context from stdin")?;
        buf
    } else {
        fs::read_to_string(source).with_context(|| format!("failed to read context file {source}"))?
    };
    serde_json::from_str(&raw).context("context is not valid JSON")
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let comparison = ComparisonMode::from_str(&cli.comparison)?;
    let config = EngineConfig::new(&cli.rules_dir)
        .with_comparison(comparison)
        .with_create_dir(false);
    let engine = RuleEngine::new(config);

    let context = read_context(&cli.context)?;

    let outcome = if cli.files.is_empty() {
        engine.execute(&context)
    } else {
        engine.execute_sequential(&context, &cli.files)
    }
    .with_context(|| format!("rule execution failed for {}", cli.rules_dir))?;

    info!(matched = outcome.matched_rules.len(), keys = outcome.result.len(), "evaluation complete");

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string(&outcome)?
    };
    println!("{rendered}");
    Ok(())
}
