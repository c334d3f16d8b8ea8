//! Engram hook binary
//!
//! Reads one JSON hook envelope from stdin (except `enrich`), runs the
//! matching pipeline handler, and writes the response envelope to stdout.
//! Hook failures are logged to stderr and never block the host: the
//! process emits the standard response and exits 0 regardless.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use engram_core::{
    HookPipeline, HookResponse, MemoryConfig, MemoryStore, NormalizedHookInput,
};

#[derive(Parser)]
#[command(
    name = "engram-hooks",
    version,
    about = "Hook capture for the Engram memory engine"
)]
struct Cli {
    /// Project base directory; defaults to the envelope's cwd
    #[arg(long)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Emit Markdown project context for a starting session
    Context,
    /// Ensure the session record exists
    SessionInit,
    /// Capture one tool invocation as an observation
    Observation,
    /// Fold the session's activity into a summary and close it
    Summarize,
    /// Append a user prompt to the session
    UserMessage,
    /// Re-run enrichment for a stored observation
    Enrich {
        /// Observation id to enrich
        observation_id: String,
        /// Project directory (default: current directory)
        cwd: Option<PathBuf>,
    },
}

fn open_pipeline(base_dir: PathBuf) -> anyhow::Result<HookPipeline> {
    let store = Arc::new(MemoryStore::open(MemoryConfig::for_project(base_dir))?);
    Ok(HookPipeline::new(store))
}

fn read_stdin() -> String {
    let mut raw = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut raw) {
        error!(error = %e, "failed to read stdin");
    }
    raw
}

async fn run(cli: Cli) -> anyhow::Result<HookResponse> {
    if let Command::Enrich {
        observation_id,
        cwd,
    } = &cli.command
    {
        let base = cli
            .base_dir
            .clone()
            .or_else(|| cwd.clone())
            .unwrap_or(std::env::current_dir()?);
        let pipeline = open_pipeline(base)?;
        let updated = pipeline.enrich_observation(observation_id).await?;
        info!(observation_id, updated, "enrich finished");
        return Ok(HookResponse::ok());
    }

    let input = NormalizedHookInput::from_json(&read_stdin());
    let base = cli
        .base_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&input.cwd));
    let pipeline = open_pipeline(base)?;

    match cli.command {
        Command::Context => {
            let context = pipeline.handle_session_start(&input).await?;
            if context.is_empty() {
                Ok(HookResponse::ok())
            } else {
                Ok(HookResponse::with_context("SessionStart", context))
            }
        }
        Command::SessionInit | Command::UserMessage => {
            pipeline.handle_prompt(&input).await?;
            Ok(HookResponse::ok())
        }
        Command::Observation => {
            pipeline.handle_tool_use(&input).await?;
            Ok(HookResponse::ok())
        }
        Command::Summarize => {
            pipeline.handle_session_end(&input).await?;
            Ok(HookResponse::ok())
        }
        Command::Enrich { .. } => unreachable!("handled above"),
    }
}

#[tokio::main]
async fn main() {
    // stdout carries the response envelope; all logging goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let response = match run(cli).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "hook handler failed");
            HookResponse::ok()
        }
    };

    match serde_json::to_string(&response) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{{\"continue\":true,\"suppressOutput\":true}}"),
    }
}
