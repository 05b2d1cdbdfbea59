mod error;
mod script;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use runtime::{
    AssembledToolCall, Event, EventSink, MemoryTrace, Orchestrator, OrchestratorConfig,
    SinkClosed, signature_for_call,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use error::{Error, Result};
use script::Script;

const CONFIG_FILE: &str = "cadence.toml";

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Streaming tool-call turn orchestrator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scripted turn and print its events as server-sent events
    Replay {
        /// Path to the JSON replay script
        script: PathBuf,
        /// Orchestrator config (defaults to ./cadence.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Emit a toolResult event after every tool execution
        #[arg(long)]
        debug_tool_results: bool,
        /// Print recorded tool activity to stderr after the turn
        #[arg(long)]
        trace: bool,
    },
    /// Print the dedup signature of a tool call
    Signature {
        /// Tool name
        tool: String,
        /// Arguments as a JSON object
        arguments: String,
        /// Signature scope, usually the project id
        #[arg(short, long, default_value = "default")]
        scope: String,
    },
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cadence=info,runtime=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            script,
            config,
            debug_tool_results,
            trace,
        } => cmd_replay(&script, config.as_deref(), debug_tool_results, trace).await,
        Commands::Signature {
            tool,
            arguments,
            scope,
        } => cmd_signature(tool, arguments, &scope),
    }
}

async fn cmd_replay(
    script_path: &Path,
    config_path: Option<&Path>,
    debug_tool_results: bool,
    trace: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    config.debug_tool_results |= debug_tool_results;

    let (input, model, tools) = Script::load(script_path)?.into_parts();
    let memory = Arc::new(MemoryTrace::new());
    let orchestrator = Orchestrator::builder(model, tools)
        .config(config)
        .trace(memory.clone())
        .build()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; cancelling turn");
            on_interrupt.cancel();
        }
    });

    let mut sink = SseSink::new(io::stdout());
    let outcome = orchestrator
        .orchestrate_with_cancel(input, &mut sink, &cancel)
        .await?;
    tracing::info!(
        termination = ?outcome.termination,
        cycles = outcome.cycles,
        duplicate_attempts = outcome.duplicate_attempts,
        malformed_attempts = outcome.malformed_attempts,
        "turn complete"
    );

    if trace {
        let mut stderr = io::stderr().lock();
        for event in memory.events() {
            let line = serde_json::to_string(&event).map_err(io::Error::other)?;
            writeln!(stderr, "{line}")?;
        }
    }
    Ok(())
}

fn cmd_signature(tool: String, arguments: String, scope: &str) -> Result<()> {
    let call = AssembledToolCall::new("cli", tool, arguments);
    match signature_for_call(&call, scope) {
        Some(signature) => {
            println!("{signature}");
            Ok(())
        }
        None => Err(Error::MalformedArguments { tool: call.name }),
    }
}

fn load_config(path: Option<&Path>) -> Result<OrchestratorConfig> {
    if let Some(path) = path {
        return Ok(OrchestratorConfig::load(path)?);
    }
    let default_path = Path::new(CONFIG_FILE);
    if default_path.exists() {
        Ok(OrchestratorConfig::load(default_path)?)
    } else {
        Ok(OrchestratorConfig::default())
    }
}

/// Writes each event as an SSE `data:` frame.
struct SseSink<W> {
    out: W,
}

impl<W: Write + Send> SseSink<W> {
    fn new(out: W) -> Self {
        Self { out }
    }

    fn write_frame(&mut self, event: &Event) -> io::Result<()> {
        let json = serde_json::to_string(event).map_err(io::Error::other)?;
        write!(self.out, "data: {json}\n\n")?;
        self.out.flush()
    }
}

impl<W: Write + Send> EventSink for SseSink<W> {
    async fn emit(&mut self, event: Event) -> std::result::Result<(), SinkClosed> {
        self.write_frame(&event).map_err(|e| {
            tracing::debug!(error = %e, "stdout closed");
            SinkClosed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::{EventPayload, Phase};

    #[tokio::test]
    async fn test_sse_frames() {
        let mut sink = SseSink::new(Vec::new());
        let event = Event {
            payload: EventPayload::Chunk {
                chunk: "hi".into(),
            },
            phase: Phase::Action,
            phase_index: 0,
            cycle_index: 0,
        };
        sink.emit(event).await.unwrap();

        let text = String::from_utf8(sink.out).unwrap();
        assert_eq!(
            text,
            "data: {\"chunk\":\"hi\",\"phase\":\"action\",\"phaseIndex\":0,\"cycleIndex\":0}\n\n"
        );
    }

    #[test]
    fn test_signature_is_order_independent() {
        let a = signature_for_call(&AssembledToolCall::new("1", "grep", r#"{"a":1,"b":2}"#), "p");
        let b = signature_for_call(&AssembledToolCall::new("2", "grep", r#"{"b":2,"a":1}"#), "p");
        assert_eq!(a, b);
        assert!(cmd_signature("grep".into(), "not json".into(), "p").is_err());
    }

    #[test]
    fn test_load_config_explicit_path() {
        let dir = std::env::temp_dir().join(format!("cadence-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cadence.toml");
        std::fs::write(&path, "debug_tool_results = true\n[budgets]\nmax_phase_cycles_per_turn = 5\n")
            .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert!(config.debug_tool_results);
        assert_eq!(config.budgets.max_phase_cycles_per_turn, 5);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
