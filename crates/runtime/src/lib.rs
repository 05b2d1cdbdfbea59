//! Cadence runtime: the tool-call turn orchestrator.
//!
//! This crate drives a single user turn between a streaming language model
//! and an external tool executor. It assembles streamed tool-call fragments,
//! deduplicates repeated calls, enforces per-turn budgets, and guarantees the
//! caller sees exactly one terminal `done` event per turn.
//!
//! # Overview
//!
//! - **Orchestrator**: the turn state machine alternating action phases
//!   (model streaming) and tool phases (one tool execution).
//! - **ToolCallAccumulator**: merges fragmentary tool-call data into complete
//!   calls, whether the provider streams deltas or cumulative strings.
//! - **Signatures**: order-independent identities used to refuse duplicate
//!   calls within a turn.
//! - **ModelStream** / **ToolExecutor** / **EventSink** / **TraceSink**: the
//!   collaborator seams; vendor protocols, tool implementations, transport and
//!   storage all live behind them.
//!
//! # Example
//!
//! ```no_run
//! use runtime::scripted::{ScriptedModel, ScriptedTools};
//! use runtime::{Event, Orchestrator, StreamDelta, TurnInput};
//!
//! # async fn example() -> runtime::Result<()> {
//! let model = ScriptedModel::new().burst([
//!     StreamDelta::content("Hello!"),
//!     StreamDelta::done(),
//! ]);
//! let orchestrator = Orchestrator::new(model, ScriptedTools::new());
//!
//! let mut events: Vec<Event> = Vec::new();
//! let outcome = orchestrator
//!     .orchestrate(TurnInput::new("Say hello", "project-1"), &mut events)
//!     .await?;
//! assert_eq!(outcome.final_content, "Hello!");
//! # Ok(())
//! # }
//! ```

pub mod accumulator;
pub mod config;
mod error;
pub mod event;
pub mod llm;
mod orchestrator;
pub mod scripted;
pub mod signature;
pub mod tools;
pub mod trace;

// Stream assembly and dedup
pub use accumulator::{ToolCallAccumulator, find_first_complete};
pub use signature::{build_signature, signature_for_call};

// Configuration
pub use config::{Budgets, ConfigError, OrchestratorConfig};

// Error types
pub use error::{Error, Result};

// Events delivered to the caller
pub use event::{Event, EventPayload, EventSink, Phase, SinkClosed};

// Model stream protocol
pub use llm::{
    DeltaStream, Message, Mode, ModelError, ModelRequest, ModelStream, RequestContext, Role,
    StreamDelta, ToolCallFragment,
};

// Turn orchestration
pub use orchestrator::{
    Orchestrator, OrchestratorBuilder, Termination, TurnInput, TurnOutcome,
};

// Tool boundary
pub use tools::{AssembledToolCall, ToolContext, ToolError, ToolExecutor, ToolResult, ToolSpec};

// Tracing of tool activity
pub use trace::{MemoryTrace, TraceError, TraceEvent, TraceKind, TraceSink};
