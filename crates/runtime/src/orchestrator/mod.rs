//! The turn state machine.
//!
//! A turn alternates between action phases, where the model streams text and
//! may propose tool calls, and tool phases, where at most one proposed call is
//! executed, refused as a duplicate, or rejected as malformed. Budgets on tool
//! executions, duplicate attempts and malformed calls guarantee the turn ends,
//! and it always ends with exactly one `done` event on the sink.
//!
//! ```text
//!            complete call                 budget left
//!   ACTION ───────────────▶ TOOL ──────────────────────▶ ACTION
//!     │                      │
//!     │ stream ends          │ cycle / malformed budget: one forced ACTION, then DONE
//!     ▼                      │ duplicate budget: DONE with empty content
//!    DONE ◀──────────────────┘
//! ```

mod action;
mod notices;
mod state;
mod tool;

use crate::config::OrchestratorConfig;
use crate::event::{EventPayload, EventSink};
use crate::llm::{Message, Mode, ModelStream};
use crate::tools::ToolExecutor;
use crate::trace::{TraceEvent, TraceKind, TraceSink};
use crate::{Error, Result};
use action::{ActionKind, ActionOutcome};
use serde::{Deserialize, Serialize};
use state::TurnState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tool::ToolPhaseOutcome;
use tracing::Instrument;

/// Input for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnInput {
    pub content: String,
    #[serde(default)]
    pub mode: Mode,
    pub request_id: String,
    pub project_id: String,
}

impl TurnInput {
    /// Create an input in act mode with a fresh request id.
    pub fn new(content: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mode: Mode::Act,
            request_id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

/// How a turn reached `done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The model finished on its own.
    Completed,
    /// The tool execution budget ran out and a final answer was forced.
    CycleBudget,
    /// Too many duplicate requests; ended with empty content.
    DuplicateBudget,
    /// Too many malformed calls and a final answer was forced.
    MalformedBudget,
}

/// Result of a finished turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub final_content: String,
    pub termination: Termination,
    /// Tool executions completed.
    pub cycles: u32,
    pub duplicate_attempts: u32,
    pub malformed_attempts: u32,
    /// Phases entered, action and tool alike.
    pub phases: u32,
}

/// Builder for an [`Orchestrator`].
pub struct OrchestratorBuilder<M, T> {
    model: M,
    tools: T,
    config: OrchestratorConfig,
    trace: Option<Arc<dyn TraceSink>>,
}

impl<M, T> OrchestratorBuilder<M, T>
where
    M: ModelStream,
    T: ToolExecutor,
{
    pub fn new(model: M, tools: T) -> Self {
        Self {
            model,
            tools,
            config: OrchestratorConfig::default(),
            trace: None,
        }
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Report tool activity to `trace`.
    pub fn trace(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Build the orchestrator, validating the configuration.
    pub fn build(self) -> Result<Orchestrator<M, T>> {
        self.config.validate()?;
        Ok(Orchestrator {
            model: self.model,
            tools: self.tools,
            config: self.config,
            trace: self.trace,
        })
    }
}

/// Drives turns against a model stream and a tool executor.
///
/// Holds no per-turn state; one instance can serve many concurrent turns.
pub struct Orchestrator<M, T> {
    model: M,
    tools: T,
    config: OrchestratorConfig,
    trace: Option<Arc<dyn TraceSink>>,
}

impl<M, T> Orchestrator<M, T>
where
    M: ModelStream,
    T: ToolExecutor,
{
    /// Create a builder.
    pub fn builder(model: M, tools: T) -> OrchestratorBuilder<M, T> {
        OrchestratorBuilder::new(model, tools)
    }

    /// Create an orchestrator with the default configuration.
    pub fn new(model: M, tools: T) -> Self {
        Self {
            model,
            tools,
            config: OrchestratorConfig::default(),
            trace: None,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    /// Run one turn to completion.
    ///
    /// Returns after exactly one `done` event has been emitted, or with the
    /// error that aborted the turn.
    pub async fn orchestrate<S: EventSink>(
        &self,
        input: TurnInput,
        sink: &mut S,
    ) -> Result<TurnOutcome> {
        self.orchestrate_with_cancel(input, sink, &CancellationToken::new())
            .await
    }

    /// Run one turn, stopping early once `cancel` fires.
    ///
    /// Cancellation interrupts model streaming and is checked between phases.
    /// A tool execution that has already started is always awaited.
    pub async fn orchestrate_with_cancel<S: EventSink>(
        &self,
        input: TurnInput,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let span = tracing::info_span!(
            "turn",
            request_id = %input.request_id,
            project_id = %input.project_id,
            mode = %input.mode,
        );
        self.run_turn(input, sink, cancel).instrument(span).await
    }

    async fn run_turn<S: EventSink>(
        &self,
        input: TurnInput,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let budgets = &self.config.budgets;
        let mut state = TurnState::new(input, self.config.system_prompt.as_deref());

        let termination = loop {
            ensure_live(cancel, &*sink)?;
            let (calls, content) = match self
                .action_phase(&mut state, sink, cancel, ActionKind::Normal)
                .await?
            {
                ActionOutcome::Finished { content } => {
                    state.final_content = content;
                    break Termination::Completed;
                }
                ActionOutcome::ToolCalls { calls, content } => (calls, content),
            };

            let acted = calls.len().min(budgets.max_tools_per_action_phase);
            state
                .messages
                .push(Message::assistant(notices::tool_request(&content, &calls[..acted])));

            ensure_live(cancel, &*sink)?;
            match self.tool_phase(&mut state, sink, calls).await? {
                ToolPhaseOutcome::Continue
                    if state.cycle_index >= budgets.max_phase_cycles_per_turn =>
                {
                    tracing::info!(
                        cycles = state.cycle_index,
                        "tool budget exhausted; forcing final answer"
                    );
                    state.final_content = self
                        .final_answer(&mut state, sink, cancel, notices::CYCLE_BUDGET_FINAL_ANSWER)
                        .await?;
                    break Termination::CycleBudget;
                }
                ToolPhaseOutcome::Continue => {}
                ToolPhaseOutcome::DuplicateBudgetExceeded => {
                    tracing::info!(
                        duplicate_attempts = state.duplicate_attempt_count,
                        "duplicate budget exceeded; ending turn"
                    );
                    state.final_content = String::new();
                    break Termination::DuplicateBudget;
                }
                ToolPhaseOutcome::MalformedBudgetExceeded => {
                    tracing::info!(
                        malformed_attempts = state.malformed_attempt_count,
                        "malformed budget exceeded; forcing final answer"
                    );
                    state.final_content = self
                        .final_answer(
                            &mut state,
                            sink,
                            cancel,
                            notices::MALFORMED_BUDGET_FINAL_ANSWER,
                        )
                        .await?;
                    break Termination::MalformedBudget;
                }
            }
        };

        self.finish(&mut state, sink).await?;
        tracing::debug!(
            ?termination,
            cycles = state.cycle_index,
            phases = state.phases(),
            "turn finished"
        );

        let phases = state.phases();
        Ok(TurnOutcome {
            final_content: state.final_content,
            termination,
            cycles: state.cycle_index,
            duplicate_attempts: state.duplicate_attempt_count,
            malformed_attempts: state.malformed_attempt_count,
            phases,
        })
    }

    /// One more action phase with tools withheld; its text becomes the answer.
    async fn final_answer<S: EventSink>(
        &self,
        state: &mut TurnState,
        sink: &mut S,
        cancel: &CancellationToken,
        instruction: &str,
    ) -> Result<String> {
        ensure_live(cancel, &*sink)?;
        state.messages.push(Message::system(instruction));
        match self
            .action_phase(state, sink, cancel, ActionKind::FinalAnswer)
            .await?
        {
            ActionOutcome::Finished { content } | ActionOutcome::ToolCalls { content, .. } => {
                Ok(content)
            }
        }
    }

    async fn finish<S: EventSink>(&self, state: &mut TurnState, sink: &mut S) -> Result<()> {
        debug_assert!(!state.done_emitted, "done emitted twice");
        let event = state.event(EventPayload::Done {
            done: true,
            full_content: state.final_content.clone(),
        });
        state.done_emitted = true;
        emit(sink, event).await
    }

    fn record_trace(&self, state: &TurnState, kind: TraceKind) {
        let Some(trace) = &self.trace else {
            return;
        };
        let event = TraceEvent::new(
            state.context.request_id.as_str(),
            state.context.project_id.as_str(),
            kind,
        );
        if let Err(error) = trace.record(&event) {
            tracing::warn!(%error, "trace sink failed; continuing turn");
        }
    }
}

async fn emit<S: EventSink>(sink: &mut S, event: crate::event::Event) -> Result<()> {
    sink.emit(event).await.map_err(|_| {
        tracing::warn!("event sink closed; abandoning turn");
        Error::SinkClosed
    })
}

/// Gate before starting a phase: the turn must not be cancelled and the
/// consumer must still be listening.
fn ensure_live<S: EventSink>(cancel: &CancellationToken, sink: &S) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    if sink.is_closed() {
        tracing::warn!("event sink closed; not starting another phase");
        return Err(Error::SinkClosed);
    }
    Ok(())
}
