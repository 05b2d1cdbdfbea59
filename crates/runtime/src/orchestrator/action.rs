//! Action phase: consume one model stream.

use super::state::TurnState;
use super::{Orchestrator, emit};
use crate::accumulator::{ToolCallAccumulator, find_first_complete};
use crate::event::{EventPayload, EventSink, Phase};
use crate::llm::{ModelRequest, ModelStream, StreamDelta};
use crate::tools::{AssembledToolCall, ToolExecutor, ToolSpec};
use crate::{Error, Result};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ActionKind {
    Normal,
    /// Tools are withheld and any proposed calls are discarded.
    FinalAnswer,
}

#[derive(Debug)]
pub(super) enum ActionOutcome {
    /// The model finished without a usable tool call.
    Finished { content: String },
    /// The model proposed tool calls. `content` is the text streamed before
    /// the first call completed.
    ToolCalls {
        calls: Vec<AssembledToolCall>,
        content: String,
    },
}

impl<M, T> Orchestrator<M, T>
where
    M: ModelStream,
    T: ToolExecutor,
{
    pub(super) async fn action_phase<S: EventSink>(
        &self,
        state: &mut TurnState,
        sink: &mut S,
        cancel: &CancellationToken,
        kind: ActionKind,
    ) -> Result<ActionOutcome> {
        state.begin_phase(Phase::Action);
        tracing::debug!(
            phase_index = state.phase_index,
            cycle_index = state.cycle_index,
            ?kind,
            "action phase started"
        );

        let tools: &[ToolSpec] = match kind {
            ActionKind::Normal => self.tools.specs(),
            ActionKind::FinalAnswer => &[],
        };
        let request = ModelRequest {
            messages: &state.messages,
            tools,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            context: &state.context,
        };
        let mut stream = self.model.stream(request).await?;

        let mut accumulator = ToolCallAccumulator::new();
        let mut streamed = String::new();
        // Set once the model announces completion; later chunks still land here.
        let mut terminal: Option<String> = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                next = stream.next() => next,
            };
            let Some(delta) = next else {
                break;
            };

            match delta? {
                StreamDelta::Content { text } => {
                    if text.is_empty() {
                        continue;
                    }
                    match terminal.as_mut() {
                        Some(content) => content.push_str(&text),
                        None => streamed.push_str(&text),
                    }
                    emit(sink, state.event(EventPayload::Chunk { chunk: text })).await?;
                }
                StreamDelta::ToolCalls { fragments } => {
                    if kind == ActionKind::FinalAnswer || terminal.is_some() {
                        tracing::debug!(
                            fragments = fragments.len(),
                            "ignoring tool call fragments"
                        );
                        continue;
                    }
                    accumulator.merge_fragments(&fragments);
                    let snapshot = accumulator.snapshot();
                    let first = find_first_complete(&snapshot).map(|call| call.name.clone());
                    emit(
                        sink,
                        state.event(EventPayload::ToolCalls {
                            tool_calls: snapshot,
                        }),
                    )
                    .await?;

                    if let Some(tool) = first {
                        // Whatever the model streams after this point is
                        // discarded; dropping the stream releases the transport
                        // without draining it.
                        drop(stream);
                        let calls = accumulator.complete();
                        tracing::debug!(
                            %tool,
                            calls = calls.len(),
                            "complete tool call detected; leaving action phase"
                        );
                        return Ok(ActionOutcome::ToolCalls {
                            calls,
                            content: streamed,
                        });
                    }
                }
                StreamDelta::Done { content } => {
                    if terminal.is_none() {
                        terminal = Some(content.unwrap_or_else(|| streamed.clone()));
                    }
                }
            }
        }

        if kind == ActionKind::Normal {
            let pending = accumulator.pending();
            if !pending.is_empty() {
                tracing::debug!(
                    calls = pending.len(),
                    "stream ended with incomplete tool calls"
                );
                return Ok(ActionOutcome::ToolCalls {
                    calls: pending,
                    content: streamed,
                });
            }
        }

        Ok(ActionOutcome::Finished {
            content: terminal.unwrap_or(streamed),
        })
    }
}
