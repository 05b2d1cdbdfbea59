//! Tool phase: execute, refuse or reject the proposed call.

use super::state::TurnState;
use super::{Orchestrator, emit, notices};
use crate::event::{EventPayload, EventSink, Phase};
use crate::llm::{Message, ModelStream};
use crate::signature::signature_for_call;
use crate::tools::{AssembledToolCall, ToolContext, ToolExecutor, ToolResult};
use crate::trace::TraceKind;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ToolPhaseOutcome {
    /// Go back to the action phase.
    Continue,
    DuplicateBudgetExceeded,
    MalformedBudgetExceeded,
}

impl<M, T> Orchestrator<M, T>
where
    M: ModelStream,
    T: ToolExecutor,
{
    pub(super) async fn tool_phase<S: EventSink>(
        &self,
        state: &mut TurnState,
        sink: &mut S,
        calls: Vec<AssembledToolCall>,
    ) -> Result<ToolPhaseOutcome> {
        let budgets = &self.config.budgets;
        state.begin_phase(Phase::Tool);

        if calls.len() > budgets.max_tools_per_action_phase {
            tracing::debug!(
                proposed = calls.len(),
                acted = budgets.max_tools_per_action_phase,
                "dropping extra tool calls from burst"
            );
        }

        for call in calls.into_iter().take(budgets.max_tools_per_action_phase) {
            if state.cycle_index >= budgets.max_phase_cycles_per_turn {
                break;
            }

            let Some(signature) = signature_for_call(&call, &state.context.project_id) else {
                state.malformed_attempt_count += 1;
                tracing::debug!(
                    tool = %call.name,
                    malformed_attempts = state.malformed_attempt_count,
                    "malformed tool call rejected"
                );
                state.messages.push(Message::system(notices::malformed(&call)));
                if state.malformed_attempt_count > budgets.max_malformed_attempts_per_turn {
                    return Ok(ToolPhaseOutcome::MalformedBudgetExceeded);
                }
                continue;
            };

            if state.blocked_signatures.contains(&signature) {
                state.duplicate_attempt_count += 1;
                tracing::debug!(
                    tool = %call.name,
                    duplicate_attempts = state.duplicate_attempt_count,
                    "duplicate tool call refused"
                );
                if state.duplicate_attempt_count > budgets.max_duplicate_attempts_per_turn {
                    return Ok(ToolPhaseOutcome::DuplicateBudgetExceeded);
                }
                state.messages.push(Message::system(notices::duplicate(&call)));
                continue;
            }

            let result = self.execute(state, &call, &signature).await;
            state.blocked_signatures.insert(signature);
            state
                .messages
                .push(Message::system(notices::tool_result_block(&call, &result)));
            state.cycle_index += 1;

            if self.config.debug_tool_results {
                emit(
                    sink,
                    state.event(EventPayload::ToolResult {
                        tool_result: result,
                    }),
                )
                .await?;
            }
        }

        Ok(ToolPhaseOutcome::Continue)
    }

    /// Run one call through the executor. Failures become a failed result.
    async fn execute(
        &self,
        state: &TurnState,
        call: &AssembledToolCall,
        signature: &str,
    ) -> ToolResult {
        self.record_trace(
            state,
            TraceKind::ToolCall {
                call_id: call.id.clone(),
                name: call.name.clone(),
                arguments: call.arguments.clone(),
                signature: signature.to_string(),
            },
        );

        let context = ToolContext {
            request_id: state.context.request_id.clone(),
            project_id: state.context.project_id.clone(),
            mode: state.context.mode,
            cycle_index: state.cycle_index,
        };
        tracing::info!(tool = %call.name, call_id = %call.id, "executing tool");
        let outcome = self.tools.execute(call, &context).await;
        if let Err(error) = &outcome {
            tracing::warn!(tool = %call.name, %error, "tool execution failed");
        }
        let result = ToolResult::from_outcome(call.name.as_str(), outcome);

        let output = if result.success {
            result.result.clone().unwrap_or_default()
        } else {
            serde_json::json!({ "error": result.error, "details": result.details })
        };
        self.record_trace(
            state,
            TraceKind::ToolResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                success: result.success,
                output,
            },
        );
        result
    }
}
