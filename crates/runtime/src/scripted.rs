//! Deterministic collaborators.
//!
//! [`ScriptedModel`] plays back pre-recorded stream bursts, one per model
//! call, and [`ScriptedTools`] answers tool calls from a queue. Both record
//! what they were asked so callers can inspect a finished turn. They back the
//! integration tests and the CLI `replay` command.

use crate::llm::{
    DeltaStream, Message, ModelError, ModelRequest, ModelStream, RequestContext, StreamDelta,
};
use crate::tools::{AssembledToolCall, ToolContext, ToolError, ToolExecutor, ToolSpec};
use futures::StreamExt;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Step {
    Stream(Vec<Result<StreamDelta, ModelError>>),
    Fail(ModelError),
}

/// A model request as seen by [`ScriptedModel`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub context: RequestContext,
}

/// Plays back one scripted burst per model call.
#[derive(Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delivered: Arc<AtomicUsize>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a burst of deltas for the next model call.
    pub fn burst(self, deltas: impl IntoIterator<Item = StreamDelta>) -> Self {
        self.burst_items(deltas.into_iter().map(Ok))
    }

    /// Queue a burst that may contain transport errors.
    pub fn burst_items(
        self,
        items: impl IntoIterator<Item = Result<StreamDelta, ModelError>>,
    ) -> Self {
        lock(&self.steps).push_back(Step::Stream(items.into_iter().collect()));
        self
    }

    /// Make the next model call fail before any delta is produced.
    pub fn fail(self, error: ModelError) -> Self {
        lock(&self.steps).push_back(Step::Fail(error));
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Stream items actually pulled by the consumer, across all bursts.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Bursts not yet played.
    pub fn remaining(&self) -> usize {
        lock(&self.steps).len()
    }
}

impl ModelStream for ScriptedModel {
    async fn stream(&self, request: ModelRequest<'_>) -> Result<DeltaStream, ModelError> {
        lock(&self.requests).push(RecordedRequest {
            messages: request.messages.to_vec(),
            tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            context: request.context.clone(),
        });

        let step = lock(&self.steps).pop_front();
        match step {
            Some(Step::Stream(items)) => {
                let delivered = Arc::clone(&self.delivered);
                Ok(futures::stream::iter(items)
                    .inspect(move |_| {
                        delivered.fetch_add(1, Ordering::SeqCst);
                    })
                    .boxed())
            }
            Some(Step::Fail(error)) => Err(error),
            None => Err(ModelError::Open(
                "no scripted response left".into(),
            )),
        }
    }
}

/// Answers tool calls from per-tool queues.
///
/// A registered tool with an empty queue echoes its arguments back. Calls to
/// unregistered tools fail with [`ToolError::NotFound`].
#[derive(Default)]
pub struct ScriptedTools {
    specs: Vec<ToolSpec>,
    responses: Mutex<HashMap<String, VecDeque<Result<Value, ToolError>>>>,
    executed: Mutex<Vec<AssembledToolCall>>,
}

impl ScriptedTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool that accepts any object.
    pub fn tool(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.specs.push(ToolSpec {
            name: name.into(),
            description: description.into(),
            schema: json!({ "type": "object" }),
        });
        self
    }

    /// Queue the next response for `name`.
    pub fn respond(self, name: impl Into<String>, response: Result<Value, ToolError>) -> Self {
        lock(&self.responses)
            .entry(name.into())
            .or_default()
            .push_back(response);
        self
    }

    /// Calls executed so far, in order.
    pub fn executed(&self) -> Vec<AssembledToolCall> {
        lock(&self.executed).clone()
    }
}

impl ToolExecutor for ScriptedTools {
    fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    async fn execute(
        &self,
        call: &AssembledToolCall,
        _context: &ToolContext,
    ) -> Result<Value, ToolError> {
        lock(&self.executed).push(call.clone());

        if !self.specs.iter().any(|spec| spec.name == call.name) {
            return Err(ToolError::NotFound(call.name.clone()));
        }
        let queued = lock(&self.responses)
            .get_mut(&call.name)
            .and_then(VecDeque::pop_front);
        match queued {
            Some(response) => response,
            None => Ok(json!({
                "tool": call.name,
                "arguments": call.parsed_arguments().unwrap_or(Value::Null),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Mode;

    fn context() -> RequestContext {
        RequestContext {
            request_id: "r".into(),
            project_id: "p".into(),
            mode: Mode::Act,
        }
    }

    #[tokio::test]
    async fn model_plays_bursts_in_order() {
        let model = ScriptedModel::new()
            .burst([StreamDelta::content("one"), StreamDelta::done()])
            .burst([StreamDelta::content("two")]);
        let ctx = context();
        let request = ModelRequest {
            messages: &[],
            tools: &[],
            temperature: 0.0,
            max_tokens: 10,
            context: &ctx,
        };

        let first: Vec<_> = model.stream(request.clone()).await.unwrap().collect().await;
        assert_eq!(first.len(), 2);
        assert_eq!(model.remaining(), 1);
        assert_eq!(model.delivered(), 2);

        let _ = model.stream(request.clone()).await.unwrap();
        assert!(model.stream(request).await.is_err());
        assert_eq!(model.requests().len(), 3);
    }

    #[tokio::test]
    async fn tools_echo_queue_and_reject_unknown() {
        let tools = ScriptedTools::new()
            .tool("read_file", "Read a file")
            .respond("read_file", Err(ToolError::Execution("boom".into())));
        let ctx = ToolContext {
            request_id: "r".into(),
            project_id: "p".into(),
            mode: Mode::Act,
            cycle_index: 0,
        };
        let call = AssembledToolCall::new("c1", "read_file", r#"{"path":"a"}"#);

        assert!(tools.execute(&call, &ctx).await.is_err());
        let echoed = tools.execute(&call, &ctx).await.unwrap();
        assert_eq!(echoed["arguments"]["path"], "a");

        let unknown = AssembledToolCall::new("c2", "rm", "{}");
        assert!(matches!(
            tools.execute(&unknown, &ctx).await,
            Err(ToolError::NotFound(_))
        ));
        assert_eq!(tools.executed().len(), 3);
    }
}
