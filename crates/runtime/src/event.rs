//! Events emitted to the caller during a turn.
//!
//! Every event carries the phase it was produced in plus the turn's
//! `phase_index` and `cycle_index` at that moment. The sequence delivered to
//! a sink is totally ordered and ends with exactly one [`EventPayload::Done`].

use crate::tools::{AssembledToolCall, ToolResult};
use serde::Serialize;
use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;

/// Which kind of phase produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Action,
    Tool,
}

/// What an event says.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// Streamed assistant text.
    Chunk { chunk: String },
    /// Running merged set of tool calls in the current burst.
    #[serde(rename_all = "camelCase")]
    ToolCalls { tool_calls: Vec<AssembledToolCall> },
    /// Tool result, only emitted when debug output is enabled.
    #[serde(rename_all = "camelCase")]
    ToolResult { tool_result: ToolResult },
    /// Terminal event. `done` is always `true`.
    #[serde(rename_all = "camelCase")]
    Done { done: bool, full_content: String },
}

/// A tagged event with its position in the turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub phase: Phase,
    pub phase_index: u32,
    pub cycle_index: u32,
}

impl Event {
    pub fn is_done(&self) -> bool {
        matches!(self.payload, EventPayload::Done { .. })
    }
}

/// The receiving end of a sink went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event sink closed")]
pub struct SinkClosed;

/// Receives the orchestrator's events, e.g. for SSE forwarding.
pub trait EventSink: Send {
    /// Deliver one event. An error means the consumer is gone.
    fn emit(&mut self, event: Event) -> impl Future<Output = Result<(), SinkClosed>> + Send;

    /// Whether the consumer is known to be gone. Checked before each phase.
    fn is_closed(&self) -> bool {
        false
    }
}

impl EventSink for Vec<Event> {
    async fn emit(&mut self, event: Event) -> Result<(), SinkClosed> {
        self.push(event);
        Ok(())
    }
}

impl EventSink for mpsc::Sender<Event> {
    async fn emit(&mut self, event: Event) -> Result<(), SinkClosed> {
        self.send(event).await.map_err(|_| SinkClosed)
    }

    fn is_closed(&self) -> bool {
        mpsc::Sender::is_closed(self)
    }
}

impl EventSink for mpsc::UnboundedSender<Event> {
    async fn emit(&mut self, event: Event) -> Result<(), SinkClosed> {
        self.send(event).map_err(|_| SinkClosed)
    }

    fn is_closed(&self) -> bool {
        mpsc::UnboundedSender::is_closed(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(payload: EventPayload) -> Event {
        Event {
            payload,
            phase: Phase::Action,
            phase_index: 2,
            cycle_index: 1,
        }
    }

    #[test]
    fn chunk_json_shape() {
        let value = serde_json::to_value(at(EventPayload::Chunk { chunk: "hi".into() })).unwrap();
        assert_eq!(
            value,
            json!({"chunk": "hi", "phase": "action", "phaseIndex": 2, "cycleIndex": 1})
        );
    }

    #[test]
    fn done_json_shape() {
        let event = at(EventPayload::Done {
            done: true,
            full_content: "answer".into(),
        });
        assert!(event.is_done());
        let value = serde_json::to_value(event).unwrap();
        assert_eq!(value["done"], json!(true));
        assert_eq!(value["fullContent"], json!("answer"));
    }

    #[test]
    fn tool_calls_json_shape() {
        let event = at(EventPayload::ToolCalls {
            tool_calls: vec![AssembledToolCall::new("c1", "read_file", "{}")],
        });
        let value = serde_json::to_value(event).unwrap();
        assert_eq!(
            value["toolCalls"],
            json!([{"id": "c1", "name": "read_file", "arguments": "{}"}])
        );
    }

    #[tokio::test]
    async fn closed_channel_reports_sink_closed() {
        let (mut tx, rx) = mpsc::channel::<Event>(1);
        drop(rx);
        let result = tx.emit(at(EventPayload::Chunk { chunk: "x".into() })).await;
        assert_eq!(result, Err(SinkClosed));
    }

    #[test]
    fn dropped_receiver_marks_sink_closed() {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();
        assert!(!EventSink::is_closed(&tx));
        drop(rx);
        assert!(EventSink::is_closed(&tx));
        assert!(!EventSink::is_closed(&Vec::<Event>::new()));
    }
}
