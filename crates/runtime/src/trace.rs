//! Trace emission for tool activity.
//!
//! The orchestrator reports every executed tool call and its result to an
//! optional [`TraceSink`]. Storage of those records is up to the sink; a
//! failing sink is logged and otherwise ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceKind {
    /// A tool was invoked.
    ToolCall {
        call_id: String,
        name: String,
        arguments: String,
        signature: String,
    },
    /// A tool returned.
    ToolResult {
        call_id: String,
        name: String,
        success: bool,
        output: serde_json::Value,
    },
}

/// A trace record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub id: Uuid,
    pub request_id: String,
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: TraceKind,
}

impl TraceEvent {
    pub fn new(request_id: impl Into<String>, project_id: impl Into<String>, kind: TraceKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id: request_id.into(),
            project_id: project_id.into(),
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[derive(Debug, Error)]
#[error("trace sink failed: {0}")]
pub struct TraceError(pub String);

/// Receives trace records.
pub trait TraceSink: Send + Sync {
    fn record(&self, event: &TraceEvent) -> Result<(), TraceError>;
}

/// Keeps trace records in memory.
#[derive(Debug, Default)]
pub struct MemoryTrace {
    events: Mutex<Vec<TraceEvent>>,
}

impl MemoryTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records so far, in order.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl TraceSink for MemoryTrace {
    fn record(&self, event: &TraceEvent) -> Result<(), TraceError> {
        self.events
            .lock()
            .map_err(|e| TraceError(e.to_string()))?
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_trace_keeps_order() {
        let trace = MemoryTrace::new();
        for name in ["a", "b"] {
            trace
                .record(&TraceEvent::new(
                    "r1",
                    "p1",
                    TraceKind::ToolCall {
                        call_id: name.into(),
                        name: name.into(),
                        arguments: "{}".into(),
                        signature: "sig".into(),
                    },
                ))
                .unwrap();
        }
        let events = trace.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1].kind, TraceKind::ToolCall { name, .. } if name == "b"));
        assert_ne!(events[0].id, events[1].id);
    }

    #[test]
    fn trace_kind_json_tag() {
        let kind = TraceKind::ToolResult {
            call_id: "c1".into(),
            name: "grep".into(),
            success: false,
            output: serde_json::json!({"error": "boom"}),
        };
        let value = serde_json::to_value(&kind).unwrap();
        assert_eq!(value["kind"], "tool_result");
    }
}
