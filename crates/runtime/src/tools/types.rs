//! Tool-related types.

use super::ToolError;
use crate::llm::Mode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool call assembled from stream fragments.
///
/// `arguments` is the raw string the model produced. It is only guaranteed
/// to be valid JSON once the accumulator reports the call as complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl AssembledToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the argument string, if it is valid JSON.
    pub fn parsed_arguments(&self) -> Option<Value> {
        serde_json::from_str(&self.arguments).ok()
    }
}

/// A tool definition exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

/// Per-call context handed to the tool executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub request_id: String,
    pub project_id: String,
    pub mode: Mode,
    /// Number of tool executions already completed in this turn.
    pub cycle_index: u32,
}

/// Outcome of one tool execution, as fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ToolResult {
    /// Create a successful result.
    pub fn success(tool_name: impl Into<String>, result: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            result: Some(result),
            error: None,
            details: None,
        }
    }

    /// Create a failed result from a tool error.
    ///
    /// The serialized error is kept in `details` so the model sees which
    /// kind of failure occurred.
    pub fn failure(tool_name: impl Into<String>, error: &ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            result: None,
            error: Some(error.to_string()),
            details: serde_json::to_value(error).ok(),
        }
    }

    /// Build a result from an executor outcome.
    pub fn from_outcome(tool_name: impl Into<String>, outcome: Result<Value, ToolError>) -> Self {
        match outcome {
            Ok(value) => Self::success(tool_name, value),
            Err(error) => Self::failure(tool_name, &error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_result_constructors() {
        let ok = ToolResult::success("read_file", json!({"content": "hi"}));
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = ToolResult::failure("read_file", &ToolError::NotFound("read_file".into()));
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("tool not found: read_file"));
        assert!(failed.details.is_some());
    }

    #[test]
    fn tool_result_serializes_camel_case() {
        let value = serde_json::to_value(ToolResult::success("grep", json!(3))).unwrap();
        assert_eq!(value, json!({"toolName": "grep", "success": true, "result": 3}));
    }

    #[test]
    fn parsed_arguments_rejects_partial_json() {
        assert!(AssembledToolCall::new("1", "x", "{\"a\":").parsed_arguments().is_none());
        assert_eq!(
            AssembledToolCall::new("1", "x", "{\"a\":1}").parsed_arguments(),
            Some(json!({"a": 1}))
        );
    }
}
