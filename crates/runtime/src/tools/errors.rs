use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during tool execution.
///
/// These never abort a turn; the orchestrator turns them into a failed
/// [`ToolResult`](super::ToolResult) the model can react to.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("timeout after {0}ms")]
    Timeout(u64),
    #[error("execution failed: {0}")]
    Execution(String),
}
