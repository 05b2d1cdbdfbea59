//! Tool executor trait.

use crate::tools::{AssembledToolCall, ToolContext, ToolError, ToolSpec};
use serde_json::Value;
use std::future::Future;

/// Trait for tool execution hosts.
///
/// Implementations provide tool specifications and execute tool calls.
/// This is the boundary between the turn loop and side effects: once
/// `execute` has been awaited it is always driven to completion.
pub trait ToolExecutor: Send + Sync {
    /// Get available tool specifications.
    fn specs(&self) -> &[ToolSpec];

    /// Execute a tool call.
    fn execute(
        &self,
        call: &AssembledToolCall,
        context: &ToolContext,
    ) -> impl Future<Output = Result<Value, ToolError>> + Send;
}
