//! Tool calls, results and the executor boundary.

pub mod errors;
mod executor;
mod types;

pub use errors::ToolError;
pub use executor::ToolExecutor;
pub use types::{AssembledToolCall, ToolContext, ToolResult, ToolSpec};
