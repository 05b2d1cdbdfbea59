//! Text injected into the turn history.

use crate::tools::{AssembledToolCall, ToolResult};
use serde_json::Value;
use std::fmt::Write;

pub(crate) const CYCLE_BUDGET_FINAL_ANSWER: &str = "[SYSTEM NOTICE] The tool budget for this turn is exhausted. \
Do not call any more tools. Using only the information already gathered, give your final answer now.";

pub(crate) const MALFORMED_BUDGET_FINAL_ANSWER: &str = "[SYSTEM NOTICE] Too many malformed tool calls in this turn. \
Do not call any more tools. Answer the user directly with what you know now.";

/// Assistant message recording the text and calls of an action phase.
pub(crate) fn tool_request(content: &str, calls: &[AssembledToolCall]) -> String {
    let mut out = String::from(content);
    for call in calls {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "[TOOL CALL] {} {}", call.name, call.arguments);
    }
    out
}

pub(crate) fn malformed(call: &AssembledToolCall) -> String {
    format!(
        "[SYSTEM NOTICE] Tool call malformed: the arguments for `{}` (id {}) are not a valid JSON object, \
so it was not executed. Continue reasoning and issue a corrected call if a tool is still needed.",
        call.name, call.id
    )
}

pub(crate) fn duplicate(call: &AssembledToolCall) -> String {
    format!(
        "[DUPLICATE TOOL CALL BLOCKED] `{}` was already executed in this turn with the same arguments \
and will not run again. Reuse the earlier result shown above and continue.",
        call.name
    )
}

/// Delimited block carrying a tool result back to the model.
pub(crate) fn tool_result_block(call: &AssembledToolCall, result: &ToolResult) -> String {
    let status = if result.success { "success" } else { "error" };
    let mut out = format!(
        "[TOOL RESULT BEGIN] tool={} id={} status={status}\n",
        call.name, call.id
    );
    if result.success {
        out.push_str(&render(result.result.as_ref().unwrap_or(&Value::Null)));
    } else {
        let _ = write!(out, "error: {}", result.error.as_deref().unwrap_or("unknown error"));
        if let Some(details) = &result.details {
            let _ = write!(out, "\ndetails: {}", render(details));
        }
    }
    out.push_str("\n[TOOL RESULT END]");
    out
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use serde_json::json;

    #[test]
    fn success_block_is_delimited() {
        let call = AssembledToolCall::new("c1", "read_file", r#"{"path":"a.txt"}"#);
        let block = tool_result_block(&call, &ToolResult::success("read_file", json!("hello")));
        assert!(block.starts_with("[TOOL RESULT BEGIN] tool=read_file id=c1 status=success\n"));
        assert!(block.contains("\nhello\n"));
        assert!(block.ends_with("[TOOL RESULT END]"));
    }

    #[test]
    fn error_block_carries_details() {
        let call = AssembledToolCall::new("c1", "read_file", "{}");
        let result = ToolResult::failure("read_file", &ToolError::Execution("disk on fire".into()));
        let block = tool_result_block(&call, &result);
        assert!(block.contains("status=error"));
        assert!(block.contains("error: execution failed: disk on fire"));
        assert!(block.contains("details:"));
    }

    #[test]
    fn tool_request_lists_calls_after_text() {
        let calls = [AssembledToolCall::new("c1", "grep", r#"{"q":"x"}"#)];
        assert_eq!(
            tool_request("Looking.", &calls),
            "Looking.\n[TOOL CALL] grep {\"q\":\"x\"}"
        );
        assert_eq!(tool_request("", &calls), "[TOOL CALL] grep {\"q\":\"x\"}");
    }
}
