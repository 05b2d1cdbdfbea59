//! Core model-stream types (provider-agnostic).
//!
//! These types describe what the orchestrator sends to a streaming model and
//! the deltas it expects back. Vendor wire formats belong in adapters that
//! live outside this crate.

use super::errors::ModelError;
use crate::tools::ToolSpec;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in the turn history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a message with a role and text content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Whether the turn is planning or acting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Plan,
    #[default]
    Act,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan => f.write_str("plan"),
            Self::Act => f.write_str("act"),
        }
    }
}

/// Identifies the turn a request belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub request_id: String,
    pub project_id: String,
    pub mode: Mode,
}

/// Everything needed for one streaming model call.
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub messages: &'a [Message],
    /// Tools the model may call. Empty when tool use is disallowed.
    pub tools: &'a [ToolSpec],
    pub temperature: f32,
    pub max_tokens: u32,
    pub context: &'a RequestContext,
}

/// Partial tool-call data as it arrives from the stream.
///
/// Adapters differ: some send an `index` before the `id` is known, some send
/// argument deltas and some resend the cumulative argument string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallFragment {
    /// Position of the call within the current burst.
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// One item of a model stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamDelta {
    /// A chunk of assistant text.
    Content { text: String },
    /// One or more tool-call fragments.
    ToolCalls { fragments: Vec<ToolCallFragment> },
    /// The model announced completion. `content`, when present, is the
    /// provider's view of the full response text.
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

impl StreamDelta {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }

    pub fn done() -> Self {
        Self::Done { content: None }
    }

    pub fn done_with(content: impl Into<String>) -> Self {
        Self::Done {
            content: Some(content.into()),
        }
    }

    /// A single complete-or-partial fragment.
    pub fn fragment(
        index: usize,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) -> Self {
        Self::ToolCalls {
            fragments: vec![ToolCallFragment {
                index,
                id: id.map(str::to_string),
                name: name.map(str::to_string),
                arguments: arguments.map(str::to_string),
            }],
        }
    }
}

/// A live model stream. Dropping it releases the underlying transport.
pub type DeltaStream = BoxStream<'static, Result<StreamDelta, ModelError>>;

/// Trait for streaming model sources.
///
/// Implementations translate a vendor's streaming protocol into
/// [`StreamDelta`] items.
pub trait ModelStream: Send + Sync {
    /// Open a stream for the given request.
    fn stream(
        &self,
        request: ModelRequest<'_>,
    ) -> impl Future<Output = Result<DeltaStream, ModelError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::assistant("hi").role, Role::Assistant);
        assert_eq!(Message::system("hi").content, "hi");
    }

    #[test]
    fn stream_delta_json_shape() {
        let delta: StreamDelta = serde_json::from_str(
            r#"{"type":"tool_calls","fragments":[{"index":0,"name":"read_file"}]}"#,
        )
        .unwrap();
        assert_eq!(delta, StreamDelta::fragment(0, None, Some("read_file"), None));

        let done: StreamDelta = serde_json::from_str(r#"{"type":"done"}"#).unwrap();
        assert_eq!(done, StreamDelta::done());
    }

    #[test]
    fn mode_display() {
        assert_eq!(Mode::Plan.to_string(), "plan");
        assert_eq!(Mode::default().to_string(), "act");
    }
}
