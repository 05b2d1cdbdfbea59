//! Replay scripts.
//!
//! A script fixes everything a turn depends on: the user input, the tools on
//! offer with their canned responses, and one burst of stream deltas per model
//! call.
//!
//! ```json
//! {
//!   "input": { "content": "Summarize a.txt", "projectId": "demo" },
//!   "tools": [
//!     { "name": "read_file", "description": "Read a file", "responses": [{ "ok": "hello" }] }
//!   ],
//!   "bursts": [
//!     [{ "type": "tool_calls", "fragments": [{ "index": 0, "id": "c1", "name": "read_file", "arguments": "{\"path\":\"a.txt\"}" }] }],
//!     [{ "type": "content", "text": "It says hello." }, { "type": "done" }]
//!   ]
//! }
//! ```

use crate::error::{Error, Result};
use runtime::scripted::{ScriptedModel, ScriptedTools};
use runtime::{Mode, ModelError, StreamDelta, ToolError, TurnInput};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// A recorded turn.
#[derive(Debug, Deserialize)]
pub struct Script {
    pub input: ScriptInput,
    #[serde(default)]
    pub tools: Vec<ScriptTool>,
    pub bursts: Vec<Burst>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptInput {
    pub content: String,
    #[serde(default)]
    pub mode: Mode,
    /// Generated when absent.
    pub request_id: Option<String>,
    #[serde(default = "default_project")]
    pub project_id: String,
}

fn default_project() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ScriptTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Answers in call order; once exhausted the tool echoes its arguments.
    #[serde(default)]
    pub responses: Vec<ToolResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolResponse {
    Ok(Value),
    Err(ToolError),
}

/// One model call: either a stream of deltas or a transport failure.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Burst {
    Deltas(Vec<StreamDelta>),
    Fail { fail: String },
}

impl Script {
    /// Load a script from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ScriptNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a script from a JSON string.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Script(e.to_string()))
    }

    /// Split the script into turn input and collaborators.
    pub fn into_parts(self) -> (TurnInput, ScriptedModel, ScriptedTools) {
        let input = self.input;
        let mut turn = TurnInput::new(input.content, input.project_id).with_mode(input.mode);
        if let Some(request_id) = input.request_id {
            turn.request_id = request_id;
        }

        let model = self.bursts.into_iter().fold(ScriptedModel::new(), |model, burst| match burst {
            Burst::Deltas(deltas) => model.burst(deltas),
            Burst::Fail { fail } => model.fail(ModelError::Open(fail)),
        });

        let mut tools = ScriptedTools::new();
        for tool in self.tools {
            tools = tool
                .responses
                .into_iter()
                .fold(tools.tool(tool.name.as_str(), tool.description), |tools, response| {
                    let response = match response {
                        ToolResponse::Ok(value) => Ok(value),
                        ToolResponse::Err(error) => Err(error),
                    };
                    tools.respond(tool.name.as_str(), response)
                });
        }

        (turn, model, tools)
    }
}
