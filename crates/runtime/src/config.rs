//! Orchestrator configuration loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Hard ceilings that guarantee every turn terminates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budgets {
    /// Complete calls acted on per action phase. Later calls in the same
    /// burst are dropped, not queued.
    pub max_tools_per_action_phase: usize,

    /// Tool executions allowed per turn before a final answer is forced.
    pub max_phase_cycles_per_turn: u32,

    /// Re-requests of an already executed signature tolerated per turn.
    pub max_duplicate_attempts_per_turn: u32,

    /// Malformed tool calls tolerated per turn before a final answer is
    /// forced. Independent of the other two budgets.
    pub max_malformed_attempts_per_turn: u32,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            max_tools_per_action_phase: 1,
            max_phase_cycles_per_turn: 3,
            max_duplicate_attempts_per_turn: 3,
            max_malformed_attempts_per_turn: 3,
        }
    }
}

/// Configuration for [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub budgets: Budgets,

    /// Sampling temperature passed to the model.
    pub temperature: f32,

    /// Token ceiling passed to the model.
    pub max_tokens: u32,

    /// Also surface tool results on the event sink.
    pub debug_tool_results: bool,

    /// Prepended to the turn history when set.
    pub system_prompt: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            budgets: Budgets::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            debug_tool_results: false,
            system_prompt: None,
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the orchestrator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.budgets.max_tools_per_action_phase == 0 {
            return Err(ConfigError::Invalid(
                "budgets.max_tools_per_action_phase must be at least 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = OrchestratorConfig::parse("").unwrap();
        assert_eq!(config, OrchestratorConfig::default());
        assert_eq!(config.budgets.max_tools_per_action_phase, 1);
        assert_eq!(config.budgets.max_phase_cycles_per_turn, 3);
        assert_eq!(config.budgets.max_duplicate_attempts_per_turn, 3);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
temperature = 0.7
debug_tool_results = true
system_prompt = "Be brief."

[budgets]
max_phase_cycles_per_turn = 5
"#;
        let config = OrchestratorConfig::parse(toml).unwrap();
        assert!(config.debug_tool_results);
        assert_eq!(config.system_prompt.as_deref(), Some("Be brief."));
        assert_eq!(config.budgets.max_phase_cycles_per_turn, 5);
        assert_eq!(config.budgets.max_duplicate_attempts_per_turn, 3);
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn zero_tools_per_phase_is_rejected() {
        let err = OrchestratorConfig::parse("[budgets]\nmax_tools_per_action_phase = 0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_types_fail_to_parse() {
        let err = OrchestratorConfig::parse("max_tokens = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
