//! Per-turn mutable state.

use super::TurnInput;
use crate::event::{Event, EventPayload, Phase};
use crate::llm::{Message, RequestContext};
use std::collections::HashSet;

/// State owned by a single `orchestrate` call.
///
/// Built fresh for every turn and dropped when it returns, so dedup state
/// can never leak between turns or users.
#[derive(Debug)]
pub(crate) struct TurnState {
    pub messages: Vec<Message>,
    pub phase: Phase,
    pub phase_index: u32,
    pub cycle_index: u32,
    pub blocked_signatures: HashSet<String>,
    pub duplicate_attempt_count: u32,
    pub malformed_attempt_count: u32,
    pub done_emitted: bool,
    pub final_content: String,
    pub context: RequestContext,
    phases_started: u32,
}

impl TurnState {
    pub fn new(input: TurnInput, system_prompt: Option<&str>) -> Self {
        let mut messages = Vec::with_capacity(8);
        if let Some(prompt) = system_prompt {
            messages.push(Message::system(prompt));
        }
        messages.push(Message::user(input.content));

        Self {
            messages,
            phase: Phase::Action,
            phase_index: 0,
            cycle_index: 0,
            blocked_signatures: HashSet::new(),
            duplicate_attempt_count: 0,
            malformed_attempt_count: 0,
            done_emitted: false,
            final_content: String::new(),
            context: RequestContext {
                request_id: input.request_id,
                project_id: input.project_id,
                mode: input.mode,
            },
            phases_started: 0,
        }
    }

    /// Enter a new phase. The first phase of a turn has index 0.
    pub fn begin_phase(&mut self, phase: Phase) {
        if self.phases_started > 0 {
            self.phase_index += 1;
        }
        self.phases_started += 1;
        self.phase = phase;
    }

    /// Number of phases entered so far.
    pub fn phases(&self) -> u32 {
        self.phases_started
    }

    /// Stamp a payload with the current position in the turn.
    pub fn event(&self, payload: EventPayload) -> Event {
        Event {
            payload,
            phase: self.phase,
            phase_index: self.phase_index,
            cycle_index: self.cycle_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Mode, Role};

    fn input() -> TurnInput {
        TurnInput {
            content: "hello".into(),
            mode: Mode::Plan,
            request_id: "r1".into(),
            project_id: "p1".into(),
        }
    }

    #[test]
    fn history_starts_with_system_then_user() {
        let state = TurnState::new(input(), Some("be brief"));
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].role, Role::System);
        assert_eq!(state.messages[1], Message::user("hello"));
        assert_eq!(state.context.mode, Mode::Plan);
    }

    #[test]
    fn phase_index_is_strictly_increasing() {
        let mut state = TurnState::new(input(), None);
        state.begin_phase(Phase::Action);
        assert_eq!(state.phase_index, 0);
        state.begin_phase(Phase::Tool);
        assert_eq!(state.phase_index, 1);
        assert_eq!(state.event(EventPayload::Chunk { chunk: String::new() }).phase, Phase::Tool);
        state.begin_phase(Phase::Action);
        assert_eq!(state.phase_index, 2);
        assert_eq!(state.phases(), 3);
    }
}
