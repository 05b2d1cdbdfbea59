//! Assembly of streamed tool-call fragments.
//!
//! Providers disagree on how tool calls are streamed. Some key fragments by
//! `index` until an `id` shows up, some only send the `id` on the first
//! fragment, and some resend the cumulative argument string instead of a
//! delta. [`ToolCallAccumulator`] absorbs all of these into one ordered set of
//! [`AssembledToolCall`]s.

use crate::llm::ToolCallFragment;
use crate::tools::AssembledToolCall;
use std::collections::HashMap;

/// Merge key for a call under assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CallKey {
    Id(String),
    /// Synthesized key for a call whose id is not known yet.
    Index(usize),
}

impl CallKey {
    fn call_id(&self) -> String {
        match self {
            Self::Id(id) => id.clone(),
            Self::Index(index) => format!("call_{index}"),
        }
    }
}

#[derive(Debug, Clone)]
struct PartialCall {
    key: CallKey,
    name: String,
    arguments: String,
}

impl PartialCall {
    fn assembled(&self) -> AssembledToolCall {
        AssembledToolCall {
            id: self.key.call_id(),
            name: self.name.clone(),
            arguments: self.arguments.clone(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.name.is_empty()
            && serde_json::from_str::<serde_json::Value>(&self.arguments).is_ok()
    }
}

/// Accumulates tool-call fragments for one action phase.
#[derive(Debug, Clone, Default)]
pub struct ToolCallAccumulator {
    /// Calls in first-seen order.
    calls: Vec<PartialCall>,
    /// Index -> id side table, filled once a fragment carries both.
    by_index: HashMap<usize, String>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no fragment has been merged yet.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Merge a batch of fragments.
    pub fn merge_fragments<'a>(&mut self, fragments: impl IntoIterator<Item = &'a ToolCallFragment>) {
        for fragment in fragments {
            self.merge(fragment);
        }
    }

    /// Merge a single fragment.
    pub fn merge(&mut self, fragment: &ToolCallFragment) {
        if let Some(id) = fragment.id.as_deref().filter(|id| !id.is_empty()) {
            self.bind_index(fragment.index, id);
        }

        let key = self.resolve_key(fragment);
        let position = match self.calls.iter().position(|call| call.key == key) {
            Some(position) => position,
            None => {
                self.calls.push(PartialCall {
                    key,
                    name: String::new(),
                    arguments: String::new(),
                });
                self.calls.len() - 1
            }
        };
        let call = &mut self.calls[position];

        if let Some(name) = fragment.name.as_deref().filter(|name| !name.is_empty()) {
            call.name = name.to_string();
        }
        if let Some(arguments) = fragment.arguments.as_deref() {
            call.arguments = merge_arguments(&call.arguments, arguments);
        }
    }

    /// Snapshot of every call seen so far, in first-seen order.
    pub fn snapshot(&self) -> Vec<AssembledToolCall> {
        self.calls.iter().map(PartialCall::assembled).collect()
    }

    /// Calls whose name is known and whose arguments parse as JSON.
    pub fn complete(&self) -> Vec<AssembledToolCall> {
        self.calls
            .iter()
            .filter(|call| call.is_complete())
            .map(PartialCall::assembled)
            .collect()
    }

    /// Named calls whose arguments never became valid JSON.
    pub fn pending(&self) -> Vec<AssembledToolCall> {
        self.calls
            .iter()
            .filter(|call| !call.name.is_empty() && !call.is_complete())
            .map(PartialCall::assembled)
            .collect()
    }

    /// First complete call, if any.
    pub fn first_complete(&self) -> Option<AssembledToolCall> {
        self.calls
            .iter()
            .find(|call| call.is_complete())
            .map(PartialCall::assembled)
    }

    /// Point `index` at `id`. A later id for the same index replaces the
    /// earlier one, since some providers reuse index 0 for every call.
    fn bind_index(&mut self, index: usize, id: &str) {
        self.by_index.insert(index, id.to_string());

        // Fragments that arrived before the id was known were filed under the
        // index. Move that entry over unless the id already has its own.
        let has_id_entry = self
            .calls
            .iter()
            .any(|call| call.key == CallKey::Id(id.to_string()));
        if !has_id_entry {
            if let Some(call) = self
                .calls
                .iter_mut()
                .find(|call| call.key == CallKey::Index(index))
            {
                call.key = CallKey::Id(id.to_string());
            }
        }
    }

    fn resolve_key(&self, fragment: &ToolCallFragment) -> CallKey {
        if let Some(id) = fragment.id.as_deref().filter(|id| !id.is_empty()) {
            return CallKey::Id(id.to_string());
        }
        match self.by_index.get(&fragment.index) {
            Some(id) => CallKey::Id(id.clone()),
            None => CallKey::Index(fragment.index),
        }
    }
}

/// Return the first complete call in `calls`.
///
/// A call is complete when its name is non-empty and its arguments parse as
/// JSON. Parse failures mean "not complete yet" and never surface as errors.
pub fn find_first_complete(calls: &[AssembledToolCall]) -> Option<&AssembledToolCall> {
    calls
        .iter()
        .find(|call| !call.name.is_empty() && call.parsed_arguments().is_some())
}

/// Merge an incoming argument string into the existing one.
///
/// Handles both delta and cumulative streaming: a longer string that extends
/// the existing one replaces it, a resend already covered by the existing
/// string is ignored, anything else is appended.
pub fn merge_arguments(existing: &str, incoming: &str) -> String {
    if incoming.is_empty() {
        return existing.to_string();
    }
    if incoming.starts_with(existing) {
        return incoming.to_string();
    }
    if existing.starts_with(incoming) || existing.ends_with(incoming) {
        return existing.to_string();
    }
    let mut merged = String::with_capacity(existing.len() + incoming.len());
    merged.push_str(existing);
    merged.push_str(incoming);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(index: usize, id: Option<&str>, name: Option<&str>, args: Option<&str>) -> ToolCallFragment {
        ToolCallFragment {
            index,
            id: id.map(str::to_string),
            name: name.map(str::to_string),
            arguments: args.map(str::to_string),
        }
    }

    #[test]
    fn cumulative_resends_keep_longest() {
        let mut acc = ToolCallAccumulator::new();
        for args in ["{\"pa", "{\"path\":", "{\"path\":\"a.txt\"}"] {
            acc.merge(&fragment(0, Some("c1"), Some("read_file"), Some(args)));
        }
        let calls = acc.snapshot();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments, "{\"path\":\"a.txt\"}");
    }

    #[test]
    fn prefix_extending_fragments_equal_final_string() {
        let full = "{\"query\":\"select * from t\",\"limit\":10}";
        let mut acc = ToolCallAccumulator::new();
        for end in (1..=full.len()).step_by(3).chain([full.len()]) {
            acc.merge(&fragment(0, Some("c1"), Some("sql"), Some(&full[..end])));
        }
        assert_eq!(acc.snapshot()[0].arguments, full);
    }

    #[test]
    fn deltas_are_concatenated() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(&fragment(0, Some("c1"), Some("read_file"), Some("{\"path\":")));
        acc.merge(&fragment(0, None, None, Some("\"src/lib.rs\"}")));
        let call = acc.first_complete().unwrap();
        assert_eq!(call.id, "c1");
        assert_eq!(call.arguments, "{\"path\":\"src/lib.rs\"}");
    }

    #[test]
    fn stale_resend_is_ignored() {
        assert_eq!(merge_arguments("{\"a\":1}", "{\"a\""), "{\"a\":1}");
        assert_eq!(merge_arguments("{\"a\":1}", ":1}"), "{\"a\":1}");
        assert_eq!(merge_arguments("", "{}"), "{}");
        assert_eq!(merge_arguments("{}", ""), "{}");
    }

    #[test]
    fn index_entry_is_rekeyed_once_id_arrives() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(&fragment(0, None, Some("grep"), Some("{\"pattern\":")));
        assert_eq!(acc.snapshot()[0].id, "call_0");

        acc.merge(&fragment(0, Some("c9"), None, Some("\"fn main\"}")));
        acc.merge(&fragment(0, None, None, None));

        let calls = acc.snapshot();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "c9");
        assert_eq!(calls[0].name, "grep");
        assert_eq!(calls[0].arguments, "{\"pattern\":\"fn main\"}");
    }

    #[test]
    fn id_only_fragments_after_index_mapping() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(&fragment(0, Some("a"), Some("one"), Some("{")));
        acc.merge(&fragment(1, Some("b"), Some("two"), Some("{}")));
        acc.merge(&fragment(0, None, None, Some("}")));
        let calls = acc.snapshot();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "one");
        assert_eq!(calls[0].arguments, "{}");
        assert_eq!(calls[1].name, "two");
    }

    #[test]
    fn reused_index_follows_latest_id() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(&fragment(0, Some("a"), Some("one"), Some("{\"x\":1}")));
        acc.merge(&fragment(0, Some("b"), Some("two"), Some("{\"y\":")));
        acc.merge(&fragment(0, None, None, Some("2}")));

        let calls = acc.snapshot();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "a");
        assert_eq!(calls[0].arguments, "{\"x\":1}");
        assert_eq!(calls[1].id, "b");
        assert_eq!(calls[1].arguments, "{\"y\":2}");
        assert_eq!(acc.complete().len(), 2);
    }

    #[test]
    fn last_non_empty_name_wins() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(&fragment(0, Some("c1"), Some("read"), None));
        acc.merge(&fragment(0, Some("c1"), Some(""), None));
        acc.merge(&fragment(0, Some("c1"), Some("read_file"), Some("{}")));
        assert_eq!(acc.snapshot()[0].name, "read_file");
    }

    #[test]
    fn incomplete_calls_are_pending() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(&fragment(0, Some("c1"), Some("write_file"), Some("{\"path\": oops")));
        acc.merge(&fragment(1, Some("c2"), None, Some("{}")));
        assert!(acc.first_complete().is_none());
        let pending = acc.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "write_file");
    }

    #[test]
    fn find_first_complete_skips_unnamed_and_invalid() {
        let calls = vec![
            AssembledToolCall::new("1", "", "{}"),
            AssembledToolCall::new("2", "a", "{\"x\":"),
            AssembledToolCall::new("3", "b", "{\"x\":1}"),
            AssembledToolCall::new("4", "c", "{}"),
        ];
        assert_eq!(find_first_complete(&calls).map(|c| c.id.as_str()), Some("3"));
        assert!(find_first_complete(&calls[..2]).is_none());
    }
}
