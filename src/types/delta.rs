//! Incremental response fragments.

use serde::{Deserialize, Serialize};

use super::generation::FinishReason;
use super::message::Role;
use super::usage::Usage;

/// One incremental fragment of a model response.
///
/// Non-streaming responses are decoded into a single delta carrying the
/// whole message, so both paths fold through the same rules.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MessageDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_selections: Vec<ToolSelectionDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// A fragment of one tool selection, keyed by its position in the response.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ToolSelectionDelta {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments_fragment: String,
}

impl MessageDelta {
    /// A text-only delta.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// A delta that only sets the role.
    pub fn role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    /// Combine two consecutive deltas into one.
    ///
    /// Text concatenates, the earliest role wins, the latest finish reason
    /// wins, usage sums, and tool-selection fragments merge by index. The
    /// operation is associative.
    pub fn merge(mut self, next: MessageDelta) -> MessageDelta {
        if self.role.is_none() {
            self.role = next.role;
        }
        self.text.push_str(&next.text);
        for fragment in next.tool_selections {
            merge_selection(&mut self.tool_selections, fragment);
        }
        if next.finish_reason.is_some() {
            self.finish_reason = next.finish_reason;
        }
        self.usage = match (self.usage, next.usage) {
            (Some(mut total), Some(extra)) => {
                total.merge(&extra);
                Some(total)
            }
            (total, extra) => total.or(extra),
        };
        self
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Fold `fragment` into the selection with the same index.
///
/// The index alone identifies a selection; the first non-empty id and name
/// win and argument fragments concatenate.
fn merge_selection(selections: &mut Vec<ToolSelectionDelta>, fragment: ToolSelectionDelta) {
    match selections
        .iter_mut()
        .find(|existing| existing.index == fragment.index)
    {
        Some(existing) => {
            if non_empty(&existing.id).is_none() && non_empty(&fragment.id).is_some() {
                existing.id = fragment.id;
            }
            if non_empty(&existing.name).is_none() && non_empty(&fragment.name).is_some() {
                existing.name = fragment.name;
            }
            existing.arguments_fragment.push_str(&fragment.arguments_fragment);
        }
        None => selections.push(fragment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(index: usize, id: Option<&str>, name: Option<&str>, args: &str) -> MessageDelta {
        MessageDelta {
            tool_selections: vec![ToolSelectionDelta {
                index,
                id: id.map(str::to_string),
                name: name.map(str::to_string),
                arguments_fragment: args.to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn earliest_role_wins() {
        let merged = MessageDelta::role(Role::Assistant).merge(MessageDelta::role(Role::User));
        assert_eq!(merged.role, Some(Role::Assistant));
        let merged = MessageDelta::text("x").merge(MessageDelta::role(Role::Assistant));
        assert_eq!(merged.role, Some(Role::Assistant));
    }

    #[test]
    fn tool_fragments_merge_by_index() {
        let merged = call(0, Some("call_a"), Some("search"), "{\"q\":")
            .merge(call(1, Some("call_b"), Some("clock"), "{}"))
            .merge(call(0, None, None, "\"rust\"}"));

        assert_eq!(merged.tool_selections.len(), 2);
        assert_eq!(merged.tool_selections[0].arguments_fragment, "{\"q\":\"rust\"}");
        assert_eq!(merged.tool_selections[0].name.as_deref(), Some("search"));
        assert_eq!(merged.tool_selections[1].id.as_deref(), Some("call_b"));
    }

    #[test]
    fn late_ids_fill_an_anonymous_selection() {
        let merged = call(0, None, Some("search"), "{")
            .merge(call(0, Some(""), None, ""))
            .merge(call(0, Some("call_a"), None, "}"));
        assert_eq!(merged.tool_selections.len(), 1);
        assert_eq!(merged.tool_selections[0].id.as_deref(), Some("call_a"));
        assert_eq!(merged.tool_selections[0].arguments_fragment, "{}");
    }

    #[test]
    fn merge_is_associative() {
        let with_usage = |mut delta: MessageDelta, input: u32, output: u32| {
            delta.usage = Some(Usage::new(input, output));
            delta
        };
        let mut a = call(0, Some("id1"), Some("search"), "A");
        a.role = Some(Role::Assistant);
        a.text = "Hel".into();
        let mut b = with_usage(call(0, None, None, "B"), 3, 0);
        b.text = "lo".into();
        b.tool_selections.push(ToolSelectionDelta {
            index: 1,
            id: None,
            name: Some("clock".into()),
            arguments_fragment: "{".into(),
        });
        let mut c = with_usage(call(1, Some("id2"), None, "}"), 0, 4);
        c.text = "!".into();
        c.finish_reason = Some(FinishReason::ToolCalls);

        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.merge(b.merge(c));
        assert_eq!(left, right);

        assert_eq!(left.text, "Hello!");
        assert_eq!(left.usage, Some(Usage::new(3, 4)));
        let rendered: Vec<String> = left
            .tool_selections
            .iter()
            .map(|s| format!("{}={}", s.id.as_deref().unwrap_or(""), s.arguments_fragment))
            .collect();
        assert_eq!(rendered, vec!["id1=AB", "id2={}"]);
    }

    #[test]
    fn anonymous_fragment_grouping_does_not_change_its_owner() {
        let a = call(0, Some("id1"), None, "A");
        let b = call(0, None, None, "B");
        let c = call(0, Some("id2"), None, "C");
        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.merge(b.merge(c));
        assert_eq!(left, right);
        assert_eq!(left.tool_selections.len(), 1);
        assert_eq!(left.tool_selections[0].id.as_deref(), Some("id1"));
        assert_eq!(left.tool_selections[0].arguments_fragment, "ABC");
    }

    #[test]
    fn usage_sums_across_fragments() {
        let first = MessageDelta {
            usage: Some(Usage::new(10, 0)),
            ..Default::default()
        };
        let second = MessageDelta {
            usage: Some(Usage::new(0, 7)),
            ..Default::default()
        };
        assert_eq!(first.merge(second).usage, Some(Usage::new(10, 7)));
    }
}
