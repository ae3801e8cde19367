//! Folding deltas into one message.

use crate::types::{
    FinishReason, Message, MessageContent, MessageDelta, MessageId, Role, ToolSelection, Usage,
};

/// A finalized response.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedResponse {
    pub message: Message,
    pub finish_reason: Option<FinishReason>,
    pub usage: Usage,
}

impl CompletedResponse {
    /// Whether the model asked for tools.
    pub fn has_tool_selections(&self) -> bool {
        !self.message.tool_selections.is_empty()
    }
}

/// Fold a delta sequence with [`MessageDelta::merge`].
pub fn fold<I>(deltas: I) -> MessageDelta
where
    I: IntoIterator<Item = MessageDelta>,
{
    deltas.into_iter().fold(MessageDelta::default(), MessageDelta::merge)
}

/// Accumulates one response under a stable [`MessageId`].
#[derive(Debug, Clone, Default)]
pub struct ResponseAccumulator {
    id: MessageId,
    current: MessageDelta,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn apply(&mut self, delta: MessageDelta) {
        self.current = std::mem::take(&mut self.current).merge(delta);
    }

    /// The accumulated delta so far.
    pub fn current(&self) -> &MessageDelta {
        &self.current
    }

    /// The message as accumulated so far, untrimmed.
    pub fn snapshot(&self) -> Message {
        self.render(self.current.text.clone(), |selection| selection.id.clone().unwrap_or_default())
    }

    /// Finalize: trim chunking whitespace and assign ids to anonymous selections.
    pub fn finish(self) -> CompletedResponse {
        let text = self.current.text.trim().to_string();
        let message = self.render(text, |selection| {
            selection
                .id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()))
        });
        CompletedResponse {
            message,
            finish_reason: self.current.finish_reason,
            usage: self.current.usage.clone().unwrap_or_default(),
        }
    }

    fn render<F>(&self, text: String, mut id_for: F) -> Message
    where
        F: FnMut(&crate::types::ToolSelectionDelta) -> String,
    {
        let mut message = Message::assistant(text);
        message.id = self.id;
        message.role = self.current.role.unwrap_or(Role::Assistant);
        if message.text().is_empty() {
            message.content = MessageContent::Empty;
        }
        message.tool_selections = self
            .current
            .tool_selections
            .iter()
            .map(|selection| ToolSelection {
                id: id_for(selection),
                name: selection.name.clone().unwrap_or_default(),
                arguments: selection.arguments_fragment.clone(),
            })
            .collect();
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finish_trims_once_and_keeps_identity() {
        let mut acc = ResponseAccumulator::new();
        acc.apply(MessageDelta::text("\n Hello"));
        acc.apply(MessageDelta::text(" world \n"));
        let id = acc.id();
        assert_eq!(acc.snapshot().text(), "\n Hello world \n");
        let done = acc.finish();
        assert_eq!(done.message.text(), "Hello world");
        assert_eq!(done.message.id, id);
        assert_eq!(done.message.role, Role::Assistant);
    }

    #[test]
    fn whitespace_only_response_is_empty() {
        let mut acc = ResponseAccumulator::new();
        acc.apply(MessageDelta::text("  \n"));
        assert_eq!(acc.finish().message.content, MessageContent::Empty);
    }

    #[test]
    fn anonymous_selections_get_ids() {
        let mut acc = ResponseAccumulator::new();
        acc.apply(MessageDelta {
            tool_selections: vec![crate::types::ToolSelectionDelta {
                index: 0,
                id: None,
                name: Some("clock".into()),
                arguments_fragment: "{}".into(),
            }],
            ..Default::default()
        });
        let done = acc.finish();
        assert!(done.has_tool_selections());
        assert!(done.message.tool_selections[0].id.starts_with("call_"));
    }
}
