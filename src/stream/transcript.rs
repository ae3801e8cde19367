//! Visible message list with the streaming identity rule.

use super::accumulator::{CompletedResponse, ResponseAccumulator};
use crate::types::{Message, MessageDelta, MessageId, Role};

/// Messages of one request, at most one of them in progress.
///
/// A delta continues the last message only while that message is an
/// assistant message still in progress. Otherwise it opens a new assistant
/// message with a fresh identity.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    in_progress: Option<ResponseAccumulator>,
}

impl Transcript {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            in_progress: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Identity of the message currently receiving deltas.
    pub fn in_progress_id(&self) -> Option<MessageId> {
        self.in_progress.as_ref().map(ResponseAccumulator::id)
    }

    fn continues_last(&self) -> bool {
        let Some(acc) = &self.in_progress else {
            return false;
        };
        self.messages
            .last()
            .is_some_and(|last| last.role == Role::Assistant && last.id == acc.id())
    }

    /// Fold a delta in and return the updated (untrimmed) message.
    pub fn apply(&mut self, delta: MessageDelta) -> &Message {
        if !self.continues_last() {
            self.in_progress = Some(ResponseAccumulator::new());
            self.messages.push(Message::assistant(""));
        }
        let idx = self.messages.len() - 1;
        if let Some(acc) = self.in_progress.as_mut() {
            acc.apply(delta);
            self.messages[idx] = acc.snapshot();
        }
        &self.messages[idx]
    }

    /// Finalize the in-progress message, if any.
    pub fn finish(&mut self) -> Option<CompletedResponse> {
        if !self.continues_last() {
            self.in_progress = None;
            return None;
        }
        let acc = self.in_progress.take()?;
        let completed = acc.finish();
        if let Some(last) = self.messages.last_mut() {
            *last = completed.message.clone();
        }
        Some(completed)
    }

    /// Append a finished message, finalizing any in-progress one first.
    pub fn push(&mut self, message: Message) {
        self.finish();
        self.messages.push(message);
    }

    /// Drop the in-progress message so no half-applied state remains.
    pub fn discard_in_progress(&mut self) -> Option<MessageId> {
        let id = self.in_progress.take()?.id();
        if self.messages.last().is_some_and(|last| last.id == id) {
            self.messages.pop();
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolResult;

    #[test]
    fn deltas_update_in_place_until_a_new_turn() {
        let mut transcript = Transcript::new(vec![Message::user("2+2?")]);
        let first = transcript.apply(MessageDelta::text("4")).id;
        let second = transcript.apply(MessageDelta::text("")).id;
        assert_eq!(first, second);
        assert_eq!(transcript.messages().len(), 2);

        let done = transcript.finish().unwrap();
        assert_eq!(done.message.text(), "4");
        assert_eq!(done.message.id, first);

        transcript.push(Message::tool(ToolResult::success("c1", "ok")));
        let third = transcript.apply(MessageDelta::text("next")).id;
        assert_ne!(third, first);
        assert_eq!(transcript.messages().len(), 4);
    }

    #[test]
    fn finalized_assistant_is_not_continued() {
        let mut transcript = Transcript::default();
        let first = transcript.apply(MessageDelta::text("a")).id;
        transcript.finish();
        let second = transcript.apply(MessageDelta::text("b")).id;
        assert_ne!(first, second);
    }

    #[test]
    fn discard_removes_partial_message() {
        let mut transcript = Transcript::new(vec![Message::user("hi")]);
        let id = transcript.apply(MessageDelta::text("partial")).id;
        assert_eq!(transcript.discard_in_progress(), Some(id));
        assert_eq!(transcript.messages().len(), 1);
        assert!(transcript.in_progress_id().is_none());
    }
}
