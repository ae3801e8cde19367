//! Per-execution inputs and shared runtime for agents.

use tokio_util::sync::CancellationToken;

use crate::chat::Client;
use crate::config::{ParleyConfig, DEFAULT_MAX_DELEGATION_DEPTH};
use crate::conversation::EventBus;
use crate::types::{Message, Role};

/// Conversation handed to one [`Agent::execute`](super::Agent::execute) call.
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    pub messages: Vec<Message>,
    /// Agent that delegated to this one, if any.
    pub parent: Option<String>,
    /// Number of hand-offs above this execution.
    pub depth: usize,
}

impl AgentContext {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Single user turn.
    pub fn task(text: impl Into<String>) -> Self {
        Self::new(vec![Message::user(text)])
    }

    /// Fresh context for a delegate: a short system note plus the reason as
    /// the user turn.
    pub fn delegated(from: &str, reason: &str, depth: usize) -> Self {
        Self {
            messages: vec![
                Message::system(format!("Task handed over by {from}.")),
                Message::user(reason),
            ],
            parent: Some(from.to_string()),
            depth: depth + 1,
        }
    }

    /// Text of the last user turn.
    pub fn task_text(&self) -> String {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(Message::text)
            .unwrap_or_default()
    }
}

/// What every agent in one run shares.
#[derive(Debug, Clone)]
pub struct AgentEnv {
    pub client: Client,
    pub events: EventBus,
    pub max_delegation_depth: usize,
    pub cancel: Option<CancellationToken>,
}

impl AgentEnv {
    pub fn new(client: Client, events: EventBus) -> Self {
        Self {
            client,
            events,
            max_delegation_depth: DEFAULT_MAX_DELEGATION_DEPTH,
            cancel: None,
        }
    }

    pub fn from_config(config: &ParleyConfig, events: EventBus) -> Self {
        Self::new(config.client(), events).with_max_delegation_depth(config.max_delegation_depth())
    }

    pub fn with_max_delegation_depth(mut self, depth: usize) -> Self {
        self.max_delegation_depth = depth;
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegated_context_is_fresh() {
        let context = AgentContext::delegated("planner", "write the parser", 2);
        assert_eq!(context.messages.len(), 2);
        assert_eq!(context.messages[0].role, Role::System);
        assert_eq!(context.task_text(), "write the parser");
        assert_eq!(context.parent.as_deref(), Some("planner"));
        assert_eq!(context.depth, 3);
    }

    #[test]
    fn task_text_picks_last_user_turn() {
        let context = AgentContext::new(vec![
            Message::user("first"),
            Message::assistant("ok"),
            Message::user("second"),
        ]);
        assert_eq!(context.task_text(), "second");
        assert_eq!(AgentContext::default().task_text(), "");
    }
}
