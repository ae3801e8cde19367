//! Message types for model communication.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Stable identity of a message across streaming updates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_selections: Vec<ToolSelection>,
    /// Present exactly when `role` is [`Role::Tool`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    fn with_content(role: Role, content: MessageContent) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            tool_selections: Vec::new(),
            tool_result: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_content(Role::System, MessageContent::Text(text.into()))
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_content(Role::User, MessageContent::Text(text.into()))
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_content(Role::Assistant, MessageContent::Text(text.into()))
    }

    /// Create a tool message carrying one tool result.
    pub fn tool(result: ToolResult) -> Self {
        let mut message =
            Self::with_content(Role::Tool, MessageContent::Text(result.result_text.clone()));
        message.tool_result = Some(result);
        message
    }

    /// Create a message that renders an agent lifecycle node.
    pub fn agent_event(content: AgentEventContent) -> Self {
        Self::with_content(Role::Assistant, MessageContent::AgentEvent(content))
    }

    /// Extract the text content, concatenating fragments.
    pub fn text(&self) -> String {
        self.content.text()
    }

    /// Whether the message has no text and no tool selections.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.tool_selections.is_empty()
    }
}

/// Message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MessageContent {
    #[default]
    Empty,
    Text(String),
    Fragments(Vec<String>),
    AgentEvent(AgentEventContent),
}

impl MessageContent {
    pub fn text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(text) => text.clone(),
            Self::Fragments(parts) => parts.concat(),
            Self::AgentEvent(event) => event.detail.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Fragments(parts) => parts.iter().all(String::is_empty),
            Self::AgentEvent(_) => false,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolSelection {
    pub id: String,
    pub name: String,
    /// Arguments exactly as the model serialized them.
    pub arguments: String,
}

/// The outcome of running one [`ToolSelection`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolResult {
    pub tool_selection_id: String,
    pub result_text: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(tool_selection_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_selection_id: tool_selection_id.into(),
            result_text: text.into(),
            is_error: false,
        }
    }

    pub fn error(tool_selection_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_selection_id: tool_selection_id.into(),
            result_text: text.into(),
            is_error: true,
        }
    }
}

/// Agent lifecycle event kinds as they appear in the conversation tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentEventKind {
    Started,
    Delegated,
    ToolCalled,
    ToolCompleted,
    Completed,
    Failed,
    Error,
}

impl AgentEventKind {
    /// Completed and failed nodes accept no further children.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A rendered agent event node with its nested children.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentEventContent {
    pub kind: AgentEventKind,
    pub agent_name: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Message>,
}
