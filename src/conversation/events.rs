//! Agent lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::AgentEventKind;

/// One agent state transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Started {
        agent: String,
        /// Delegating agent, when started through a hand-off.
        parent: Option<String>,
        task: String,
    },
    Delegated {
        agent: String,
        to: String,
        reason: String,
    },
    ToolCalled {
        agent: String,
        tool: String,
        arguments: String,
    },
    ToolCompleted {
        agent: String,
        tool: String,
        result: String,
        is_error: bool,
    },
    Completed {
        agent: String,
        result: String,
    },
    Failed {
        agent: String,
        result: String,
    },
    Error {
        agent: String,
        message: String,
    },
}

impl AgentEvent {
    /// Agent that emitted the event.
    pub fn agent(&self) -> &str {
        match self {
            Self::Started { agent, .. }
            | Self::Delegated { agent, .. }
            | Self::ToolCalled { agent, .. }
            | Self::ToolCompleted { agent, .. }
            | Self::Completed { agent, .. }
            | Self::Failed { agent, .. }
            | Self::Error { agent, .. } => agent,
        }
    }

    pub fn kind(&self) -> AgentEventKind {
        match self {
            Self::Started { .. } => AgentEventKind::Started,
            Self::Delegated { .. } => AgentEventKind::Delegated,
            Self::ToolCalled { .. } => AgentEventKind::ToolCalled,
            Self::ToolCompleted { .. } => AgentEventKind::ToolCompleted,
            Self::Completed { .. } => AgentEventKind::Completed,
            Self::Failed { .. } => AgentEventKind::Failed,
            Self::Error { .. } => AgentEventKind::Error,
        }
    }

    /// Explicit parent for nesting; only `started` carries one.
    pub fn parent(&self) -> Option<&str> {
        match self {
            Self::Started { parent, .. } => parent.as_deref(),
            _ => None,
        }
    }

    /// Human-readable detail line for the tree node.
    pub fn detail(&self) -> String {
        match self {
            Self::Started { task, .. } => task.clone(),
            Self::Delegated { to, reason, .. } => format!("{to}: {reason}"),
            Self::ToolCalled { tool, arguments, .. } => format!("{tool}({arguments})"),
            Self::ToolCompleted { result, .. } => result.clone(),
            Self::Completed { result, .. } | Self::Failed { result, .. } => result.clone(),
            Self::Error { message, .. } => message.clone(),
        }
    }
}

/// An event with its delivery order and emission time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentEventEnvelope {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub event: AgentEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = AgentEvent::Delegated {
            agent: "planner".into(),
            to: "coder".into(),
            reason: "write it".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "delegated");
        assert_eq!(value["to"], "coder");
        assert_eq!(event.detail(), "coder: write it");
        assert_eq!(event.kind(), AgentEventKind::Delegated);
    }
}
