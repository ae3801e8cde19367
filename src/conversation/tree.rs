//! Conversation tree: nested messages and agent lifecycle nodes.
//!
//! Nodes live in an arena and reference each other by [`NodeId`]. Event
//! insertion follows one contract:
//!
//! - A node is closed once it is a `completed`/`failed` node, or once such a
//!   node for the same agent lands anywhere beneath it. Closing also closes
//!   every node of that agent under the outermost node it closed. Closed
//!   nodes take no children.
//! - An event nests under the first open node (pre-order over top-level nodes,
//!   then children) whose agent matches. The search still descends through
//!   closed nodes, so a delegate that outlives its parent keeps its place.
//!   `started` events with a parent match on the parent's name instead of
//!   their own.
//! - With no match the node becomes a new top-level node.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::bus::BusItem;
use super::events::AgentEvent;
use crate::types::{AgentEventContent, AgentEventKind, Message, MessageId};

/// Handle to a node in a [`ConversationTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    Message(Message),
    Event {
        id: MessageId,
        kind: AgentEventKind,
        agent_name: String,
        detail: String,
        timestamp: DateTime<Utc>,
        closed: bool,
    },
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Single-writer tree of conversation nodes.
#[derive(Debug, Clone, Default)]
pub struct ConversationTree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    messages: HashMap<MessageId, NodeId>,
}

impl ConversationTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level nodes in display order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Event kind of an event node.
    pub fn kind(&self, id: NodeId) -> Option<AgentEventKind> {
        match &self.nodes.get(id.0)?.data {
            NodeData::Event { kind, .. } => Some(*kind),
            NodeData::Message(_) => None,
        }
    }

    pub fn agent_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id.0)?.data {
            NodeData::Event { agent_name, .. } => Some(agent_name),
            NodeData::Message(_) => None,
        }
    }

    pub fn is_closed(&self, id: NodeId) -> bool {
        matches!(
            self.nodes.get(id.0).map(|n| &n.data),
            Some(NodeData::Event { closed: true, .. })
        )
    }

    /// Apply one bus item.
    pub fn apply_item(&mut self, item: BusItem) {
        match item {
            BusItem::Event(envelope) => {
                self.apply(&envelope.event);
            }
            BusItem::Message(message) => {
                self.upsert_message(message);
            }
            BusItem::Retract(id) => {
                self.retract_message(id);
            }
        }
    }

    /// Insert the node for `event` and return it.
    pub fn apply(&mut self, event: &AgentEvent) -> NodeId {
        let kind = event.kind();
        let anchor = event.parent().unwrap_or(event.agent());
        let parent = self.find_open(anchor);

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data: NodeData::Event {
                id: MessageId::new(),
                kind,
                agent_name: event.agent().to_string(),
                detail: event.detail(),
                timestamp: Utc::now(),
                closed: kind.is_terminal(),
            },
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }

        if kind.is_terminal() {
            self.close_ancestors(id, event.agent());
        }
        id
    }

    fn close_ancestors(&mut self, from: NodeId, agent: &str) {
        let mut outermost = from;
        let mut cursor = self.nodes[from.0].parent;
        while let Some(id) = cursor {
            let node = &mut self.nodes[id.0];
            if let NodeData::Event {
                agent_name, closed, ..
            } = &mut node.data
            {
                if agent_name == agent {
                    *closed = true;
                    outermost = id;
                }
            }
            cursor = node.parent;
        }
        self.close_subtree(outermost, agent);
    }

    fn close_subtree(&mut self, id: NodeId, agent: &str) {
        if let NodeData::Event {
            agent_name, closed, ..
        } = &mut self.nodes[id.0].data
        {
            if agent_name == agent {
                *closed = true;
            }
        }
        for child in self.nodes[id.0].children.clone() {
            self.close_subtree(child, agent);
        }
    }

    /// First open event node for `agent`, in pre-order.
    pub fn find_open(&self, agent: &str) -> Option<NodeId> {
        self.roots.iter().find_map(|root| self.find_open_from(*root, agent))
    }

    fn find_open_from(&self, id: NodeId, agent: &str) -> Option<NodeId> {
        let node = &self.nodes[id.0];
        let NodeData::Event {
            agent_name, closed, ..
        } = &node.data
        else {
            return None;
        };
        if !*closed && agent_name == agent {
            return Some(id);
        }
        node.children
            .iter()
            .find_map(|child| self.find_open_from(*child, agent))
    }

    /// Append a plain message at top level, or replace it in place when a
    /// message with the same id is already shown.
    pub fn upsert_message(&mut self, message: Message) -> NodeId {
        if let Some(&id) = self.messages.get(&message.id) {
            self.nodes[id.0].data = NodeData::Message(message);
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.messages.insert(message.id, id);
        self.nodes.push(Node {
            data: NodeData::Message(message),
            parent: None,
            children: Vec::new(),
        });
        self.roots.push(id);
        id
    }

    /// Remove a plain message; returns whether it was present.
    pub fn retract_message(&mut self, id: MessageId) -> bool {
        let Some(node) = self.messages.remove(&id) else {
            return false;
        };
        // Slots stay allocated so existing handles remain valid.
        match self.nodes[node.0].parent {
            Some(parent) => self.nodes[parent.0].children.retain(|c| *c != node),
            None => self.roots.retain(|c| *c != node),
        }
        true
    }

    /// Render the visible tree as nested messages.
    pub fn snapshot(&self) -> Vec<Message> {
        self.roots.iter().map(|id| self.render(*id)).collect()
    }

    fn render(&self, id: NodeId) -> Message {
        let node = &self.nodes[id.0];
        match &node.data {
            NodeData::Message(message) => message.clone(),
            NodeData::Event {
                id: message_id,
                kind,
                agent_name,
                detail,
                timestamp,
                ..
            } => {
                let mut message = Message::agent_event(AgentEventContent {
                    kind: *kind,
                    agent_name: agent_name.clone(),
                    detail: detail.clone(),
                    children: node.children.iter().map(|c| self.render(*c)).collect(),
                });
                message.id = *message_id;
                message.timestamp = Some(*timestamp);
                message
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(agent: &str, parent: Option<&str>) -> AgentEvent {
        AgentEvent::Started {
            agent: agent.into(),
            parent: parent.map(Into::into),
            task: "task".into(),
        }
    }

    fn completed(agent: &str) -> AgentEvent {
        AgentEvent::Completed {
            agent: agent.into(),
            result: "done".into(),
        }
    }

    fn tool_called(agent: &str) -> AgentEvent {
        AgentEvent::ToolCalled {
            agent: agent.into(),
            tool: "clock".into(),
            arguments: "{}".into(),
        }
    }

    #[test]
    fn events_nest_under_their_agents_open_node() {
        let mut tree = ConversationTree::new();
        let a = tree.apply(&started("A", None));
        let call = tree.apply(&tool_called("A"));
        assert_eq!(tree.parent(call), Some(a));
        assert_eq!(tree.roots(), &[a]);
    }

    #[test]
    fn started_with_parent_nests_under_parent() {
        let mut tree = ConversationTree::new();
        let a = tree.apply(&started("A", None));
        let b = tree.apply(&started("B", Some("A")));
        let call = tree.apply(&tool_called("B"));
        assert_eq!(tree.parent(b), Some(a));
        assert_eq!(tree.parent(call), Some(b));
    }

    #[test]
    fn closed_nodes_take_no_more_children() {
        let mut tree = ConversationTree::new();
        let a = tree.apply(&started("A", None));
        let done = tree.apply(&completed("A"));
        assert_eq!(tree.parent(done), Some(a));
        assert!(tree.is_closed(a));
        assert!(tree.is_closed(done));

        let late = tree.apply(&tool_called("A"));
        assert_eq!(tree.parent(late), None);
        assert_eq!(tree.roots().len(), 2);
    }

    #[test]
    fn delegate_outliving_its_parent_keeps_nesting() {
        let mut tree = ConversationTree::new();
        let a = tree.apply(&started("A", None));
        let b = tree.apply(&started("B", Some("A")));
        tree.apply(&completed("A"));
        assert!(tree.is_closed(a));
        assert!(!tree.is_closed(b));

        let call = tree.apply(&tool_called("B"));
        assert_eq!(tree.parent(call), Some(b));
        assert_eq!(tree.roots(), &[a]);
    }

    #[test]
    fn closing_an_agent_closes_its_nested_nodes() {
        let mut tree = ConversationTree::new();
        let a = tree.apply(&started("A", None));
        let call = tree.apply(&tool_called("A"));
        assert_eq!(tree.parent(call), Some(a));
        tree.apply(&completed("A"));
        assert!(tree.is_closed(call));

        let late = tree.apply(&tool_called("A"));
        assert_eq!(tree.parent(late), None);
    }

    #[test]
    fn failed_closes_like_completed() {
        let mut tree = ConversationTree::new();
        let a = tree.apply(&started("A", None));
        tree.apply(&AgentEvent::Failed {
            agent: "A".into(),
            result: "boom".into(),
        });
        assert!(tree.is_closed(a));
    }

    #[test]
    fn closing_a_child_agent_leaves_parent_open() {
        let mut tree = ConversationTree::new();
        let a = tree.apply(&started("A", None));
        let b = tree.apply(&started("B", Some("A")));
        tree.apply(&completed("B"));
        assert!(tree.is_closed(b));
        assert!(!tree.is_closed(a));
        let next = tree.apply(&tool_called("A"));
        assert_eq!(tree.parent(next), Some(a));
    }

    #[test]
    fn first_open_match_wins() {
        let mut tree = ConversationTree::new();
        let first = tree.apply(&started("A", None));
        let _second_root = tree.apply(&started("B", None));
        let nested = tree.apply(&started("A", Some("B")));
        let call = tree.apply(&tool_called("A"));
        assert_eq!(tree.parent(call), Some(first));
        assert_ne!(tree.parent(call), Some(nested));
    }

    #[test]
    fn messages_upsert_and_retract() {
        let mut tree = ConversationTree::new();
        let mut message = Message::assistant("par");
        let node = tree.upsert_message(message.clone());
        message.content = crate::types::MessageContent::Text("partial".into());
        assert_eq!(tree.upsert_message(message.clone()), node);
        assert_eq!(tree.snapshot()[0].text(), "partial");

        assert!(tree.retract_message(message.id));
        assert!(tree.snapshot().is_empty());
        assert!(!tree.retract_message(message.id));
    }

    #[test]
    fn snapshot_renders_nested_event_content() {
        let mut tree = ConversationTree::new();
        tree.apply(&started("A", None));
        tree.apply(&tool_called("A"));
        let snapshot = tree.snapshot();
        let crate::types::MessageContent::AgentEvent(content) = &snapshot[0].content else {
            panic!("expected agent event content");
        };
        assert_eq!(content.kind, AgentEventKind::Started);
        assert_eq!(content.children.len(), 1);
        assert_eq!(content.children[0].text(), "clock({})");
    }
}
