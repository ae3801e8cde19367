//! Tree-builder task: the single writer of a [`ConversationTree`].

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::bus::{BusItem, EventBus};
use super::tree::ConversationTree;
use crate::types::Message;

/// Handle to a running tree builder.
pub struct TreeHandle {
    snapshots: watch::Receiver<Vec<Message>>,
    task: JoinHandle<ConversationTree>,
}

impl TreeHandle {
    /// Receiver of the rendered tree after every applied item.
    pub fn snapshots(&self) -> watch::Receiver<Vec<Message>> {
        self.snapshots.clone()
    }

    /// Latest rendered tree.
    pub fn current(&self) -> Vec<Message> {
        self.snapshots.borrow().clone()
    }

    /// Wait for the bus to close and return the final tree.
    pub async fn finish(self) -> Result<ConversationTree, tokio::task::JoinError> {
        self.task.await
    }
}

/// Spawn the task that owns the tree and applies bus items in order.
pub fn spawn_tree_builder(mut items: mpsc::UnboundedReceiver<BusItem>) -> TreeHandle {
    let (tx, rx) = watch::channel(Vec::new());
    let task = tokio::spawn(async move {
        let mut tree = ConversationTree::new();
        while let Some(item) = items.recv().await {
            tree.apply_item(item);
            tx.send_replace(tree.snapshot());
        }
        debug!(roots = tree.roots().len(), "event bus closed; tree builder finished");
        tree
    });
    TreeHandle {
        snapshots: rx,
        task,
    }
}

/// Convenience: a fresh bus wired to a tree builder.
pub fn tree_bus() -> (EventBus, TreeHandle) {
    let (bus, rx) = EventBus::channel();
    (bus, spawn_tree_builder(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::AgentEvent;

    #[tokio::test]
    async fn builder_applies_items_in_emission_order() {
        let (bus, handle) = tree_bus();
        bus.emit(AgentEvent::Started {
            agent: "A".into(),
            parent: None,
            task: "t".into(),
        });
        bus.emit(AgentEvent::Completed {
            agent: "A".into(),
            result: "r".into(),
        });
        bus.publish_message(Message::user("after"));
        drop(bus);

        let tree = handle.finish().await.unwrap();
        assert_eq!(tree.roots().len(), 2);
        assert!(tree.is_closed(tree.roots()[0]));
        assert_eq!(tree.children(tree.roots()[0]).len(), 1);
    }
}
