//! Agent event bus and the conversation tree built from it.

pub mod builder;
pub mod bus;
pub mod events;
pub mod tree;

pub use builder::{spawn_tree_builder, tree_bus, TreeHandle};
pub use bus::{BusItem, EventBus};
pub use events::{AgentEvent, AgentEventEnvelope};
pub use tree::{ConversationTree, NodeId};
