//! Convenience re-exports for common use.

pub use crate::chat::{ChatRequest, Client};
pub use crate::config::ParleyConfig;
pub use crate::error::{ParleyError, Result};
pub use crate::models::Model;
pub use crate::provider::{ProviderAdapter, ProviderRegistry};
pub use crate::tools::{FnTool, Tool, ToolArguments, ToolSchema};
pub use crate::types::{
    FinishReason, GenerationSettings, Message, MessageContent, MessageDelta, Role, ToolResult,
    ToolSelection, Usage,
};

#[cfg(feature = "agent")]
pub use crate::agent::{Agent, AgentContext, AgentEnv};
#[cfg(feature = "agent")]
pub use crate::conversation::{AgentEvent, ConversationTree, EventBus};
