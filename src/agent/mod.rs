//! Agents: model personas that run the tool loop and hand tasks to each other.

pub mod agent;
pub mod context;
pub mod delegation;
pub mod prompt;

pub use agent::Agent;
pub use context::{AgentContext, AgentEnv};
pub use delegation::{TransferTool, TRANSFER_TOOL_NAME};
pub use prompt::build_system_prompt;
