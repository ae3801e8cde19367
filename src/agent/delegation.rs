//! The synthesized `transfer` tool that hands a task to a delegate agent.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::agent::Agent;
use super::context::{AgentContext, AgentEnv};
use crate::conversation::AgentEvent;
use crate::error::ParleyError;
use crate::tools::{Tool, ToolArguments, ToolContext, ToolSchema};

pub const TRANSFER_TOOL_NAME: &str = "transfer";

/// Hand-off tool bound to one executing agent.
pub struct TransferTool {
    from: String,
    delegates: Vec<Arc<Agent>>,
    env: AgentEnv,
    depth: usize,
    schema: ToolSchema,
}

impl TransferTool {
    pub fn new(from: &Agent, env: AgentEnv, depth: usize) -> Self {
        let schema = ToolSchema::object()
            .string_enum(
                "agent_name",
                "Name of the agent to hand the task to",
                from.delegates().iter().map(|d| d.name().to_string()),
                true,
            )
            .string("reason", "What the delegate should do, and why", true)
            .build();
        Self {
            from: from.name().to_string(),
            delegates: from.delegates().to_vec(),
            env,
            depth,
            schema,
        }
    }

    fn resolve(&self, name: &str) -> Result<&Arc<Agent>, ParleyError> {
        self.delegates
            .iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| ParleyError::DelegationTargetNotFound {
                name: name.to_string(),
                available: self.delegates.iter().map(|d| d.name().to_string()).collect(),
            })
    }
}

#[async_trait]
impl Tool for TransferTool {
    fn name(&self) -> &str {
        TRANSFER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Transfer the current task to another agent"
    }

    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, args: &ToolArguments, _ctx: &ToolContext) -> Result<String, ParleyError> {
        // Missing arguments break the call itself; a name that matches no
        // delegate is only a miss the model can recover from.
        let name = args.get_str("agent_name")?;
        let reason = args.get_str("reason")?;
        let target = self.resolve(name)?;

        if self.depth >= self.env.max_delegation_depth {
            return Err(ParleyError::DelegationDepthExceeded {
                limit: self.env.max_delegation_depth,
            });
        }

        debug!(agent = %self.from, to = %name, depth = self.depth + 1, "delegating");
        self.env.events.emit(AgentEvent::Delegated {
            agent: self.from.clone(),
            to: name.to_string(),
            reason: reason.to_string(),
        });

        let context = AgentContext::delegated(&self.from, reason, self.depth);
        Ok(target.execute(&self.env, context).await)
    }
}

impl std::fmt::Debug for TransferTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferTool")
            .field("from", &self.from)
            .field("depth", &self.depth)
            .finish()
    }
}
