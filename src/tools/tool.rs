//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::arguments::ToolArguments;
use super::schema::ToolSchema;
use crate::error::ParleyError;

/// Context available during tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Id of the selection being answered.
    pub tool_selection_id: String,
}

/// Core tool trait; implement it to create custom tools.
///
/// Return [`ParleyError::ToolExecution`] for failures the model should see
/// and react to; any other error aborts the tool loop.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (unique within a request).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    fn schema(&self) -> &ToolSchema;

    /// Execute the tool with decoded arguments.
    async fn execute(&self, args: &ToolArguments, ctx: &ToolContext) -> Result<String, ParleyError>;
}

/// Tool definition as handed to adapters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn from_tool(tool: &dyn Tool) -> Result<Self, ParleyError> {
        tool.schema().validate(tool.name())?;
        Ok(Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.schema().to_value(),
        })
    }
}

type ToolHandler = dyn Fn(
        ToolArguments,
        ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<String, ParleyError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
pub struct FnTool {
    name: String,
    description: String,
    schema: ToolSchema,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ToolSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ParleyError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }

    /// Wrap into the shared handle requests and agents hold.
    pub fn shared(self) -> Arc<dyn Tool> {
        Arc::new(self)
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, args: &ToolArguments, ctx: &ToolContext) -> Result<String, ParleyError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
