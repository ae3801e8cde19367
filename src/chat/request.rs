//! The canonical chat request.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::tool_loop::{LoopEvent, ToolEventSink};
use crate::error::ParleyError;
use crate::models::Model;
use crate::tools::{Tool, ToolDefinition};
use crate::types::{GenerationSettings, Message};

/// A provider-agnostic request: model, conversation, tools, and settings.
#[derive(Clone)]
pub struct ChatRequest {
    pub model: Model,
    pub messages: Vec<Message>,
    /// Tools the model may select; names must be unique.
    pub tools: Vec<Arc<dyn Tool>>,
    pub settings: GenerationSettings,
    /// Optional bound on tool-loop requests. Unbounded when `None`.
    pub max_iterations: Option<usize>,
    /// Canceling the token aborts the in-flight exchange.
    pub cancel: Option<CancellationToken>,
    /// Observer for tool invocations made by the loop.
    pub tool_events: Option<ToolEventSink>,
}

impl ChatRequest {
    pub fn new(model: Model, messages: Vec<Message>) -> Self {
        Self {
            model,
            messages,
            tools: Vec::new(),
            settings: GenerationSettings::default(),
            max_iterations: None,
            cancel: None,
            tool_events: None,
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn on_tool_event<F>(mut self, sink: F) -> Self
    where
        F: Fn(LoopEvent) + Send + Sync + 'static,
    {
        self.tool_events = Some(Arc::new(sink));
        self
    }

    pub fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Wire-ready tool definitions, validating schemas and name uniqueness.
    pub fn tool_definitions(&self) -> Result<Vec<ToolDefinition>, ParleyError> {
        let mut definitions: Vec<ToolDefinition> = Vec::with_capacity(self.tools.len());
        for tool in &self.tools {
            if definitions.iter().any(|d| d.name == tool.name()) {
                return Err(ParleyError::Configuration(format!(
                    "Duplicate tool name '{}' in request",
                    tool.name()
                )));
            }
            definitions.push(ToolDefinition::from_tool(tool.as_ref())?);
        }
        Ok(definitions)
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

impl std::fmt::Debug for ChatRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRequest")
            .field("model", &self.model)
            .field("messages", &self.messages.len())
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name().to_string()).collect::<Vec<_>>(),
            )
            .field("settings", &self.settings)
            .field("max_iterations", &self.max_iterations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FnTool, ToolSchema};

    fn noop(name: &str) -> Arc<dyn Tool> {
        FnTool::new(name, "noop", ToolSchema::empty(), |_args, _ctx| async {
            Ok(String::new())
        })
        .shared()
    }

    #[test]
    fn duplicate_tool_names_are_rejected() {
        let request = ChatRequest::new(Model::new("openai", "gpt-4o"), vec![])
            .with_tool(noop("a"))
            .with_tool(noop("a"));
        assert!(matches!(
            request.tool_definitions(),
            Err(ParleyError::Configuration(_))
        ));
    }

    #[test]
    fn cancel_token_is_observed() {
        let token = CancellationToken::new();
        let request =
            ChatRequest::new(Model::new("openai", "gpt-4o"), vec![]).with_cancel(token.clone());
        assert!(!request.is_canceled());
        token.cancel();
        assert!(request.is_canceled());
    }
}
