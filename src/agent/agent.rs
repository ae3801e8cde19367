//! Core Agent struct.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use super::context::{AgentContext, AgentEnv};
use super::delegation::{TransferTool, TRANSFER_TOOL_NAME};
use super::prompt::build_system_prompt;
use crate::chat::{ChatRequest, LoopEvent};
use crate::conversation::AgentEvent;
use crate::error::ParleyError;
use crate::models::Model;
use crate::tools::Tool;
use crate::types::{GenerationSettings, Message};

/// A named model persona with tools and agents it may hand work to.
#[derive(Clone)]
pub struct Agent {
    name: String,
    description: String,
    instructions: String,
    model: Model,
    tools: Vec<Arc<dyn Tool>>,
    delegates: Vec<Arc<Agent>>,
    settings: GenerationSettings,
}

impl Agent {
    pub fn new(name: impl Into<String>, description: impl Into<String>, model: Model) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions: String::new(),
            model,
            tools: Vec::new(),
            delegates: Vec::new(),
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Add a tool.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Add an agent this one may transfer tasks to.
    pub fn with_delegate(self, agent: Agent) -> Self {
        self.with_shared_delegate(Arc::new(agent))
    }

    pub fn with_shared_delegate(mut self, agent: Arc<Agent>) -> Self {
        self.delegates.push(agent);
        self
    }

    /// Set generation settings.
    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn delegates(&self) -> &[Arc<Agent>] {
        &self.delegates
    }

    /// Run the agent on `context` and return its final text.
    ///
    /// Failures never propagate: they are reported on the event bus and the
    /// returned text is `"Error: <message>"`.
    pub fn execute<'a>(&'a self, env: &'a AgentEnv, context: AgentContext) -> BoxFuture<'a, String> {
        async move {
            env.events.emit(AgentEvent::Started {
                agent: self.name.clone(),
                parent: context.parent.clone(),
                task: context.task_text(),
            });

            match self.run(env, context).await {
                Ok(text) => {
                    env.events.emit(AgentEvent::Completed {
                        agent: self.name.clone(),
                        result: text.clone(),
                    });
                    text
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(agent = %self.name, error = %message, "agent failed");
                    env.events.emit(AgentEvent::Error {
                        agent: self.name.clone(),
                        message: message.clone(),
                    });
                    env.events.emit(AgentEvent::Failed {
                        agent: self.name.clone(),
                        result: message.clone(),
                    });
                    format!("Error: {message}")
                }
            }
        }
        .boxed()
    }

    async fn run(&self, env: &AgentEnv, context: AgentContext) -> Result<String, ParleyError> {
        let depth = context.depth;
        let mut messages = vec![Message::system(build_system_prompt(self))];
        messages.extend(context.messages);

        let mut request = ChatRequest::new(self.model.clone(), messages)
            .with_tools(self.tools.iter().cloned())
            .with_settings(self.settings.clone())
            .on_tool_event(self.tool_event_sink(env));
        if !self.delegates.is_empty() {
            request = request.with_tool(Arc::new(TransferTool::new(self, env.clone(), depth)));
        }
        if let Some(token) = &env.cancel {
            request = request.with_cancel(token.clone());
        }

        debug!(agent = %self.name, model = %self.model, depth, "agent running");
        let message = env.client.perform(request).await?;
        Ok(message.text())
    }

    /// Maps tool-loop activity onto agent events; transfers report through
    /// `delegated` instead.
    fn tool_event_sink(&self, env: &AgentEnv) -> impl Fn(LoopEvent) + Send + Sync + 'static {
        let events = env.events.clone();
        let agent = self.name.clone();
        move |event| match event {
            LoopEvent::ToolCalled { selection } if selection.name != TRANSFER_TOOL_NAME => {
                events.emit(AgentEvent::ToolCalled {
                    agent: agent.clone(),
                    tool: selection.name,
                    arguments: selection.arguments,
                });
            }
            LoopEvent::ToolCompleted { selection, result } if selection.name != TRANSFER_TOOL_NAME => {
                events.emit(AgentEvent::ToolCompleted {
                    agent: agent.clone(),
                    tool: selection.name,
                    result: result.result_text,
                    is_error: result.is_error,
                });
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field(
                "delegates",
                &self.delegates.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
