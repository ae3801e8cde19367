//! Tool-call loop: run requested tools, append results, re-issue.

use std::sync::Arc;

use tracing::{debug, warn};

use super::client::{cancellable, Client};
use super::request::ChatRequest;
use crate::error::ParleyError;
use crate::tools::{ToolArguments, ToolContext};
use crate::types::{Message, Role, ToolResult, ToolSelection, Usage};

/// Tool activity reported while the loop runs.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    /// About to invoke a tool.
    ToolCalled { selection: ToolSelection },
    /// A tool finished, successfully or not.
    ToolCompleted {
        selection: ToolSelection,
        result: ToolResult,
    },
}

/// Observer for [`LoopEvent`]s.
pub type ToolEventSink = Arc<dyn Fn(LoopEvent) + Send + Sync>;

/// Result of a finished tool loop.
#[derive(Debug, Clone)]
pub struct ToolLoopOutcome {
    /// The final assistant message (no pending selections).
    pub message: Message,
    /// Full conversation, including every intermediate turn.
    pub messages: Vec<Message>,
    /// Usage summed over every request.
    pub usage: Usage,
    /// Number of requests issued.
    pub iterations: usize,
}

pub(crate) fn check_iteration_bound(request: &ChatRequest, iterations: usize) -> Result<(), ParleyError> {
    match request.max_iterations {
        Some(max) if iterations >= max => Err(ParleyError::IterationLimit(max)),
        _ => Ok(()),
    }
}

/// Run the loop with non-streaming requests until a response selects no tools.
pub(crate) async fn run_tool_loop(
    client: &Client,
    mut request: ChatRequest,
) -> Result<ToolLoopOutcome, ParleyError> {
    let mut usage = Usage::default();
    let mut iterations = 0;

    loop {
        check_iteration_bound(&request, iterations)?;
        iterations += 1;
        debug!(model = %request.model, iteration = iterations, "tool loop request");

        let completed = client.complete(&request).await?;
        usage.merge(&completed.usage);
        request.messages.push(completed.message.clone());

        if !completed.has_tool_selections() {
            return Ok(ToolLoopOutcome {
                message: completed.message,
                messages: request.messages,
                usage,
                iterations,
            });
        }

        let results = resolve_tool_selections(&request, &completed.message.tool_selections).await?;
        request.messages.extend(results.into_iter().map(Message::tool));
    }
}

/// Text the model sees for a failed tool.
fn failure_text(error: &ParleyError) -> String {
    match error {
        ParleyError::ToolExecution { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Execute selections one at a time, in order.
///
/// Unknown tools and undecodable arguments abort; domain failures become
/// error results.
pub async fn resolve_tool_selections(
    request: &ChatRequest,
    selections: &[ToolSelection],
) -> Result<Vec<ToolResult>, ParleyError> {
    let mut results = Vec::with_capacity(selections.len());
    for selection in selections {
        let tool = request
            .find_tool(&selection.name)
            .ok_or_else(|| ParleyError::UnknownTool(selection.name.clone()))?;
        let args = ToolArguments::parse(&selection.name, &selection.arguments)?;
        let ctx = ToolContext {
            tool_selection_id: selection.id.clone(),
        };

        if let Some(sink) = &request.tool_events {
            sink(LoopEvent::ToolCalled {
                selection: selection.clone(),
            });
        }
        debug!(tool = %selection.name, id = %selection.id, "executing tool");

        let result = match cancellable(request.cancel.as_ref(), tool.execute(&args, &ctx)).await? {
            Ok(text) => ToolResult::success(&selection.id, text),
            Err(e) if !e.is_loop_fatal() => {
                warn!(tool = %selection.name, error = %e, "tool failed; reporting to model");
                ToolResult::error(&selection.id, failure_text(&e))
            }
            Err(e) => return Err(e),
        };

        if let Some(sink) = &request.tool_events {
            sink(LoopEvent::ToolCompleted {
                selection: selection.clone(),
                result: result.clone(),
            });
        }
        results.push(result);
    }
    Ok(results)
}

/// Check that every tool message answers a selection of the nearest
/// preceding assistant message.
pub fn validate_tool_results(messages: &[Message]) -> Result<(), ParleyError> {
    for (idx, message) in messages.iter().enumerate() {
        if message.role != Role::Tool {
            continue;
        }
        let Some(result) = &message.tool_result else {
            return Err(ParleyError::ToolProtocol(format!(
                "tool message {} carries no tool result",
                message.id
            )));
        };
        let owner = messages[..idx].iter().rev().find(|m| m.role != Role::Tool);
        let answered = owner.is_some_and(|m| {
            m.role == Role::Assistant
                && m.tool_selections
                    .iter()
                    .any(|s| s.id == result.tool_selection_id)
        });
        if !answered {
            return Err(ParleyError::ToolProtocol(format!(
                "tool result '{}' does not match a selection in the preceding assistant message",
                result.tool_selection_id
            )));
        }
    }
    Ok(())
}
