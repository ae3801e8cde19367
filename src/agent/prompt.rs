//! System prompt assembly for agents.

use super::agent::Agent;
use super::delegation::TRANSFER_TOOL_NAME;

/// Build the system prompt from description, instructions, tools and delegates.
pub fn build_system_prompt(agent: &Agent) -> String {
    let mut sections = vec![format!("You are {}. {}", agent.name(), agent.description())];

    if !agent.instructions().is_empty() {
        sections.push(format!("## Instructions\n{}", agent.instructions()));
    }

    if !agent.tools().is_empty() {
        let tool_list = agent
            .tools()
            .iter()
            .map(|t| format!("- `{}`: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("## Available Tools\n{tool_list}"));
    }

    if !agent.delegates().is_empty() {
        let delegate_list = agent
            .delegates()
            .iter()
            .map(|d| format!("- `{}`: {}", d.name(), d.description()))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!(
            "## Delegates\nHand a task to one of these agents with the `{TRANSFER_TOOL_NAME}` tool, \
             giving the agent's name and the reason for the hand-off.\n{delegate_list}"
        ));
    }

    sections.join("\n\n")
}
