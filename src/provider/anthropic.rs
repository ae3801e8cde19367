//! Anthropic Messages API adapter.

use serde::Deserialize;
use serde_json::{json, Value};

use super::sse::decode_sse_frame;
use super::{parse_json, Frame, ProviderAdapter, WireRequest};
use crate::chat::ChatRequest;
use crate::error::ParleyError;
use crate::types::*;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Adapter for `/messages`.
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    api_key: String,
    base_url: String,
}

impl AnthropicAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request_body(&self, request: &ChatRequest, stream: bool) -> Result<Value, ParleyError> {
        let mut system_parts: Vec<String> = Vec::new();
        let mut messages: Vec<Value> = Vec::new();

        for msg in &request.messages {
            match msg.role {
                Role::System => system_parts.push(msg.text()),
                Role::User => messages.push(json!({ "role": "user", "content": msg.text() })),
                Role::Assistant => {
                    let mut content: Vec<Value> = Vec::new();
                    let text = msg.text();
                    if !text.is_empty() {
                        content.push(json!({ "type": "text", "text": text }));
                    }
                    for selection in &msg.tool_selections {
                        let input: Value = serde_json::from_str(&selection.arguments)
                            .unwrap_or_else(|_| json!({}));
                        content.push(json!({
                            "type": "tool_use",
                            "id": selection.id,
                            "name": selection.name,
                            "input": input,
                        }));
                    }
                    if !content.is_empty() {
                        messages.push(json!({ "role": "assistant", "content": content }));
                    }
                }
                Role::Tool => {
                    let Some(result) = &msg.tool_result else {
                        continue;
                    };
                    let block = json!({
                        "type": "tool_result",
                        "tool_use_id": result.tool_selection_id,
                        "content": result.result_text,
                        "is_error": result.is_error,
                    });
                    // Results answering one turn travel in a single user message.
                    match messages.last_mut() {
                        Some(last) if is_tool_result_message(last) => {
                            if let Some(blocks) = last["content"].as_array_mut() {
                                blocks.push(block);
                            }
                        }
                        _ => messages.push(json!({ "role": "user", "content": [block] })),
                    }
                }
            }
        }

        let settings = &request.settings;
        let mut body = json!({
            "model": request.model.id,
            "messages": messages,
            "max_tokens": settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "stream": stream,
        });
        let Some(obj) = body.as_object_mut() else {
            return Ok(body);
        };

        if !system_parts.is_empty() {
            obj.insert("system".into(), system_parts.join("\n\n").into());
        }
        if let Some(temp) = settings.temperature {
            obj.insert("temperature".into(), temp.into());
        }
        if let Some(top_p) = settings.top_p {
            obj.insert("top_p".into(), top_p.into());
        }
        if let Some(ref stops) = settings.stop_sequences {
            obj.insert("stop_sequences".into(), json!(stops));
        }

        let tools = request.tool_definitions()?;
        if !tools.is_empty() {
            let defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect();
            obj.insert("tools".into(), defs.into());
        }

        Ok(body)
    }

    fn decode_event(&self, event_type: &str, data: &str) -> Result<Option<MessageDelta>, ParleyError> {
        let event: StreamEvent = parse_json(data.as_bytes())?;
        let kind = if event.kind.is_empty() { event_type } else { event.kind.as_str() };
        let delta = match kind {
            "message_start" => {
                // Output tokens are reported cumulatively by `message_delta`.
                let usage = event
                    .message
                    .and_then(|m| m.usage)
                    .map(|u| Usage::new(u.input_tokens, 0));
                Some(MessageDelta {
                    role: Some(Role::Assistant),
                    usage,
                    ..Default::default()
                })
            }
            "content_block_start" => match event.content_block {
                Some(ContentBlock::ToolUse { id, name, .. }) => Some(MessageDelta {
                    tool_selections: vec![ToolSelectionDelta {
                        index: event.index.unwrap_or_default(),
                        id: Some(id),
                        name: Some(name),
                        arguments_fragment: String::new(),
                    }],
                    ..Default::default()
                }),
                Some(ContentBlock::Text { text }) if !text.is_empty() => Some(MessageDelta::text(text)),
                _ => None,
            },
            "content_block_delta" => {
                let delta = event.delta.unwrap_or_default();
                match delta["type"].as_str() {
                    Some("text_delta") => Some(MessageDelta::text(
                        delta["text"].as_str().unwrap_or_default(),
                    )),
                    Some("input_json_delta") => Some(MessageDelta {
                        tool_selections: vec![ToolSelectionDelta {
                            index: event.index.unwrap_or_default(),
                            id: None,
                            name: None,
                            arguments_fragment: delta["partial_json"]
                                .as_str()
                                .unwrap_or_default()
                                .to_string(),
                        }],
                        ..Default::default()
                    }),
                    _ => None,
                }
            }
            "message_delta" => {
                let finish_reason = event
                    .delta
                    .as_ref()
                    .and_then(|d| d["stop_reason"].as_str())
                    .and_then(parse_stop_reason);
                Some(MessageDelta {
                    finish_reason,
                    usage: event.usage.map(WireUsage::into_usage),
                    ..Default::default()
                })
            }
            // Mid-stream failures arrive after a 200 status.
            "error" => {
                return Err(ParleyError::ProviderApi {
                    provider: self.name().to_string(),
                    status: 200,
                    body: data.to_string(),
                })
            }
            _ => None,
        };
        Ok(delta)
    }
}

fn is_tool_result_message(message: &Value) -> bool {
    message["role"] == "user"
        && message["content"]
            .as_array()
            .and_then(|blocks| blocks.first())
            .is_some_and(|block| block["type"] == "tool_result")
}

fn parse_stop_reason(s: &str) -> Option<FinishReason> {
    match s {
        "end_turn" | "stop_sequence" => Some(FinishReason::Stop),
        "max_tokens" => Some(FinishReason::Length),
        "tool_use" => Some(FinishReason::ToolCalls),
        "refusal" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn accepts(&self, request: &ChatRequest) -> bool {
        request.model.provider == "anthropic"
    }

    fn encode(&self, request: &ChatRequest, stream: bool) -> Result<WireRequest, ParleyError> {
        let body = self.build_request_body(request, stream)?;
        Ok(WireRequest::post(format!("{}/messages", self.base_url), body)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION))
    }

    fn decode_frame(&self, buffer: &[u8]) -> Result<Option<Frame>, ParleyError> {
        decode_sse_frame(buffer, |event| {
            if event.data.trim().is_empty() {
                return Ok(None);
            }
            self.decode_event(event.event.as_deref().unwrap_or_default(), &event.data)
        })
    }

    fn decode_response(&self, body: &[u8]) -> Result<MessageDelta, ParleyError> {
        let response: MessagesResponse = parse_json(body)?;
        let mut delta = MessageDelta::role(Role::Assistant);
        let mut tool_index = 0;
        for block in response.content {
            match block {
                ContentBlock::Text { text } => delta.text.push_str(&text),
                ContentBlock::ToolUse { id, name, input } => {
                    delta.tool_selections.push(ToolSelectionDelta {
                        index: tool_index,
                        id: Some(id),
                        name: Some(name),
                        arguments_fragment: input.to_string(),
                    });
                    tool_index += 1;
                }
                ContentBlock::Other => {}
            }
        }
        delta.finish_reason = response.stop_reason.as_deref().and_then(parse_stop_reason);
        delta.usage = response.usage.map(WireUsage::into_usage);
        Ok(delta)
    }
}

// Wire types (internal)

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl WireUsage {
    fn into_usage(self) -> Usage {
        Usage::new(self.input_tokens, self.output_tokens)
    }
}

#[derive(Deserialize)]
struct StartMessage {
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default, rename = "type")]
    kind: String,
    index: Option<usize>,
    message: Option<StartMessage>,
    content_block: Option<ContentBlock>,
    delta: Option<Value>,
    usage: Option<WireUsage>,
}
