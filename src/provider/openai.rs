//! OpenAI Chat Completions adapter.
//!
//! Also serves OpenAI-compatible endpoints: register another instance with a
//! different name, base URL, and provider tag.

use serde::Deserialize;
use serde_json::{json, Value};

use super::http::bearer;
use super::sse::decode_sse_frame;
use super::{parse_json, Frame, ProviderAdapter, WireRequest};
use crate::chat::ChatRequest;
use crate::error::ParleyError;
use crate::types::*;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Adapter for `/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    name: String,
    api_key: String,
    base_url: String,
    provider_tags: Vec<String>,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "openai".to_string(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            provider_tags: vec!["openai".to_string()],
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Rename the adapter and route a different provider tag to it.
    pub fn compatible(mut self, name: impl Into<String>, provider_tag: impl Into<String>) -> Self {
        self.name = name.into();
        self.provider_tags = vec![provider_tag.into()];
        self
    }

    fn build_request_body(&self, request: &ChatRequest, stream: bool) -> Result<Value, ParleyError> {
        let messages: Vec<Value> = request.messages.iter().map(message_to_openai).collect();

        let mut body = json!({
            "model": request.model.id,
            "messages": messages,
            "stream": stream,
        });
        let Some(obj) = body.as_object_mut() else {
            return Ok(body);
        };

        if stream {
            obj.insert("stream_options".into(), json!({"include_usage": true}));
        }
        let settings = &request.settings;
        if let Some(max) = settings.max_tokens {
            obj.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = settings.temperature {
            obj.insert("temperature".into(), temp.into());
        }
        if let Some(top_p) = settings.top_p {
            obj.insert("top_p".into(), top_p.into());
        }
        if let Some(ref stops) = settings.stop_sequences {
            obj.insert("stop".into(), json!(stops));
        }

        let tools = request.tool_definitions()?;
        if !tools.is_empty() {
            let defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            obj.insert("tools".into(), defs.into());
        }

        Ok(body)
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, request: &ChatRequest) -> bool {
        self.provider_tags.iter().any(|tag| *tag == request.model.provider)
    }

    fn encode(&self, request: &ChatRequest, stream: bool) -> Result<WireRequest, ParleyError> {
        let body = self.build_request_body(request, stream)?;
        let (name, value) = bearer(&self.api_key);
        Ok(WireRequest::post(format!("{}/chat/completions", self.base_url), body).header(name, value))
    }

    fn decode_frame(&self, buffer: &[u8]) -> Result<Option<Frame>, ParleyError> {
        decode_sse_frame(buffer, |event| {
            if event.data.trim() == "[DONE]" || event.data.trim().is_empty() {
                return Ok(None);
            }
            let chunk: StreamChunk = parse_json(event.data.as_bytes())?;
            Ok(Some(chunk.into_delta()))
        })
    }

    fn decode_response(&self, body: &[u8]) -> Result<MessageDelta, ParleyError> {
        let response: ChatResponse = parse_json(body)?;
        let mut delta = MessageDelta::role(Role::Assistant);
        if let Some(choice) = response.choices.into_iter().next() {
            delta.text = choice.message.content.unwrap_or_default();
            delta.tool_selections = choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .enumerate()
                .map(|(index, call)| ToolSelectionDelta {
                    index,
                    id: Some(call.id),
                    name: Some(call.function.name),
                    arguments_fragment: call.function.arguments,
                })
                .collect();
            delta.finish_reason = choice.finish_reason.as_deref().and_then(parse_finish_reason);
        }
        delta.usage = response.usage.map(WireUsage::into_usage);
        Ok(delta)
    }
}

pub(crate) fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" | "function_call" => Some(FinishReason::ToolCalls),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

fn message_to_openai(msg: &Message) -> Value {
    match msg.role {
        Role::Tool => {
            let (id, text) = match &msg.tool_result {
                Some(result) => (result.tool_selection_id.as_str(), result.result_text.clone()),
                None => ("", msg.text()),
            };
            json!({ "role": "tool", "tool_call_id": id, "content": text })
        }
        Role::Assistant if !msg.tool_selections.is_empty() => {
            let calls: Vec<Value> = msg
                .tool_selections
                .iter()
                .map(|s| {
                    json!({
                        "id": s.id,
                        "type": "function",
                        "function": { "name": s.name, "arguments": s.arguments },
                    })
                })
                .collect();
            let text = msg.text();
            json!({
                "role": "assistant",
                "content": if text.is_empty() { Value::Null } else { Value::String(text) },
                "tool_calls": calls,
            })
        }
        role => json!({ "role": role.to_string(), "content": msg.text() }),
    }
}

// Wire types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Deserialize)]
struct ResponseToolCall {
    id: String,
    function: ResponseFunction,
}

#[derive(Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl WireUsage {
    fn into_usage(self) -> Usage {
        Usage::new(self.prompt_tokens, self.completion_tokens)
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    role: Option<Role>,
    content: Option<String>,
    tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Deserialize)]
struct StreamToolCall {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<StreamFunction>,
}

#[derive(Deserialize)]
struct StreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}

impl StreamChunk {
    fn into_delta(self) -> MessageDelta {
        let mut delta = MessageDelta {
            usage: self.usage.map(WireUsage::into_usage),
            ..Default::default()
        };
        if let Some(choice) = self.choices.into_iter().next() {
            delta.role = choice.delta.role;
            delta.text = choice.delta.content.unwrap_or_default();
            delta.tool_selections = choice
                .delta
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| {
                    let (name, arguments) = match call.function {
                        Some(f) => (f.name, f.arguments.unwrap_or_default()),
                        None => (None, String::new()),
                    };
                    ToolSelectionDelta {
                        index: call.index,
                        id: call.id,
                        name,
                        arguments_fragment: arguments,
                    }
                })
                .collect();
            delta.finish_reason = choice.finish_reason.as_deref().and_then(parse_finish_reason);
        }
        delta
    }
}
