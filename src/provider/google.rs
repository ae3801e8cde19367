//! Google Gemini adapter.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;
use serde_json::{json, Value};

use super::sse::decode_sse_frame;
use super::{parse_json, Frame, ProviderAdapter, WireRequest};
use crate::chat::ChatRequest;
use crate::error::ParleyError;
use crate::types::*;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Adapter for `generateContent` / `streamGenerateContent`.
#[derive(Debug, Clone)]
pub struct GoogleAdapter {
    api_key: String,
    base_url: String,
}

impl GoogleAdapter {
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

    fn build_request_body(&self, request: &ChatRequest) -> Result<Value, ParleyError> {
        let mut system_parts: Vec<Value> = Vec::new();
        let mut contents: Vec<Value> = Vec::new();
        // Gemini answers calls by function name, not id.
        let mut selection_names: Vec<(&str, &str)> = Vec::new();

        for msg in &request.messages {
            match msg.role {
                Role::System => system_parts.push(json!({ "text": msg.text() })),
                Role::User => contents.push(json!({
                    "role": "user",
                    "parts": [{ "text": msg.text() }],
                })),
                Role::Assistant => {
                    let mut parts: Vec<Value> = Vec::new();
                    let text = msg.text();
                    if !text.is_empty() {
                        parts.push(json!({ "text": text }));
                    }
                    for selection in &msg.tool_selections {
                        selection_names.push((selection.id.as_str(), selection.name.as_str()));
                        let args: Value =
                            serde_json::from_str(&selection.arguments).unwrap_or_else(|_| json!({}));
                        parts.push(json!({
                            "functionCall": { "name": selection.name, "args": args }
                        }));
                    }
                    if !parts.is_empty() {
                        contents.push(json!({ "role": "model", "parts": parts }));
                    }
                }
                Role::Tool => {
                    let Some(result) = &msg.tool_result else {
                        continue;
                    };
                    let name = selection_names
                        .iter()
                        .rev()
                        .find(|(id, _)| *id == result.tool_selection_id)
                        .map(|(_, name)| *name)
                        .unwrap_or_default();
                    let key = if result.is_error { "error" } else { "content" };
                    let part = json!({
                        "functionResponse": {
                            "name": name,
                            "response": { key: result.result_text },
                        }
                    });
                    match contents.last_mut() {
                        Some(last) if is_function_response(last) => {
                            if let Some(parts) = last["parts"].as_array_mut() {
                                parts.push(part);
                            }
                        }
                        _ => contents.push(json!({ "role": "user", "parts": [part] })),
                    }
                }
            }
        }

        let mut body = json!({ "contents": contents });
        let Some(obj) = body.as_object_mut() else {
            return Ok(body);
        };

        if !system_parts.is_empty() {
            obj.insert("systemInstruction".into(), json!({ "parts": system_parts }));
        }

        let settings = &request.settings;
        let mut config = serde_json::Map::new();
        if let Some(max) = settings.max_tokens {
            config.insert("maxOutputTokens".into(), max.into());
        }
        if let Some(temp) = settings.temperature {
            config.insert("temperature".into(), temp.into());
        }
        if let Some(top_p) = settings.top_p {
            config.insert("topP".into(), top_p.into());
        }
        if let Some(ref stops) = settings.stop_sequences {
            config.insert("stopSequences".into(), json!(stops));
        }
        if !config.is_empty() {
            obj.insert("generationConfig".into(), Value::Object(config));
        }

        let tools = request.tool_definitions()?;
        if !tools.is_empty() {
            let declarations: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    })
                })
                .collect();
            obj.insert(
                "tools".into(),
                json!([{ "functionDeclarations": declarations }]),
            );
        }

        Ok(body)
    }
}

fn is_function_response(content: &Value) -> bool {
    content["role"] == "user"
        && content["parts"]
            .as_array()
            .and_then(|parts| parts.first())
            .is_some_and(|part| part.get("functionResponse").is_some())
}

fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "STOP" => Some(FinishReason::Stop),
        "MAX_TOKENS" => Some(FinishReason::Length),
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => {
            Some(FinishReason::ContentFilter)
        }
        "MALFORMED_FUNCTION_CALL" => Some(FinishReason::Error),
        _ => None,
    }
}

impl ProviderAdapter for GoogleAdapter {
    fn name(&self) -> &str {
        "google"
    }

    fn accepts(&self, request: &ChatRequest) -> bool {
        request.model.provider == "google"
    }

    fn encode(&self, request: &ChatRequest, stream: bool) -> Result<WireRequest, ParleyError> {
        let body = self.build_request_body(request)?;
        let url = if stream {
            format!(
                "{}/models/{}:streamGenerateContent?alt=sse",
                self.base_url, request.model.id
            )
        } else {
            format!("{}/models/{}:generateContent", self.base_url, request.model.id)
        };
        Ok(WireRequest::post(url, body).header("x-goog-api-key", &self.api_key))
    }

    fn decode_frame(&self, buffer: &[u8]) -> Result<Option<Frame>, ParleyError> {
        decode_sse_frame(buffer, |event| {
            if event.data.trim().is_empty() {
                return Ok(None);
            }
            let chunk: GenerateResponse = parse_json(event.data.as_bytes())?;
            Ok(Some(chunk.into_delta()))
        })
    }

    fn decode_response(&self, body: &[u8]) -> Result<MessageDelta, ParleyError> {
        let response: GenerateResponse = parse_json(body)?;
        Ok(response.into_delta())
    }
}

/// Gemini calls carry no position, and a stream may send several chunks that
/// each hold whole calls. Every decoded call gets its own index so fragments
/// from different calls never merge.
static NEXT_CALL_INDEX: AtomicUsize = AtomicUsize::new(0);

// Wire types (internal)

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GenerateResponse {
    fn into_delta(self) -> MessageDelta {
        let mut delta = MessageDelta::role(Role::Assistant);
        if let Some(candidate) = self.candidates.into_iter().next() {
            let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
            for part in parts {
                if let Some(text) = part.text {
                    delta.text.push_str(&text);
                }
                if let Some(call) = part.function_call {
                    // Calls arrive whole and without ids; give each one a fresh id.
                    let args = if call.args.is_null() { json!({}) } else { call.args };
                    delta.tool_selections.push(ToolSelectionDelta {
                        index: NEXT_CALL_INDEX.fetch_add(1, Ordering::Relaxed),
                        id: Some(format!("call_{}", uuid::Uuid::new_v4().simple())),
                        name: Some(call.name),
                        arguments_fragment: args.to_string(),
                    });
                }
            }
            delta.finish_reason = candidate.finish_reason.as_deref().and_then(parse_finish_reason);
        }
        delta.usage = self
            .usage_metadata
            .map(|u| Usage::new(u.prompt_token_count, u.candidates_token_count));
        delta
    }
}
