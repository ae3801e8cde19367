//! Shared test helpers: a scripted transport and OpenAI wire fixtures.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use parley::chat::Client;
use parley::error::ParleyError;
use parley::models::Model;
use parley::provider::openai::OpenAiAdapter;
use parley::provider::{ProviderRegistry, Transport, TransportResponse, WireRequest};

/// One canned transport outcome.
pub enum Reply {
    /// Status plus body chunks, delivered one per stream item.
    Body { status: u16, chunks: Vec<Vec<u8>> },
    /// `send` itself fails.
    Fail(String),
    /// Deliver the chunks, then never finish.
    Hang { chunks: Vec<Vec<u8>> },
}

/// Transport that replays queued replies and records what it was sent.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<WireRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: WireRequest) -> Result<TransportResponse, ParleyError> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ParleyError::Transport("no scripted reply left".into()))?;
        match reply {
            Reply::Body { status, chunks } => Ok(TransportResponse {
                status,
                body: futures::stream::iter(chunks.into_iter().map(Ok)).boxed(),
            }),
            Reply::Fail(message) => Err(ParleyError::Transport(message)),
            Reply::Hang { chunks } => Ok(TransportResponse {
                status: 200,
                body: futures::stream::iter(chunks.into_iter().map(Ok))
                    .chain(futures::stream::pending())
                    .boxed(),
            }),
        }
    }
}

pub fn model() -> Model {
    Model::new("openai", "gpt-4o")
}

/// Client routing `openai:*` through `transport`.
pub fn openai_client(transport: Arc<ScriptedTransport>) -> Client {
    let registry = ProviderRegistry::new().with(Arc::new(OpenAiAdapter::new("sk-test")));
    Client::new(registry).with_transport(transport)
}

// Non-streaming bodies

pub fn text_response(text: &str) -> Reply {
    json_reply(json!({
        "choices": [{
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop",
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5 },
    }))
}

/// Response selecting `(id, name, arguments)` tools.
pub fn tool_call_response(calls: &[(&str, &str, Value)]) -> Reply {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, args)| {
            json!({
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": args.to_string() },
            })
        })
        .collect();
    json_reply(json!({
        "choices": [{
            "message": { "role": "assistant", "content": null, "tool_calls": tool_calls },
            "finish_reason": "tool_calls",
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5 },
    }))
}

pub fn json_reply(body: Value) -> Reply {
    Reply::Body {
        status: 200,
        chunks: vec![body.to_string().into_bytes()],
    }
}

pub fn error_reply(status: u16, body: &str) -> Reply {
    Reply::Body {
        status,
        chunks: vec![body.as_bytes().to_vec()],
    }
}

// Streaming bodies

/// One SSE `data:` event.
pub fn sse_event(data: &Value) -> Vec<u8> {
    format!("data: {data}\n\n").into_bytes()
}

pub fn sse_done() -> Vec<u8> {
    b"data: [DONE]\n\n".to_vec()
}

/// Chat-completion chunk with a content delta.
pub fn content_chunk(text: &str) -> Value {
    json!({ "choices": [{ "index": 0, "delta": { "content": text }, "finish_reason": null }] })
}

pub fn role_chunk() -> Value {
    json!({ "choices": [{ "index": 0, "delta": { "role": "assistant" }, "finish_reason": null }] })
}

pub fn finish_chunk(reason: &str) -> Value {
    json!({ "choices": [{ "index": 0, "delta": {}, "finish_reason": reason }] })
}

pub fn tool_call_chunk(index: usize, id: Option<&str>, name: Option<&str>, args: &str) -> Value {
    let mut function = json!({ "arguments": args });
    if let Some(name) = name {
        function["name"] = json!(name);
    }
    let mut call = json!({ "index": index, "type": "function", "function": function });
    if let Some(id) = id {
        call["id"] = json!(id);
    }
    json!({ "choices": [{ "index": 0, "delta": { "tool_calls": [call] }, "finish_reason": null }] })
}

/// Each event in its own chunk, terminated by `[DONE]`.
pub fn sse_reply(events: &[Value]) -> Reply {
    let mut chunks: Vec<Vec<u8>> = events.iter().map(sse_event).collect();
    chunks.push(sse_done());
    Reply::Body { status: 200, chunks }
}

/// Streamed text response split into `pieces`.
pub fn sse_text_reply(pieces: &[&str]) -> Reply {
    let mut events = vec![role_chunk()];
    events.extend(pieces.iter().map(|p| content_chunk(p)));
    events.push(finish_chunk("stop"));
    sse_reply(&events)
}
