//! Tests for adapter dispatch through the client.

mod common;

use std::sync::Arc;

use common::*;
use parley::chat::{ChatRequest, Client};
use parley::error::{ErrorCategory, ParleyError};
use parley::models::Model;
use parley::provider::anthropic::AnthropicAdapter;
use parley::provider::openai::OpenAiAdapter;
use parley::provider::ProviderRegistry;
use parley::types::Message;

fn request(model: Model) -> ChatRequest {
    ChatRequest::new(model, vec![Message::user("hi")])
}

#[tokio::test]
async fn first_registered_adapter_wins() {
    let transport = ScriptedTransport::new();
    transport.push(text_response("ok"));
    let registry = ProviderRegistry::new()
        .with(Arc::new(OpenAiAdapter::new("first").with_base_url("http://first/v1")))
        .with(Arc::new(OpenAiAdapter::new("second").with_base_url("http://second/v1")));
    let client = Client::new(registry).with_transport(transport.clone());

    assert_eq!(client.registry().claimants(&request(model())), vec!["openai", "openai"]);

    client.perform(request(model())).await.unwrap();
    let sent = transport.requests();
    assert_eq!(sent[0].url, "http://first/v1/chat/completions");
    assert_eq!(sent[0].header_value("authorization"), Some("Bearer first"));
}

#[tokio::test]
async fn routes_by_provider_tag() {
    let transport = ScriptedTransport::new();
    transport.push(json_reply(serde_json::json!({
        "content": [{ "type": "text", "text": "bonjour" }],
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 3, "output_tokens": 1 },
    })));
    let registry = ProviderRegistry::new()
        .with(Arc::new(OpenAiAdapter::new("sk-openai")))
        .with(Arc::new(AnthropicAdapter::new("sk-ant").with_base_url("http://claude/v1")));
    let client = Client::new(registry).with_transport(transport.clone());

    let reply = client
        .perform(request(Model::new("anthropic", "claude-sonnet-4-5")))
        .await
        .unwrap();
    assert_eq!(reply.text(), "bonjour");
    assert_eq!(transport.requests()[0].url, "http://claude/v1/messages");
}

#[tokio::test]
async fn unclaimed_model_fails_before_any_io() {
    let transport = ScriptedTransport::new();
    let client = openai_client(transport.clone());

    let err = client
        .perform(request(Model::new("mistral", "large")))
        .await
        .unwrap_err();
    assert!(matches!(
        &err,
        ParleyError::UnregisteredProvider { model } if model == "mistral:large"
    ));
    assert_eq!(err.category(), ErrorCategory::Routing);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn compatible_adapter_claims_its_own_tag() {
    let transport = ScriptedTransport::new();
    transport.push(text_response("local"));
    let registry = ProviderRegistry::new()
        .with(Arc::new(OpenAiAdapter::new("sk-openai")))
        .with(Arc::new(
            OpenAiAdapter::new("unused")
                .with_base_url("http://localhost:11434/v1")
                .compatible("ollama", "ollama"),
        ));
    let client = Client::new(registry).with_transport(transport.clone());

    let model = Model::parse("ollama:llama3.3:70b").unwrap();
    assert_eq!(client.registry().claimants(&request(model.clone())), vec!["ollama"]);
    client.perform(request(model)).await.unwrap();
    let sent = transport.requests();
    assert_eq!(sent[0].url, "http://localhost:11434/v1/chat/completions");
    assert_eq!(sent[0].body["model"], "llama3.3:70b");
}
