//! Tests for layered configuration.

use std::collections::HashMap;
use std::io::Write;

use pretty_assertions::assert_eq;

use parley::config::{ParleyConfig, DEFAULT_MAX_DELEGATION_DEPTH};
use parley::error::ParleyError;

const SAMPLE: &str = r#"
stream_idle_timeout_ms = 30000
max_delegation_depth = 3

[providers.openai]
api_key = "sk-file"
base_url = "http://file.local/v1"

[providers.anthropic]
api_key = "sk-ant-file"
"#;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn loads_toml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();

    let config = ParleyConfig::from_file(file.path()).unwrap().unwrap();
    assert_eq!(config.get_api_key("openai").as_deref(), Some("sk-file"));
    assert_eq!(config.get_base_url("openai").as_deref(), Some("http://file.local/v1"));
    assert!(config.has_credentials("anthropic"));
    assert!(!config.has_credentials("google"));
    assert_eq!(config.stream_idle_timeout().unwrap().as_millis(), 30_000);
    assert_eq!(config.max_delegation_depth(), 3);
}

#[test]
fn missing_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = ParleyConfig::from_file(&dir.path().join("config.toml")).unwrap();
    assert!(config.is_none());
}

#[test]
fn unknown_keys_are_rejected() {
    let err = ParleyConfig::from_toml_str("retries = 3").unwrap_err();
    assert!(matches!(err, ParleyError::Configuration(msg) if msg.contains("retries")));
}

#[test]
fn environment_overrides_file() {
    let mut config = ParleyConfig::from_toml_str(SAMPLE).unwrap();
    config.apply_env(lookup(&[
        ("OPENAI_API_KEY", "sk-env"),
        ("GEMINI_API_KEY", "gem-env"),
        ("PARLEY_MAX_DELEGATION_DEPTH", "5"),
    ]));

    assert_eq!(config.get_api_key("openai").as_deref(), Some("sk-env"));
    assert_eq!(config.get_base_url("openai").as_deref(), Some("http://file.local/v1"));
    assert_eq!(config.get_api_key("anthropic").as_deref(), Some("sk-ant-file"));
    assert_eq!(config.get_api_key("google").as_deref(), Some("gem-env"));
    assert_eq!(config.max_delegation_depth(), 5);
}

#[test]
fn explicit_setters_override_environment() {
    let mut config = ParleyConfig::new();
    config.apply_env(lookup(&[("OPENAI_API_KEY", "sk-env")]));
    config.set_api_key("openai", "sk-code".into());
    assert_eq!(config.get_api_key("openai").as_deref(), Some("sk-code"));
}

#[test]
fn invalid_numeric_env_values_are_ignored() {
    let mut config = ParleyConfig::new();
    config.apply_env(lookup(&[
        ("PARLEY_STREAM_IDLE_TIMEOUT_MS", "soon"),
        ("PARLEY_MAX_DELEGATION_DEPTH", "-1"),
    ]));
    assert!(config.stream_idle_timeout().is_none());
    assert_eq!(config.max_delegation_depth(), DEFAULT_MAX_DELEGATION_DEPTH);
}

#[test]
fn registry_follows_credentials_in_fixed_order() {
    let config = ParleyConfig::new();
    assert!(config.build_registry().is_empty());

    config.set_api_key("google", "g".into());
    config.set_api_key("openai", "o".into());
    let registry = config.build_registry();
    assert_eq!(registry.provider_names(), vec!["openai", "google"]);
}

#[test]
fn debug_output_hides_keys() {
    let config = ParleyConfig::new();
    config.set_api_key("openai", "sk-secret".into());
    let rendered = format!("{config:?}");
    assert!(rendered.contains("openai"));
    assert!(!rendered.contains("sk-secret"));
}
