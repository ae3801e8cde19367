//! Configuration system (layered: code > env > config file).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::chat::Client;
use crate::error::ParleyError;
use crate::provider::ProviderRegistry;

/// Delegation depth used when nothing else is configured.
pub const DEFAULT_MAX_DELEGATION_DEPTH: usize = 8;

const API_KEY_VARS: [(&str, &str); 4] = [
    ("OPENAI_API_KEY", "openai"),
    ("ANTHROPIC_API_KEY", "anthropic"),
    ("GEMINI_API_KEY", "google"),
    ("GOOGLE_API_KEY", "google"),
];

const BASE_URL_VARS: [(&str, &str); 3] = [
    ("OPENAI_BASE_URL", "openai"),
    ("ANTHROPIC_BASE_URL", "anthropic"),
    ("GOOGLE_BASE_URL", "google"),
];

/// Layered configuration for parley.
///
/// Later layers override earlier ones: the TOML file, then environment
/// variables, then explicit setters.
#[derive(Clone, Default)]
pub struct ParleyConfig {
    api_keys: Arc<RwLock<HashMap<String, String>>>,
    base_urls: Arc<RwLock<HashMap<String, String>>>,
    stream_idle_timeout_ms: Option<u64>,
    max_delegation_depth: Option<usize>,
}

impl fmt::Debug for ParleyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut providers: Vec<String> = self
            .api_keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        providers.sort();
        f.debug_struct("ParleyConfig")
            .field("api_keys", &providers)
            .field("base_urls", &self.base_urls)
            .field("stream_idle_timeout_ms", &self.stream_idle_timeout_ms)
            .field("max_delegation_depth", &self.max_delegation_depth)
            .finish()
    }
}

/// On-disk shape of `config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    stream_idle_timeout_ms: Option<u64>,
    max_delegation_depth: Option<usize>,
    #[serde(default)]
    providers: HashMap<String, ProviderSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderSection {
    api_key: Option<String>,
    base_url: Option<String>,
}

impl ParleyConfig {
    /// Empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default file location: `<config dir>/parley/config.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("parley").join("config.toml"))
    }

    /// File layer (when present) overlaid with the environment.
    pub fn load() -> Result<Self, ParleyError> {
        let mut config = match Self::default_config_path() {
            Some(path) => Self::from_file(&path)?.unwrap_or_default(),
            None => Self::new(),
        };
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load from environment variables (OPENAI_API_KEY, ANTHROPIC_API_KEY, etc.).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::new();
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Read a TOML config file. A missing file is `Ok(None)`.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ParleyError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(ParleyError::Configuration(format!(
                    "Failed to read {}: {err}",
                    path.display()
                )))
            }
        };
        Self::from_toml_str(&raw).map(Some)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ParleyError> {
        let file: FileConfig = toml::from_str(raw)
            .map_err(|e| ParleyError::Configuration(format!("Invalid config file: {e}")))?;
        let config = Self {
            stream_idle_timeout_ms: file.stream_idle_timeout_ms,
            max_delegation_depth: file.max_delegation_depth,
            ..Self::default()
        };
        for (provider, section) in file.providers {
            if let Some(key) = section.api_key {
                config.set_api_key(&provider, key);
            }
            if let Some(url) = section.base_url {
                config.set_base_url(&provider, url);
            }
        }
        Ok(config)
    }

    /// Overlay environment variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, provider) in API_KEY_VARS {
            if let Some(key) = lookup(var).filter(|v| !v.is_empty()) {
                self.set_api_key(provider, key);
            }
        }
        for (var, provider) in BASE_URL_VARS {
            if let Some(url) = lookup(var).filter(|v| !v.is_empty()) {
                self.set_base_url(provider, url);
            }
        }
        if let Some(raw) = lookup("PARLEY_STREAM_IDLE_TIMEOUT_MS") {
            match raw.trim().parse() {
                Ok(ms) => self.stream_idle_timeout_ms = Some(ms),
                Err(e) => warn!(value = %raw, error = %e, "ignoring PARLEY_STREAM_IDLE_TIMEOUT_MS"),
            }
        }
        if let Some(raw) = lookup("PARLEY_MAX_DELEGATION_DEPTH") {
            match raw.trim().parse() {
                Ok(depth) => self.max_delegation_depth = Some(depth),
                Err(e) => warn!(value = %raw, error = %e, "ignoring PARLEY_MAX_DELEGATION_DEPTH"),
            }
        }
    }

    pub fn set_api_key(&self, provider: &str, key: String) {
        self.api_keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(provider.to_string(), key);
    }

    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        self.api_keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider)
            .cloned()
    }

    pub fn set_base_url(&self, provider: &str, url: String) {
        self.base_urls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(provider.to_string(), url);
    }

    pub fn get_base_url(&self, provider: &str) -> Option<String> {
        self.base_urls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider)
            .cloned()
    }

    pub fn has_credentials(&self, provider: &str) -> bool {
        self.get_api_key(provider).is_some()
    }

    pub fn with_stream_idle_timeout_ms(mut self, ms: u64) -> Self {
        self.stream_idle_timeout_ms = Some(ms);
        self
    }

    pub fn with_max_delegation_depth(mut self, depth: usize) -> Self {
        self.max_delegation_depth = Some(depth);
        self
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        self.stream_idle_timeout_ms.map(Duration::from_millis)
    }

    pub fn max_delegation_depth(&self) -> usize {
        self.max_delegation_depth.unwrap_or(DEFAULT_MAX_DELEGATION_DEPTH)
    }

    /// Register the built-in adapters that have credentials, in the fixed
    /// order openai, anthropic, google.
    pub fn build_registry(&self) -> ProviderRegistry {
        #[allow(unused_mut)]
        let mut registry = ProviderRegistry::new();

        #[cfg(feature = "openai")]
        if let Some(key) = self.get_api_key("openai") {
            let mut adapter = crate::provider::openai::OpenAiAdapter::new(key);
            if let Some(url) = self.get_base_url("openai") {
                adapter = adapter.with_base_url(url);
            }
            registry.register(Arc::new(adapter));
        }

        #[cfg(feature = "anthropic")]
        if let Some(key) = self.get_api_key("anthropic") {
            let mut adapter = crate::provider::anthropic::AnthropicAdapter::new(key);
            if let Some(url) = self.get_base_url("anthropic") {
                adapter = adapter.with_base_url(url);
            }
            registry.register(Arc::new(adapter));
        }

        #[cfg(feature = "google")]
        if let Some(key) = self.get_api_key("google") {
            let mut adapter = crate::provider::google::GoogleAdapter::new(key);
            if let Some(url) = self.get_base_url("google") {
                adapter = adapter.with_base_url(url);
            }
            registry.register(Arc::new(adapter));
        }

        registry
    }

    /// A [`Client`] over [`build_registry`](Self::build_registry).
    pub fn client(&self) -> Client {
        let client = Client::new(self.build_registry());
        match self.stream_idle_timeout() {
            Some(idle) => client.with_stream_idle_timeout(idle),
            None => client,
        }
    }
}
