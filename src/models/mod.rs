//! Model identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParleyError;

/// A model: an opaque identifier plus the provider tag adapters route on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Model {
    pub provider: String,
    pub id: String,
}

impl Model {
    pub fn new(provider: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            id: id.into(),
        }
    }

    /// Parse "provider:model_id".
    ///
    /// Examples: "openai:gpt-4o", "anthropic:claude-sonnet-4-5", "gemini:gemini-2.0-flash".
    /// Known provider aliases are normalized (`gemini` → `google`).
    pub fn parse(s: &str) -> Result<Self, ParleyError> {
        let (provider, id) = s.split_once(':').ok_or_else(|| {
            ParleyError::Configuration(format!(
                "Invalid model selector '{s}': expected 'provider:model_id'"
            ))
        })?;
        if provider.is_empty() || id.is_empty() {
            return Err(ParleyError::Configuration(format!(
                "Invalid model selector '{s}': provider and model id must be non-empty"
            )));
        }
        let provider = match provider {
            "gemini" => "google",
            "claude" => "anthropic",
            other => other,
        };
        Ok(Self::new(provider, id))
    }
}

impl FromStr for Model {
    type Err = ParleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}
