//! Error types for parley.

use thiserror::Error;

/// Boxed source error carried by decode failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Primary error type for all parley operations.
#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No registered provider accepts model '{model}'")]
    UnregisteredProvider { model: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Malformed stream frame: {source}")]
    StreamDecode {
        /// The buffered bytes that failed to decode, lossily converted.
        buffer: String,
        #[source]
        source: BoxError,
    },

    #[error("Provider API error ({provider}, status {status}): {body}")]
    ProviderApi {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool '{tool}': {message}")]
    ToolArgumentDecode { tool: String, message: String },

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Tool protocol violation: {0}")]
    ToolProtocol(String),

    #[error("No delegate agent named '{name}' (available: {})", available.join(", "))]
    DelegationTargetNotFound { name: String, available: Vec<String> },

    #[error("Delegation depth limit of {limit} reached")]
    DelegationDepthExceeded { limit: usize },

    #[error("Tool loop exceeded {0} iterations")]
    IterationLimit(usize),

    #[error("Request canceled")]
    Canceled,
}

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Routing,
    Transport,
    Decode,
    Provider,
    Protocol,
    Tool,
    Delegation,
    Canceled,
}

impl ParleyError {
    /// Build a tool execution error; callbacks return this for domain failures.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Build a stream decode error from the offending buffer.
    pub fn stream_decode(buffer: &[u8], source: impl Into<BoxError>) -> Self {
        Self::StreamDecode {
            buffer: String::from_utf8_lossy(buffer).into_owned(),
            source: source.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::UnregisteredProvider { .. } => ErrorCategory::Routing,
            Self::Network(_) | Self::Transport(_) | Self::Timeout(_) => ErrorCategory::Transport,
            Self::StreamDecode { .. } | Self::Serialization(_) => ErrorCategory::Decode,
            Self::ProviderApi { .. } => ErrorCategory::Provider,
            Self::UnknownTool(_)
            | Self::ToolArgumentDecode { .. }
            | Self::ToolProtocol(_)
            | Self::IterationLimit(_) => ErrorCategory::Protocol,
            Self::ToolExecution { .. } => ErrorCategory::Tool,
            Self::DelegationTargetNotFound { .. } | Self::DelegationDepthExceeded { .. } => {
                ErrorCategory::Delegation
            }
            Self::Canceled => ErrorCategory::Canceled,
        }
    }

    /// Whether the error aborts the tool loop.
    ///
    /// Only framework failures do: cancellation, bad configuration and a
    /// broken tool protocol (unknown tools, undecodable arguments, orphan
    /// results, the iteration bound). Anything else a tool callback returns
    /// is a domain failure and is folded into an error tool result.
    pub fn is_loop_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Configuration | ErrorCategory::Protocol | ErrorCategory::Canceled
        )
    }

    /// Whether this error is potentially retryable by the caller.
    ///
    /// The runtime itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderApi { status, .. } => *status == 429 || (500..=599).contains(status),
            other => other.category() == ErrorCategory::Transport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ParleyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_not_loop_fatal() {
        assert!(!ParleyError::tool("search", "no results").is_loop_fatal());
        assert!(!ParleyError::DelegationTargetNotFound {
            name: "x".into(),
            available: vec![],
        }
        .is_loop_fatal());
        assert!(!ParleyError::Transport("index offline".into()).is_loop_fatal());
        assert!(!ParleyError::ProviderApi {
            provider: "search".into(),
            status: 503,
            body: String::new(),
        }
        .is_loop_fatal());
        let bad_json = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        assert!(!ParleyError::from(bad_json).is_loop_fatal());
    }

    #[test]
    fn framework_errors_are_loop_fatal() {
        assert!(ParleyError::UnknownTool("x".into()).is_loop_fatal());
        assert!(ParleyError::Canceled.is_loop_fatal());
        assert!(ParleyError::Configuration("x".into()).is_loop_fatal());
        assert!(ParleyError::ToolProtocol("x".into()).is_loop_fatal());
        assert!(ParleyError::ToolArgumentDecode {
            tool: "t".into(),
            message: "m".into(),
        }
        .is_loop_fatal());
    }

    #[test]
    fn timeouts_are_transport_errors() {
        assert_eq!(ParleyError::Timeout(5).category(), ErrorCategory::Transport);
        assert!(ParleyError::Timeout(5).is_retryable());
    }

    #[test]
    fn provider_errors_keep_body_verbatim() {
        let err = ParleyError::ProviderApi {
            provider: "openai".into(),
            status: 400,
            body: r#"{"error":{"message":"bad"}}"#.into(),
        };
        assert!(err.to_string().contains(r#"{"error":{"message":"bad"}}"#));
        assert!(!err.is_retryable());
    }

    #[test]
    fn delegation_miss_lists_available_agents() {
        let err = ParleyError::DelegationTargetNotFound {
            name: "zed".into(),
            available: vec!["alpha".into(), "beta".into()],
        };
        assert_eq!(
            err.to_string(),
            "No delegate agent named 'zed' (available: alpha, beta)"
        );
    }
}
