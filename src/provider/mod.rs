//! Provider adapter contract, registry, and shared wire utilities.

pub mod http;
pub mod registry;
pub mod sse;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "anthropic")]
pub mod anthropic;

#[cfg(feature = "google")]
pub mod google;

use serde::{Deserialize, Serialize};

use crate::chat::ChatRequest;
use crate::error::ParleyError;
use crate::types::MessageDelta;

pub use http::{ByteStream, HttpTransport, Transport, TransportResponse};
pub use registry::ProviderRegistry;

/// A provider-specific HTTP request produced by [`ProviderAdapter::encode`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl WireRequest {
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// One decoded logical unit of a response stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Bytes of the buffer this frame occupied.
    pub consumed: usize,
    /// `None` for keep-alives, sentinels, and events without content.
    pub delta: Option<MessageDelta>,
}

/// Translator between canonical requests/responses and one vendor's wire format.
///
/// Adapters are pure translation: no I/O, no orchestration.
pub trait ProviderAdapter: Send + Sync {
    /// Provider name used in logs and error reports.
    fn name(&self) -> &str;

    /// Whether this adapter understands the request's model.
    fn accepts(&self, request: &ChatRequest) -> bool;

    /// Build the vendor request.
    fn encode(&self, request: &ChatRequest, stream: bool) -> Result<WireRequest, ParleyError>;

    /// Decode the next frame at the start of `buffer`.
    ///
    /// `Ok(None)` means the buffer holds no complete frame yet: keep the
    /// bytes and retry once more arrive.
    fn decode_frame(&self, buffer: &[u8]) -> Result<Option<Frame>, ParleyError>;

    /// Decode a complete non-streaming response body.
    fn decode_response(&self, body: &[u8]) -> Result<MessageDelta, ParleyError>;

    /// Surface an error body verbatim.
    fn decode_error(&self, status: u16, body: &[u8]) -> ParleyError {
        ParleyError::ProviderApi {
            provider: self.name().to_string(),
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }
}

/// Parse a JSON body, reporting failures as decode errors carrying the body.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ParleyError> {
    serde_json::from_slice(body).map_err(|e| ParleyError::stream_decode(body, e))
}
