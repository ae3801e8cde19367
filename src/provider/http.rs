//! Shared HTTP client and the transport seam between adapters and the network.

use std::sync::OnceLock;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use super::WireRequest;
use crate::error::ParleyError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Ordered chunks of a response body.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ParleyError>>;

/// Status plus the not-yet-consumed body of one HTTP exchange.
pub struct TransportResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into one buffer.
    pub async fn collect_body(self) -> Result<Vec<u8>, ParleyError> {
        collect_bytes(self.body).await
    }
}

/// Drain a body stream into one buffer.
pub async fn collect_bytes(mut body: ByteStream) -> Result<Vec<u8>, ParleyError> {
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Sends encoded requests; everything provider-specific stays in adapters.
///
/// Dropping the returned body closes the underlying connection.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<TransportResponse, ParleyError>;
}

/// [`Transport`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// Use the process-wide shared client.
    pub fn new() -> Self {
        Self {
            client: shared_client().clone(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, ParleyError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ParleyError::Configuration(format!("Invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ParleyError::Configuration(format!("Invalid value for header '{name}': {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: WireRequest) -> Result<TransportResponse, ParleyError> {
        debug!(url = %request.url, "sending provider request");
        let response = self
            .client
            .post(&request.url)
            .headers(header_map(&request.headers)?)
            .json(&request.body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ParleyError::from))
            .boxed();
        Ok(TransportResponse { status, body })
    }
}

/// Build `Authorization: Bearer` headers.
pub fn bearer(api_key: &str) -> (String, String) {
    ("authorization".to_string(), format!("Bearer {api_key}"))
}
