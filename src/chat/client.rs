//! Client: dispatch, transport, and the caller-facing entry points.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::request::ChatRequest;
use super::tool_loop::{
    check_iteration_bound, resolve_tool_selections, run_tool_loop, validate_tool_results,
    ToolLoopOutcome,
};
use crate::error::ParleyError;
use crate::provider::http::collect_bytes;
use crate::provider::{
    ByteStream, HttpTransport, ProviderAdapter, ProviderRegistry, Transport, TransportResponse,
};
use crate::stream::{decode_stream, CompletedResponse, DeltaStream, ResponseAccumulator, Transcript};
use crate::types::{Message, MessageDelta, Role};

/// Successive message states: partial snapshots, tool results, and the final
/// message as the last element.
pub type MessageStream = BoxStream<'static, Result<Message, ParleyError>>;

/// Race `fut` against an optional cancellation token.
pub(crate) async fn cancellable<F>(
    cancel: Option<&CancellationToken>,
    fut: F,
) -> Result<F::Output, ParleyError>
where
    F: Future,
{
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(ParleyError::Canceled),
            out = fut => Ok(out),
        },
        None => Ok(fut.await),
    }
}

/// Fail with [`ParleyError::Timeout`] when no chunk arrives within `idle`.
fn with_idle_timeout(body: ByteStream, idle: Duration) -> ByteStream {
    let stream = async_stream::stream! {
        let mut body = body;
        loop {
            match tokio::time::timeout(idle, body.next()).await {
                Ok(Some(chunk)) => yield chunk,
                Ok(None) => break,
                Err(_) => {
                    yield Err(ParleyError::Timeout(idle.as_millis() as u64));
                    break;
                }
            }
        }
    };
    stream.boxed()
}

/// Provider-agnostic chat client.
#[derive(Clone)]
pub struct Client {
    registry: Arc<ProviderRegistry>,
    transport: Arc<dyn Transport>,
    stream_idle_timeout: Option<Duration>,
}

impl Client {
    /// Client over the shared HTTP transport.
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            transport: Arc::new(HttpTransport::new()),
            stream_idle_timeout: None,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Abort a request when the provider goes quiet for longer than `idle`.
    pub fn with_stream_idle_timeout(mut self, idle: Duration) -> Self {
        self.stream_idle_timeout = Some(idle);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Validate, dispatch, encode, and send one request.
    async fn exchange(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<(Arc<dyn ProviderAdapter>, ByteStream), ParleyError> {
        if request.is_canceled() {
            return Err(ParleyError::Canceled);
        }
        validate_tool_results(&request.messages)?;
        let adapter = self.registry.dispatch(request)?;
        let wire = adapter.encode(request, stream)?;
        debug!(model = %request.model, provider = adapter.name(), stream, "dispatching request");

        let send = self.transport.send(wire);
        let response: TransportResponse = match self.stream_idle_timeout {
            Some(idle) => cancellable(request.cancel.as_ref(), tokio::time::timeout(idle, send))
                .await?
                .map_err(|_| ParleyError::Timeout(idle.as_millis() as u64))??,
            None => cancellable(request.cancel.as_ref(), send).await??,
        };

        let status = response.status;
        let mut body = response.body;
        if let Some(idle) = self.stream_idle_timeout {
            body = with_idle_timeout(body, idle);
        }
        if !(200..300).contains(&status) {
            let error_body = cancellable(request.cancel.as_ref(), collect_bytes(body)).await??;
            return Err(adapter.decode_error(status, &error_body));
        }
        Ok((adapter, body))
    }

    /// One non-streaming turn, no tool execution.
    pub async fn complete(&self, request: &ChatRequest) -> Result<CompletedResponse, ParleyError> {
        let (adapter, body) = self.exchange(request, false).await?;
        let bytes = cancellable(request.cancel.as_ref(), collect_bytes(body)).await??;
        let mut acc = ResponseAccumulator::new();
        acc.apply(adapter.decode_response(&bytes)?);
        Ok(acc.finish())
    }

    /// One streaming turn as raw deltas, no tool execution.
    pub async fn open_stream(&self, request: &ChatRequest) -> Result<DeltaStream, ParleyError> {
        let (adapter, body) = self.exchange(request, true).await?;
        Ok(decode_stream(adapter, body))
    }

    /// Run the full tool loop and return the final assistant message.
    pub async fn perform(&self, request: ChatRequest) -> Result<Message, ParleyError> {
        Ok(self.perform_detailed(request).await?.message)
    }

    /// Like [`perform`](Self::perform), keeping the whole conversation and usage.
    pub async fn perform_detailed(&self, request: ChatRequest) -> Result<ToolLoopOutcome, ParleyError> {
        run_tool_loop(self, request).await
    }

    /// Run the tool loop over streaming requests.
    ///
    /// Yields the accumulated message after every delta, each tool result
    /// message, and finally the finished assistant message. On cancellation
    /// or error the partial message is discarded and the error is the last
    /// element.
    pub fn stream(&self, request: ChatRequest) -> MessageStream {
        let client = self.clone();
        let stream = async_stream::stream! {
            let mut request = request;
            let mut transcript = Transcript::new(request.messages.clone());
            let mut iterations = 0;

            loop {
                if let Err(e) = check_iteration_bound(&request, iterations) {
                    yield Err(e);
                    return;
                }
                iterations += 1;
                debug!(model = %request.model, iteration = iterations, "streaming tool loop request");

                let mut deltas = match client.open_stream(&request).await {
                    Ok(deltas) => deltas,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                loop {
                    match cancellable(request.cancel.as_ref(), deltas.next()).await {
                        Ok(Some(Ok(delta))) => {
                            let snapshot = transcript.apply(delta).clone();
                            yield Ok(snapshot);
                        }
                        Ok(None) => break,
                        Ok(Some(Err(e))) | Err(e) => {
                            transcript.discard_in_progress();
                            yield Err(e);
                            return;
                        }
                    }
                }
                drop(deltas);

                if transcript.in_progress_id().is_none() {
                    transcript.apply(MessageDelta::role(Role::Assistant));
                }
                let Some(completed) = transcript.finish() else {
                    return;
                };
                let selections = completed.message.tool_selections.clone();
                yield Ok(completed.message);
                if selections.is_empty() {
                    return;
                }

                request.messages = transcript.messages().to_vec();
                let results = match resolve_tool_selections(&request, &selections).await {
                    Ok(results) => results,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                for result in results {
                    let message = Message::tool(result);
                    transcript.push(message.clone());
                    yield Ok(message);
                }
                request.messages = transcript.messages().to_vec();
            }
        };
        stream.boxed()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("registry", &self.registry)
            .field("stream_idle_timeout", &self.stream_idle_timeout)
            .finish_non_exhaustive()
    }
}
