//! Streaming decoder: raw body chunks in, canonical deltas out.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::debug;

use crate::error::ParleyError;
use crate::provider::{ByteStream, ProviderAdapter};
use crate::types::MessageDelta;

/// Lazy, non-restartable sequence of deltas from one HTTP exchange.
pub type DeltaStream = BoxStream<'static, Result<MessageDelta, ParleyError>>;

/// Decode a response body with `adapter`'s framing.
///
/// Frames split across reads are buffered until complete. The first decode
/// or transport error is yielded and ends the sequence. When the body ends
/// cleanly the sequence ends too; a final event missing its blank-line
/// terminator is still decoded.
pub fn decode_stream(adapter: Arc<dyn ProviderAdapter>, body: ByteStream) -> DeltaStream {
    let stream = async_stream::stream! {
        let mut body = body;
        let mut buffer: Vec<u8> = Vec::new();
        let mut closed = false;

        loop {
            match body.next().await {
                Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    yield Err(e);
                    return;
                }
                None => {
                    closed = true;
                    if buffer.iter().all(u8::is_ascii_whitespace) {
                        break;
                    }
                    buffer.extend_from_slice(b"\n\n");
                }
            }

            loop {
                match adapter.decode_frame(&buffer) {
                    Ok(Some(frame)) if frame.consumed > 0 => {
                        let consumed = frame.consumed.min(buffer.len());
                        buffer.drain(..consumed);
                        if let Some(delta) = frame.delta {
                            yield Ok(delta);
                        }
                    }
                    Ok(_) => break,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            if closed {
                if !buffer.iter().all(u8::is_ascii_whitespace) {
                    debug!(
                        provider = adapter.name(),
                        leftover = buffer.len(),
                        "stream closed with an incomplete frame"
                    );
                }
                break;
            }
        }
    };
    stream.boxed()
}
