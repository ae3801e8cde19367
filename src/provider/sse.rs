//! Server-sent-event framing shared by the streaming adapters.

use crate::error::ParleyError;
use crate::types::MessageDelta;

use super::Frame;

/// One complete SSE event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

impl SseEvent {
    /// Events with no data (comments, bare keep-alives).
    pub fn is_empty(&self) -> bool {
        self.event.is_none() && self.data.is_empty()
    }
}

/// Locate the end of the first event: returns `(body_len, consumed)`.
fn find_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|p| (p, p + 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| (p, p + 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Parse the first complete event at the start of `buffer`.
///
/// Returns `Ok(None)` when no blank-line terminator has arrived yet.
pub fn next_event(buffer: &[u8]) -> Result<Option<(SseEvent, usize)>, ParleyError> {
    let Some((body_len, consumed)) = find_boundary(buffer) else {
        return Ok(None);
    };
    let raw = std::str::from_utf8(&buffer[..body_len])
        .map_err(|e| ParleyError::stream_decode(&buffer[..consumed], e))?;

    let mut event = SseEvent::default();
    let mut data_lines: Vec<&str> = Vec::new();
    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event.event = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }
    event.data = data_lines.join("\n");
    Ok(Some((event, consumed)))
}

/// Decode one SSE-framed [`Frame`] using `decode` for the event payload.
pub fn decode_sse_frame<F>(buffer: &[u8], decode: F) -> Result<Option<Frame>, ParleyError>
where
    F: FnOnce(&SseEvent) -> Result<Option<MessageDelta>, ParleyError>,
{
    let Some((event, consumed)) = next_event(buffer)? else {
        return Ok(None);
    };
    if event.is_empty() {
        return Ok(Some(Frame {
            consumed,
            delta: None,
        }));
    }
    let delta = decode(&event).map_err(|e| match e {
        ParleyError::StreamDecode { source, .. } => ParleyError::StreamDecode {
            buffer: String::from_utf8_lossy(&buffer[..consumed]).into_owned(),
            source,
        },
        other => other,
    })?;
    Ok(Some(Frame { consumed, delta }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_event_needs_more_bytes() {
        assert!(next_event(b"data: {\"a\":").unwrap().is_none());
        assert!(next_event(b"data: x\n").unwrap().is_none());
    }

    #[test]
    fn parses_event_and_data_fields() {
        let (event, consumed) = next_event(b"event: ping\ndata: {}\n\nrest").unwrap().unwrap();
        assert_eq!(event.event.as_deref(), Some("ping"));
        assert_eq!(event.data, "{}");
        assert_eq!(consumed, 22);
    }

    #[test]
    fn joins_multiple_data_lines_and_skips_comments() {
        let (event, _) = next_event(b": keep-alive\ndata: a\ndata: b\n\n").unwrap().unwrap();
        assert_eq!(event.data, "a\nb");
    }

    #[test]
    fn handles_crlf_terminators() {
        let (event, consumed) = next_event(b"data: x\r\n\r\n").unwrap().unwrap();
        assert_eq!(event.data, "x");
        assert_eq!(consumed, 11);
    }

    #[test]
    fn comment_only_event_is_keep_alive() {
        let frame = decode_sse_frame(b": ping\n\n", |_| panic!("not called"))
            .unwrap()
            .unwrap();
        assert_eq!(frame.consumed, 8);
        assert!(frame.delta.is_none());
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let err = next_event(b"data: \xff\xfe\n\n").unwrap_err();
        assert!(matches!(err, ParleyError::StreamDecode { .. }));
    }
}
