//! Broadcast requests and their encoded wire frames
//!
//! A [`BroadcastRequest`] is encoded exactly once per publish into a [`Frame`],
//! which is then shared by every subscriber it is delivered to.

use std::fmt::Write as _;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single publish: event tag plus (possibly multi-line) payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastRequest {
    /// Event tag, written verbatim on the `event:` line
    pub event: String,
    /// Payload, split on `\n` into one `data:` line per segment
    pub data: String,
}

impl BroadcastRequest {
    /// Create a new broadcast request
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }

    /// Encode this request into a wire frame
    pub fn encode(&self) -> Frame {
        encode(&self.event, &self.data)
    }
}

/// An encoded event, ready to be written to a subscriber stream
///
/// Cheap to clone: the inner `Bytes` is reference counted, so every session
/// holds the same allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    /// Borrow the encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get a shared handle to the encoded bytes
    pub fn bytes(&self) -> Bytes {
        self.0.clone()
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the frame is empty (never true for encoder output)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Frame> for Bytes {
    fn from(frame: Frame) -> Self {
        frame.0
    }
}

/// Encode an event into the line-oriented event-stream framing.
///
/// ```text
/// event: <event>
/// data: <line 1>
/// data: <line 2>
///
/// ```
///
/// Empty segments are kept, so `""` produces a single `data: ` line. The
/// event tag is not escaped; it must not contain line breaks.
pub fn encode(event: &str, data: &str) -> Frame {
    let mut buf = String::with_capacity(event.len() + data.len() + 16);

    // Writing into a String cannot fail
    let _ = writeln!(buf, "event: {}", event);
    for line in data.split('\n') {
        let _ = writeln!(buf, "data: {}", line);
    }
    buf.push('\n');

    Frame(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_multiline() {
        let frame = encode("ping", "a\nb");
        assert_eq!(frame.as_bytes(), b"event: ping\ndata: a\ndata: b\n\n");
    }

    #[test]
    fn test_encode_empty_data() {
        let frame = encode("tick", "");
        assert_eq!(frame.as_bytes(), b"event: tick\ndata: \n\n");
    }

    #[test]
    fn test_encode_preserves_empty_segments() {
        let frame = encode("e", "\nmid\n");
        assert_eq!(frame.as_bytes(), b"event: e\ndata: \ndata: mid\ndata: \n\n");
    }

    #[test]
    fn test_encode_is_deterministic() {
        let req = BroadcastRequest::new("update", "x=1");
        assert_eq!(req.encode(), req.encode());
        assert_eq!(req.encode().len(), "event: update\ndata: x=1\n\n".len());
    }

    #[test]
    fn test_frame_clone_shares_allocation() {
        let frame = encode("e", "payload");
        let a = frame.bytes();
        let b = frame.clone().bytes();
        assert_eq!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn test_request_from_json() {
        let req: BroadcastRequest =
            serde_json::from_str(r#"{"event":"1","data":"hello"}"#).unwrap();
        assert_eq!(req, BroadcastRequest::new("1", "hello"));
    }
}
