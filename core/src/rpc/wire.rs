//! Wire Records and Line Framing
//!
//! The daemon protocol is one JSON object per line, UTF-8, each line
//! terminated by `\r\n`:
//!
//! ```text
//! {"correlationId":"...","messageType":"llm/streamChat","payload":{...}}\r\n
//! ```
//!
//! Socket reads deliver arbitrary byte slices - half a record, three
//! records and a half, anything. [`LineDecoder`] buffers incoming bytes
//! and yields only complete lines, carrying a partial trailing line
//! forward to the next read. Splitting each read event independently
//! loses exactly that partial tail, which is why the decoder is stateful.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TransportError;

/// Message types whose payload arrives in ordered chunks
///
/// Known in advance; every other type is terminal. A streaming payload is
/// a [`StreamChunk`], accumulated until a record with `done: true`.
pub const STREAMING_TYPES: [&str; 4] = [
    "llm/streamComplete",
    "llm/streamChat",
    "command/run",
    "streamDiffLines",
];

/// Whether `message_type` is in the streaming subset
#[must_use]
pub fn is_streaming_type(message_type: &str) -> bool {
    STREAMING_TYPES.contains(&message_type)
}

/// Line terminator for outbound records
pub const RECORD_TERMINATOR: &str = "\r\n";

/// One request or response record
///
/// Transient; never persisted. `correlationId` is caller-generated and
/// unique per connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Token binding this record to its request
    pub correlation_id: String,
    /// One of the fixed enumerated message types
    pub message_type: String,
    /// Arbitrary JSON payload
    #[serde(default)]
    pub payload: Value,
}

/// Payload shape for streaming message types
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StreamChunk {
    /// Chunk content, appended in arrival order
    #[serde(default)]
    pub content: String,
    /// Completion marker; the final record may also carry content
    #[serde(default)]
    pub done: bool,
}

/// Encode a record as one terminated line
///
/// # Errors
///
/// Returns [`TransportError::Parse`] if JSON serialization fails.
pub fn encode_record(msg: &WireMessage) -> Result<Vec<u8>, TransportError> {
    let mut line =
        serde_json::to_vec(msg).map_err(|e| TransportError::Parse(e.to_string()))?;
    line.extend_from_slice(RECORD_TERMINATOR.as_bytes());
    Ok(line)
}

/// Minimum buffer capacity for the decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// Buffering line splitter for the socket read path
///
/// Push raw bytes in, pull complete lines out. Lines are terminated by
/// `\n`; a trailing `\r` is stripped and blank lines are skipped, so both
/// `\r\n` and bare `\n` peers work.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Position we've consumed up to
    read_pos: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    /// Create a decoder with default buffer capacity
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            read_pos: 0,
        }
    }

    /// Append bytes from a socket read
    pub fn push(&mut self, data: &[u8]) {
        // Compact the buffer once a good chunk has been consumed
        if self.read_pos > self.buffer.len() / 2 && self.read_pos > MIN_BUFFER_CAPACITY {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Number of unconsumed bytes held in the buffer
    #[must_use]
    pub fn available(&self) -> usize {
        self.buffer.len() - self.read_pos
    }

    /// Extract the next complete non-blank line
    ///
    /// Returns `None` when no complete line is buffered; the partial tail
    /// stays in the buffer until more data arrives.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let rest = &self.buffer[self.read_pos..];
            let newline = rest.iter().position(|&b| b == b'\n')?;

            let mut line = &rest[..newline];
            if let [head @ .., b'\r'] = line {
                line = head;
            }
            let text = String::from_utf8_lossy(line).into_owned();
            self.read_pos += newline + 1;

            if !text.trim().is_empty() {
                return Some(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wire_message_field_names() {
        let msg = WireMessage {
            correlation_id: "abc".to_string(),
            message_type: "ping".to_string(),
            payload: serde_json::json!({"x": 1}),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"correlationId":"abc","messageType":"ping","payload":{"x":1}}"#
        );
    }

    #[test]
    fn test_wire_message_payload_optional() {
        let msg: WireMessage =
            serde_json::from_str(r#"{"correlationId":"abc","messageType":"ping"}"#).unwrap();
        assert!(msg.payload.is_null());
    }

    #[test]
    fn test_streaming_type_set() {
        assert!(is_streaming_type("llm/streamChat"));
        assert!(is_streaming_type("command/run"));
        assert!(!is_streaming_type("config/getBrowserSerialized"));
    }

    #[test]
    fn test_encode_record_terminated() {
        let msg = WireMessage {
            correlation_id: "1".to_string(),
            message_type: "ping".to_string(),
            payload: Value::Null,
        };
        let bytes = encode_record(&msg).unwrap();
        assert!(bytes.ends_with(b"\r\n"));
        // Exactly one record, no embedded newlines
        assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);
    }

    #[test]
    fn test_decoder_partial_line_held() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"{\"a\":");
        assert_eq!(decoder.next_line(), None);

        decoder.push(b"1}\r\n");
        assert_eq!(decoder.next_line().as_deref(), Some("{\"a\":1}"));
        assert_eq!(decoder.next_line(), None);
    }

    #[test]
    fn test_decoder_multiple_records_one_read() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"one\r\ntwo\r\nthr");

        assert_eq!(decoder.next_line().as_deref(), Some("one"));
        assert_eq!(decoder.next_line().as_deref(), Some("two"));
        assert_eq!(decoder.next_line(), None);

        decoder.push(b"ee\n");
        assert_eq!(decoder.next_line().as_deref(), Some("three"));
    }

    #[test]
    fn test_decoder_skips_blank_lines() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"\r\n\r\nrecord\r\n\r\n");
        assert_eq!(decoder.next_line().as_deref(), Some("record"));
        assert_eq!(decoder.next_line(), None);
    }

    #[test]
    fn test_decoder_bare_newline_peer() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"no-carriage-return\n");
        assert_eq!(decoder.next_line().as_deref(), Some("no-carriage-return"));
    }

    #[test]
    fn test_decoder_compaction_preserves_tail() {
        let mut decoder = LineDecoder::new();
        // Push enough consumed data to trigger compaction, with a split record
        let line = format!("{}\r\n", "x".repeat(MIN_BUFFER_CAPACITY));
        decoder.push(line.as_bytes());
        assert!(decoder.next_line().is_some());

        decoder.push(b"tail-st");
        decoder.push(b"art\r\n");
        assert_eq!(decoder.next_line().as_deref(), Some("tail-start"));
        assert_eq!(decoder.available(), 0);
    }
}
