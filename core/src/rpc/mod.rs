//! Streaming RPC Client for the Assistant Daemon
//!
//! Exchanges newline-delimited JSON records with a locally running
//! assistant daemon over one long-lived TCP socket, correlating each
//! outbound request with its eventual response(s) and reassembling
//! chunked streaming output.
//!
//! - [`client`]: the connection, correlation map, and dispatch loop
//! - [`wire`]: record types, the streaming-type set, and the line buffer
//! - [`probe`]: timeout-bounded reachability check

use thiserror::Error;

pub mod client;
pub mod probe;
pub mod wire;

pub use client::{PendingReply, RpcClient, RpcReply};
pub use probe::probe;
pub use wire::{LineDecoder, StreamChunk, WireMessage, STREAMING_TYPES};

/// Errors raised by the transport layer
///
/// Surfaced to the caller and never retried internally. Per-record parse
/// failures are the one exception to surfacing: the offending record is
/// dropped and logged, and the connection survives.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connecting to the peer failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// The connection closed before the request resolved
    #[error("connection closed")]
    ConnectionClosed,
    /// A record could not be serialized for the wire
    #[error("malformed wire record: {0}")]
    Parse(String),
    /// IO error from the underlying socket
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
