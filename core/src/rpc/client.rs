//! RPC Client
//!
//! One long-lived TCP connection to the assistant daemon, shared by every
//! request the owning adapter issues. Requests are correlated by UUID:
//! the pending entry is registered *before* the record bytes are queued
//! for write, so a response racing the write completion always finds its
//! entry.
//!
//! The connection is split into a read task and a write task (so the
//! request path never blocks on the socket). The read task owns the line
//! buffer and the dispatch loop; it runs alone, so handlers are resolved
//! sequentially and never re-entered.
//!
//! # Delivery contract
//!
//! Exactly one resolution per correlation id:
//!
//! - terminal types resolve with the record's payload;
//! - streaming types accumulate `content` in arrival order and resolve
//!   with the full accumulation when `done` arrives (the done-record's
//!   own content included);
//! - records with an unknown correlation id are dropped silently - the
//!   peer may be answering a request a previous client issued;
//! - malformed records are dropped and logged; the connection survives;
//! - dropping the client abandons outstanding requests: their
//!   [`PendingReply`] resolves to [`TransportError::ConnectionClosed`],
//!   never to a value.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::wire::{encode_record, is_streaming_type, LineDecoder, StreamChunk, WireMessage};
use super::TransportError;

/// A resolved response
#[derive(Clone, Debug)]
pub enum RpcReply {
    /// Terminal response: the record's payload, verbatim
    Payload(Value),
    /// Streaming response: every chunk's content, concatenated in
    /// arrival order
    Stream(String),
}

/// A request in flight
struct Pending {
    /// Resolves the caller's [`PendingReply`]
    reply: oneshot::Sender<RpcReply>,
    /// Chunk accumulator for streaming types
    accumulated: String,
    /// Whether the requested message type streams
    streaming: bool,
}

/// Awaitable handle for one request
///
/// Resolves exactly once. A caller racing this against its own timer can
/// call [`RpcClient::cancel`] with the correlation id on timeout to
/// prevent late delivery.
#[derive(Debug)]
pub struct PendingReply {
    correlation_id: String,
    rx: oneshot::Receiver<RpcReply>,
}

impl PendingReply {
    /// The correlation id this handle is bound to
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Wait for the response
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionClosed`] if the request was
    /// abandoned (connection lost, request cancelled, or client dropped).
    pub async fn wait(self) -> Result<RpcReply, TransportError> {
        self.rx.await.map_err(|_| TransportError::ConnectionClosed)
    }
}

/// Streaming RPC client for the assistant daemon
///
/// Owns one socket and one pending-request map; neither is shared across
/// client instances. Multiple requests may be outstanding at once.
pub struct RpcClient {
    pending: Arc<DashMap<String, Pending>>,
    write_tx: mpsc::UnboundedSender<Vec<u8>>,
    connected: Arc<AtomicBool>,
    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
}

impl RpcClient {
    /// Connect to the daemon at `addr` (`host:port`)
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionFailed`] if the socket cannot
    /// be opened. There is no automatic reconnect within a client
    /// instance; callers construct a fresh client after a failure.
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            TransportError::ConnectionFailed(format!("failed to connect to {addr}: {e}"))
        })?;
        let (mut read_half, mut write_half) = stream.into_split();

        let pending: Arc<DashMap<String, Pending>> = Arc::new(DashMap::new());
        let connected = Arc::new(AtomicBool::new(true));
        let (write_tx, mut write_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        // Read task: socket -> line buffer -> dispatch
        let pending_read = Arc::clone(&pending);
        let connected_read = Arc::clone(&connected);
        let read_task = tokio::spawn(async move {
            let mut decoder = LineDecoder::new();
            let mut buf = [0u8; 4096];

            loop {
                match read_half.read(&mut buf).await {
                    Ok(0) => {
                        tracing::debug!("daemon closed the connection");
                        break;
                    }
                    Ok(n) => {
                        decoder.push(&buf[..n]);
                        while let Some(line) = decoder.next_line() {
                            dispatch(&pending_read, &line);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "socket read error");
                        break;
                    }
                }
            }

            connected_read.store(false, Ordering::SeqCst);
            // Abandon outstanding requests: dropping the senders resolves
            // every waiter with ConnectionClosed
            pending_read.clear();
        });

        // Write task: request queue -> socket
        let connected_write = Arc::clone(&connected);
        let write_task = tokio::spawn(async move {
            while let Some(bytes) = write_rx.recv().await {
                if let Err(e) = write_half.write_all(&bytes).await {
                    tracing::warn!(error = %e, "socket write error");
                    break;
                }
            }
            connected_write.store(false, Ordering::SeqCst);
        });

        tracing::debug!(addr, "connected to assistant daemon");

        Ok(Self {
            pending,
            write_tx,
            connected,
            read_task,
            write_task,
        })
    }

    /// Send a request and return the awaitable reply handle
    ///
    /// The pending entry is registered before the record is queued for
    /// write; the caller's path never blocks on the socket.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Parse`] if the record cannot be
    /// serialized, or [`TransportError::ConnectionClosed`] if the
    /// connection is already gone.
    pub fn request(
        &self,
        message_type: &str,
        payload: Value,
    ) -> Result<PendingReply, TransportError> {
        let correlation_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();

        self.pending.insert(
            correlation_id.clone(),
            Pending {
                reply: tx,
                accumulated: String::new(),
                streaming: is_streaming_type(message_type),
            },
        );

        let record = WireMessage {
            correlation_id: correlation_id.clone(),
            message_type: message_type.to_string(),
            payload,
        };
        let bytes = match encode_record(&record) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.pending.remove(&correlation_id);
                return Err(e);
            }
        };

        if self.write_tx.send(bytes).is_err() {
            self.pending.remove(&correlation_id);
            return Err(TransportError::ConnectionClosed);
        }

        tracing::trace!(%correlation_id, message_type, "request queued");

        Ok(PendingReply { correlation_id, rx })
    }

    /// Abandon a pending request
    ///
    /// Returns `true` if an entry was removed. The corresponding
    /// [`PendingReply`] resolves to [`TransportError::ConnectionClosed`];
    /// any response arriving later is dropped as unknown.
    pub fn cancel(&self, correlation_id: &str) -> bool {
        self.pending.remove(correlation_id).is_some()
    }

    /// Whether the connection is still up
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of requests currently in flight
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        // Tear down both halves of the connection; outstanding waiters
        // resolve with ConnectionClosed when the map goes away
        self.read_task.abort();
        self.write_task.abort();
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Parse one record and resolve or extend its pending entry
fn dispatch(pending: &DashMap<String, Pending>, line: &str) {
    let record: WireMessage = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(e) => {
            // Drop the one bad record; the read loop must survive
            tracing::warn!(error = %e, "dropping malformed wire record");
            return;
        }
    };

    let Some(mut entry) = pending.get_mut(&record.correlation_id) else {
        // The peer may be answering a request this client never issued
        tracing::trace!(
            correlation_id = %record.correlation_id,
            message_type = %record.message_type,
            "dropping record with unknown correlation id"
        );
        return;
    };

    if is_streaming_type(&record.message_type) {
        if !entry.streaming {
            tracing::warn!(
                correlation_id = %record.correlation_id,
                message_type = %record.message_type,
                "streaming record answers a non-streaming request"
            );
        }

        let chunk: StreamChunk = match serde_json::from_value(record.payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(
                    correlation_id = %record.correlation_id,
                    error = %e,
                    "dropping streaming record with malformed payload"
                );
                return;
            }
        };

        entry.accumulated.push_str(&chunk.content);
        if !chunk.done {
            return;
        }
        drop(entry);

        if let Some((_, done)) = pending.remove(&record.correlation_id) {
            let _ = done.reply.send(RpcReply::Stream(done.accumulated));
        }
    } else {
        drop(entry);

        if let Some((_, done)) = pending.remove(&record.correlation_id) {
            let _ = done.reply.send(RpcReply::Payload(record.payload));
        }
    }
}
