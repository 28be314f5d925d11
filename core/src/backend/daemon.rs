//! Assistant Daemon Backend
//!
//! Delegates generation to a locally running assistant daemon over the
//! streaming RPC client. One long-lived [`RpcClient`] serves every
//! request this adapter issues; correlation ids keep concurrent requests
//! apart on the shared socket.
//!
//! The client is connected lazily, so a daemon that is down surfaces as
//! a failure of the first request rather than of adapter construction -
//! the configuration layer has usually probed the daemon already, but
//! the probe is advisory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::backend::traits::{ChatTransport, GenerateError};
use crate::conversation::Message;
use crate::rpc::{probe, RpcClient, RpcReply, TransportError};

/// Timeout for the selectability probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Assistant daemon backend
pub struct AssistantDaemon {
    addr: String,
    client: Mutex<Option<Arc<RpcClient>>>,
}

impl AssistantDaemon {
    /// Create a backend for the daemon at `addr` (`host:port`)
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            client: Mutex::new(None),
        }
    }

    /// The shared client, connecting on first use
    ///
    /// A client that lost its connection is replaced, not reused; the
    /// failed request still surfaces to its caller.
    async fn client(&self) -> Result<Arc<RpcClient>, TransportError> {
        let mut guard = self.client.lock().await;

        if let Some(client) = guard.as_ref() {
            if client.is_connected() {
                return Ok(Arc::clone(client));
            }
        }

        let client = Arc::new(RpcClient::connect(&self.addr).await?);
        *guard = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Request payload for a daemon chat turn
    fn build_chat_payload(model: &str, history: &[Message]) -> Value {
        json!({
            "title": model,
            "messages": history,
            "completionOptions": {},
        })
    }

    /// Model titles configured in the daemon
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] if the daemon is unreachable or reports
    /// an error payload.
    pub async fn models(&self) -> Result<Vec<String>, GenerateError> {
        let client = self.client().await?;
        let reply = client
            .request("config/getBrowserSerialized", Value::Null)?
            .wait()
            .await?;

        let RpcReply::Payload(config) = reply else {
            return Err(GenerateError::NoContent);
        };
        if let Some(error) = config.get("error").and_then(Value::as_str) {
            return Err(GenerateError::Daemon(error.to_string()));
        }

        let titles = config
            .get("models")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m.get("title")?.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(titles)
    }
}

#[async_trait]
impl ChatTransport for AssistantDaemon {
    fn name(&self) -> &'static str {
        "AssistantDaemon"
    }

    async fn chat(&self, model: &str, history: &[Message]) -> Result<String, GenerateError> {
        let client = self.client().await?;
        let reply = client
            .request("llm/streamChat", Self::build_chat_payload(model, history))?
            .wait()
            .await?;

        match reply {
            RpcReply::Stream(text) if text.is_empty() => Err(GenerateError::NoContent),
            RpcReply::Stream(text) => Ok(text),
            RpcReply::Payload(payload) => {
                // A terminal record on a streaming request only happens
                // when the daemon rejects it outright
                match payload.get("error").and_then(Value::as_str) {
                    Some(error) => Err(GenerateError::Daemon(error.to_string())),
                    None => Err(GenerateError::NoContent),
                }
            }
        }
    }

    async fn health_check(&self) -> bool {
        probe(&self.addr, PROBE_TIMEOUT).await
    }

    async fn list_models(&self) -> Result<Vec<String>, GenerateError> {
        self.models().await
    }
}
