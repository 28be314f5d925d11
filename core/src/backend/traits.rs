//! Backend Transport Trait
//!
//! The polymorphism seam between the adapter and its backends. Variants
//! differ *only* in how a message list reaches a model and how the reply
//! comes back; everything else - conversation bookkeeping, prompt
//! rendering, normalization - lives once in
//! [`BackendAdapter`](crate::backend::BackendAdapter).
//!
//! The concrete variant is chosen once, at configuration time. Nothing
//! downstream inspects which variant it holds.

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::Message;
use crate::prompt::TemplateError;
use crate::rpc::TransportError;

/// Errors surfaced by script and response generation
///
/// Surfaced to the caller for caller-level retry; never retried
/// internally.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Socket-level failure talking to the assistant daemon
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    /// HTTP-level failure talking to a chat API
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The backend answered with a non-success status
    #[error("{backend} returned {status}: {body}")]
    BadStatus {
        /// Which backend answered
        backend: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },
    /// Prompt rendering failed; the request is aborted
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// The backend returned no usable content
    #[error("backend returned no usable content")]
    NoContent,
    /// The assistant daemon reported an error payload
    #[error("assistant daemon error: {0}")]
    Daemon(String),
}

/// Transport behavior a backend variant must provide
///
/// `chat` is the only operation the adapter needs; `health_check` and
/// `list_models` exist for the configuration layer, which validates a
/// backend and enumerates model choices before any adapter is built.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Backend name for logs and diagnostics
    fn name(&self) -> &'static str;

    /// Send the full message history to `model`, return the reply text
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] on transport failure or an unusable
    /// reply.
    async fn chat(&self, model: &str, history: &[Message]) -> Result<String, GenerateError>;

    /// Whether the backend is reachable
    ///
    /// Advisory, like the liveness probe: `true` means "worth offering",
    /// not "the next request will succeed".
    async fn health_check(&self) -> bool;

    /// Model identifiers this backend currently offers
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] if the backend cannot be queried.
    async fn list_models(&self) -> Result<Vec<String>, GenerateError>;
}
