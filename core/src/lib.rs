//! Incant Core - AI Backend Abstraction for incant
//!
//! This crate is the backend core of incant: it turns a natural-language
//! request into a strict, machine-parseable instruction payload by
//! delegating generation to one of several interchangeable AI backends.
//! It is completely independent of any UI: argument parsing, interactive
//! prompts, config wizards, and the execution engine all live with the
//! caller and reach this core through narrow interfaces.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Caller (CLI, etc.)                      │
//! │        CoreConfig in, normalized JSON payload out            │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────┐
//! │                       BackendAdapter                         │
//! │   ┌──────────────┐  ┌────────┴───────┐  ┌────────────────┐   │
//! │   │ Conversation │  │ PromptRenderer │  │   Normalizer   │   │
//! │   │    State     │  │  (CommandTask) │  │   (massage)    │   │
//! │   └──────────────┘  └────────────────┘  └────────────────┘   │
//! │                   ┌───────────────────┐                      │
//! │                   │   ChatTransport   │                      │
//! │                   └─────────┬─────────┘                      │
//! └─────────────────────────────┼────────────────────────────────┘
//!            ┌──────────────────┼──────────────────┐
//!      ┌─────┴─────┐      ┌─────┴─────┐     ┌──────┴──────┐
//!      │ CloudChat │      │LocalModel │     │ Assistant   │
//!      │  (HTTPS)  │      │  (HTTP)   │     │ Daemon      │
//!      └───────────┘      └───────────┘     │ (RpcClient) │
//!                                           └─────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`BackendAdapter`]: drives one conversation against one backend
//! - [`ChatTransport`]: the seam backend variants implement
//! - [`ConversationState`]: role-tagged message history
//! - [`RpcClient`]: correlated streaming RPC to the assistant daemon
//! - [`CoreConfig`]: the resolved configuration object passed in at startup
//!
//! # Quick Start
//!
//! ```ignore
//! use incant_core::{BackendAdapter, CoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CoreConfig::local_model("http://127.0.0.1:11434", "llama3.2");
//!     let mut adapter = BackendAdapter::from_config(&config)?;
//!
//!     // First call renders the instruction prompt and sends it
//!     let script = adapter.generate_script("archive last week's logs").await?;
//!
//!     // Caller didn't like it: same conversation, different solution
//!     let retry = adapter.generate_script("archive last week's logs").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: adapter contract and the three transport variants
//! - [`conversation`]: role-tagged message history
//! - [`normalize`]: payload extraction from free-form model output
//! - [`prompt`]: the prompt-renderer seam and built-in command prompt
//! - [`rpc`]: streaming RPC client, wire framing, liveness probe
//! - [`config`]: the resolved configuration object

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod conversation;
pub mod normalize;
pub mod prompt;
pub mod rpc;

// Re-exports for convenience
pub use backend::{
    AssistantDaemon, BackendAdapter, ChatTransport, CloudChat, GenerateError, LocalModel,
    CONTINUATION_PROMPT,
};
pub use config::{BackendSelection, ConfigError, CoreConfig};
pub use conversation::{ConversationState, Message, Role};
pub use normalize::massage;
pub use prompt::{CommandContext, CommandPrompt, PromptRenderer, TemplateError, COMMAND_TASK};
pub use rpc::{probe, PendingReply, RpcClient, RpcReply, TransportError, WireMessage};
