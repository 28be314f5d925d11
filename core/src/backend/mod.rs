//! Backend Abstraction
//!
//! The polymorphic adapter contract and its three transport variants:
//! [`CloudChat`] (hosted chat API), [`LocalModel`] (local model server),
//! and [`AssistantDaemon`] (local daemon over the streaming RPC client).
//!
//! Callers construct a [`BackendAdapter`] from configuration and talk to
//! it through `generate_script` / `generate_response`; which variant sits
//! underneath is decided once and never inspected again.

pub mod adapter;
pub mod cloud_chat;
pub mod daemon;
pub mod local_model;
pub mod traits;

pub use adapter::{BackendAdapter, CONTINUATION_PROMPT};
pub use cloud_chat::CloudChat;
pub use daemon::AssistantDaemon;
pub use local_model::LocalModel;
pub use traits::{ChatTransport, GenerateError};
