//! Backend Adapter
//!
//! The one place conversation bookkeeping lives. Every variant shares
//! this behavior; swapping backends never touches calling code.
//!
//! # Generation flow
//!
//! `generate_script` on a fresh adapter renders the instruction prompt
//! from the caller's request and sends it. On an adapter that has already
//! generated, it sends a fixed "try a different solution" continuation
//! instead - the multi-turn regenerate retry - reusing the accumulated
//! conversation so the model knows what it already proposed. Either way
//! the reply passes through [`massage`] before it reaches the caller.
//!
//! `generate_response` is the open-ended chat path: raw reply, no
//! normalization.

use crate::backend::traits::{ChatTransport, GenerateError};
use crate::backend::{AssistantDaemon, CloudChat, LocalModel};
use crate::config::{BackendSelection, ConfigError, CoreConfig};
use crate::conversation::ConversationState;
use crate::normalize::massage;
use crate::prompt::{CommandContext, CommandPrompt, PromptRenderer, COMMAND_TASK};

/// Fixed continuation message for regenerate retries
///
/// Sent verbatim (never re-rendered) on every `generate_script` call
/// after the first.
pub const CONTINUATION_PROMPT: &str = "Try a different solution.";

/// Drives one conversation against one backend
///
/// Owns its [`ConversationState`] exclusively; exactly one adapter drives
/// one conversation. Construct with [`BackendAdapter::from_config`] and
/// discard when the session ends.
pub struct BackendAdapter {
    transport: Box<dyn ChatTransport>,
    renderer: Box<dyn PromptRenderer>,
    conversation: ConversationState,
    model: String,
}

impl BackendAdapter {
    /// Create an adapter over an explicit transport
    pub fn new(transport: Box<dyn ChatTransport>, model: impl Into<String>) -> Self {
        Self {
            transport,
            renderer: Box::new(CommandPrompt::new()),
            conversation: ConversationState::new(),
            model: model.into(),
        }
    }

    /// Replace the prompt renderer
    ///
    /// Callers with their own template machinery inject it here; the
    /// default is the built-in [`CommandPrompt`].
    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn PromptRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Construct the configured backend variant
    ///
    /// The variant decision happens here, once; nothing else in the crate
    /// branches on backend identity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration fails validation.
    pub fn from_config(config: &CoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let transport: Box<dyn ChatTransport> = match &config.backend {
            BackendSelection::CloudChat {
                api_key, api_url, ..
            } => Box::new(CloudChat::new(api_url.clone(), api_key.clone())),
            BackendSelection::LocalModel { url, .. } => Box::new(LocalModel::new(url.clone())),
            BackendSelection::AssistantDaemon { addr, .. } => {
                Box::new(AssistantDaemon::new(addr.clone()))
            }
        };

        Ok(Self::new(transport, config.backend.model()))
    }

    /// The model this adapter drives
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Name of the underlying backend variant
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Read-only view of the conversation history
    #[must_use]
    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// Generate an instruction script for a natural-language request
    ///
    /// First call renders the instruction prompt from `command`; later
    /// calls send [`CONTINUATION_PROMPT`] against the existing
    /// conversation. The reply is normalized with [`massage`].
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] on transport or rendering failure; the
    /// error is logged here and retries belong to the caller.
    pub async fn generate_script(&mut self, command: &str) -> Result<String, GenerateError> {
        let result = if self.conversation.is_empty() {
            let context = CommandContext::capture(command).to_value();
            match self.renderer.render(COMMAND_TASK, &context) {
                Ok(prompt) => self.generate_response(&prompt).await,
                Err(e) => Err(e.into()),
            }
        } else {
            self.generate_response(CONTINUATION_PROMPT).await
        };

        match result {
            Ok(reply) => Ok(massage(&reply).to_string()),
            Err(e) => {
                tracing::error!(
                    backend = self.transport.name(),
                    model = %self.model,
                    error = %e,
                    "failed to generate script"
                );
                Err(e)
            }
        }
    }

    /// Exchange one open-ended chat turn
    ///
    /// Appends `text` as a user message, transmits the full conversation,
    /// appends the assistant reply, and returns the raw reply text - no
    /// normalization.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] on transport failure.
    pub async fn generate_response(&mut self, text: &str) -> Result<String, GenerateError> {
        self.conversation.push_user(text);

        let reply = self
            .transport
            .chat(&self.model, self.conversation.messages())
            .await?;

        tracing::debug!(
            backend = self.transport.name(),
            model = %self.model,
            reply_chars = reply.len(),
            "backend reply received"
        );

        self.conversation.push_assistant(reply.clone());
        Ok(reply)
    }
}
