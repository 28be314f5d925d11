//! Core Configuration
//!
//! The resolved configuration object handed to the core at startup.
//! Reading and writing config files, interactive wizards, and credential
//! storage all live with the caller; the core receives a finished
//! [`CoreConfig`] and holds no ambient configuration state of its own.
//!
//! # Environment Constructors
//!
//! `from_env` constructors are provided for callers that resolve
//! configuration from the environment:
//!
//! - `INCANT_BACKEND`: `cloud`, `local`, or `daemon`
//! - `INCANT_API_KEY`, `INCANT_API_URL`, `INCANT_MODEL`
//! - `INCANT_LOCAL_URL`, `INCANT_DAEMON_ADDR`
//!
//! They are plain constructors; nothing reads the environment after
//! startup.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default base URL for the cloud chat API
pub const DEFAULT_CLOUD_API_URL: &str = "https://api.openai.com/v1";

/// Default model for the cloud chat API
pub const DEFAULT_CLOUD_MODEL: &str = "gpt-4o";

/// Default base URL for the local model server
pub const DEFAULT_LOCAL_URL: &str = "http://127.0.0.1:11434";

/// Default address of the local assistant daemon
pub const DEFAULT_DAEMON_ADDR: &str = "127.0.0.1:3000";

/// Errors raised while validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required value is empty or absent
    #[error("missing configuration value: {0}")]
    MissingValue(&'static str),
    /// A value is present but unusable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which backend variant to construct, with its connection parameters
///
/// Selected once at configuration time; nothing downstream branches on
/// the variant again.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendSelection {
    /// Cloud chat API (OpenAI-compatible)
    CloudChat {
        /// API key for authentication
        api_key: String,
        /// Base URL of the API
        api_url: String,
        /// Model identifier
        model: String,
    },
    /// Locally hosted model server (Ollama-style API)
    LocalModel {
        /// Base URL of the server
        url: String,
        /// Model identifier
        model: String,
    },
    /// Local assistant daemon reached over a persistent socket
    AssistantDaemon {
        /// Daemon address, `host:port`
        addr: String,
        /// Model title as configured in the daemon
        model: String,
    },
}

impl BackendSelection {
    /// The model identifier for the selected variant
    #[must_use]
    pub fn model(&self) -> &str {
        match self {
            Self::CloudChat { model, .. }
            | Self::LocalModel { model, .. }
            | Self::AssistantDaemon { model, .. } => model,
        }
    }
}

/// Resolved configuration for the backend core
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoreConfig {
    /// The backend variant to drive
    pub backend: BackendSelection,
}

impl CoreConfig {
    /// Create a configuration for the given backend selection
    #[must_use]
    pub fn new(backend: BackendSelection) -> Self {
        Self { backend }
    }

    /// Cloud chat configuration with default URL filled in when empty
    #[must_use]
    pub fn cloud_chat(
        api_key: impl Into<String>,
        api_url: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::new(BackendSelection::CloudChat {
            api_key: api_key.into(),
            api_url: api_url.unwrap_or_else(|| DEFAULT_CLOUD_API_URL.to_string()),
            model: model.into(),
        })
    }

    /// Local model server configuration
    #[must_use]
    pub fn local_model(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(BackendSelection::LocalModel {
            url: url.into(),
            model: model.into(),
        })
    }

    /// Assistant daemon configuration
    #[must_use]
    pub fn assistant_daemon(addr: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(BackendSelection::AssistantDaemon {
            addr: addr.into(),
            model: model.into(),
        })
    }

    /// Resolve a configuration from `INCANT_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `INCANT_BACKEND` names an unknown
    /// variant or the resolved configuration fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = std::env::var("INCANT_BACKEND").unwrap_or_else(|_| "local".to_string());
        let model = std::env::var("INCANT_MODEL").ok();

        let config = match backend.as_str() {
            "cloud" => Self::cloud_chat(
                std::env::var("INCANT_API_KEY").unwrap_or_default(),
                std::env::var("INCANT_API_URL").ok(),
                model.unwrap_or_else(|| DEFAULT_CLOUD_MODEL.to_string()),
            ),
            "local" => Self::local_model(
                std::env::var("INCANT_LOCAL_URL")
                    .unwrap_or_else(|_| DEFAULT_LOCAL_URL.to_string()),
                model.ok_or_else(|| ConfigError::MissingValue("INCANT_MODEL"))?,
            ),
            "daemon" => Self::assistant_daemon(
                std::env::var("INCANT_DAEMON_ADDR")
                    .unwrap_or_else(|_| DEFAULT_DAEMON_ADDR.to_string()),
                model.ok_or_else(|| ConfigError::MissingValue("INCANT_MODEL"))?,
            ),
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown backend `{other}` (expected cloud, local, or daemon)"
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the selected variant has usable connection parameters
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.model().is_empty() {
            return Err(ConfigError::MissingValue("model"));
        }

        match &self.backend {
            BackendSelection::CloudChat { api_key, api_url, .. } => {
                if api_key.is_empty() {
                    return Err(ConfigError::MissingValue("api_key"));
                }
                if !api_url.starts_with("http") {
                    return Err(ConfigError::Invalid(format!(
                        "api_url `{api_url}` is not an HTTP(S) URL"
                    )));
                }
            }
            BackendSelection::LocalModel { url, .. } => {
                if !url.starts_with("http") {
                    return Err(ConfigError::Invalid(format!(
                        "url `{url}` is not an HTTP(S) URL"
                    )));
                }
            }
            BackendSelection::AssistantDaemon { addr, .. } => {
                if !addr.contains(':') {
                    return Err(ConfigError::Invalid(format!(
                        "daemon addr `{addr}` is not host:port"
                    )));
                }
            }
        }

        Ok(())
    }
}
