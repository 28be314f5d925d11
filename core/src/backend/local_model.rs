//! Local Model Server Backend
//!
//! Ollama-style local model server. Same single-call-per-turn shape as
//! the cloud backend against a different endpoint; the `/api/chat`
//! endpoint accepts the message history directly.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::backend::traits::{ChatTransport, GenerateError};
use crate::conversation::Message;

/// Local model server backend
#[derive(Clone)]
pub struct LocalModel {
    base_url: String,
    http_client: reqwest::Client,
}

impl LocalModel {
    /// Create a backend against `base_url` (e.g. `http://127.0.0.1:11434`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url.trim_end_matches('/'))
    }

    /// Request body for a chat call
    fn build_request_body(model: &str, history: &[Message]) -> Value {
        json!({
            "model": model,
            "messages": history,
            "stream": false,
        })
    }

    /// Reply text from a chat response
    fn extract_content(data: &Value) -> Option<String> {
        data.get("message")?
            .get("content")?
            .as_str()
            .map(String::from)
    }
}

#[async_trait]
impl ChatTransport for LocalModel {
    fn name(&self) -> &'static str {
        "LocalModel"
    }

    async fn chat(&self, model: &str, history: &[Message]) -> Result<String, GenerateError> {
        let response = self
            .http_client
            .post(self.chat_url())
            .json(&Self::build_request_body(model, history))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::BadStatus {
                backend: self.name(),
                status,
                body,
            });
        }

        let data: Value = response.json().await?;
        Self::extract_content(&data).ok_or(GenerateError::NoContent)
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.tags_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok()
    }

    async fn list_models(&self) -> Result<Vec<String>, GenerateError> {
        let response = self
            .http_client
            .get(self.tags_url())
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::BadStatus {
                backend: self.name(),
                status,
                body,
            });
        }

        let data: Value = response.json().await?;
        let models = data
            .get("models")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m.get("name")?.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }
}
