//! Cloud Chat Backend
//!
//! OpenAI-compatible chat-completions API. One synchronous call per turn
//! carrying the full message list; no streaming.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::backend::traits::{ChatTransport, GenerateError};
use crate::conversation::Message;

/// Cloud chat API backend
#[derive(Clone)]
pub struct CloudChat {
    api_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl CloudChat {
    /// Create a backend against `api_url` (the `/v1` base) with `api_key`
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.api_url.trim_end_matches('/'))
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.api_url.trim_end_matches('/'))
    }

    /// Request body for a chat-completions call
    fn build_request_body(model: &str, history: &[Message]) -> Value {
        json!({
            "model": model,
            "messages": history,
        })
    }

    /// Reply text from a chat-completions response
    fn extract_content(data: &Value) -> Option<String> {
        data.get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()
            .map(String::from)
    }
}

#[async_trait]
impl ChatTransport for CloudChat {
    fn name(&self) -> &'static str {
        "CloudChat"
    }

    async fn chat(&self, model: &str, history: &[Message]) -> Result<String, GenerateError> {
        let response = self
            .http_client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
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
            .get(self.models_url())
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    async fn list_models(&self) -> Result<Vec<String>, GenerateError> {
        let response = self
            .http_client
            .get(self.models_url())
            .bearer_auth(&self.api_key)
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
            .get("data")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m.get("id")?.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }
}
