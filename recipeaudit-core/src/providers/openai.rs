//! Direct OpenAI-compatible backend.
//!
//! Works against OpenAI or any endpoint following the chat completions API
//! format. Decoding is deterministic: temperature 0, top_p 1.

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::types::Message;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::LlmProvider;

/// OpenAI-compatible chat completion backend.
#[derive(Debug)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    temperature: f32,
    top_p: f32,
}

impl OpenAiProvider {
    /// Create a new provider from configuration.
    ///
    /// Uses the explicit API key when set, otherwise reads the environment
    /// variable named in `config.api_key_env`.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(&config.api_key_env).ok())
            .ok_or_else(|| LlmError::AuthFailed {
                provider: format!("openai: env var '{}' not set", config.api_key_env),
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client: Client::new(),
            base_url,
            api_key,
            temperature: config.temperature,
            top_p: config.top_p,
        })
    }

    /// Map an HTTP status code to the appropriate LlmError.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 => {
                debug!(body = %body, "Authentication failed (401)");
                LlmError::AuthFailed {
                    provider: "openai".to_string(),
                }
            }
            429 => LlmError::RateLimited {
                retry_after_secs: 5,
            },
            status if status >= 500 => LlmError::ApiRequest {
                message: format!("Server error ({}): {}", status, body),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {}: {}", status, body),
            },
        }
    }

    /// Extract the text of the first choice from a chat-completion body.
    fn parse_response(body: &Value) -> Result<String, LlmError> {
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(|text| text.trim().to_string())
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No message content in first choice".to_string(),
            })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, messages: &[Message], model: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": model,
            "messages": super::messages_to_json(messages),
            "temperature": self.temperature,
            "top_p": self.top_p,
            "stream": false,
        });

        debug!(url = %url, model = %model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest {
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| LlmError::ApiRequest {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {}", e),
            })?;

        Self::parse_response(&json)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
