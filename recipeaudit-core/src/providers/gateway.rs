//! Internal gateway/proxy backend.
//!
//! Posts a JSON envelope containing the messages plus routing credentials
//! (virtual key, upstream provider slug, retry budget) to a fixed internal
//! endpoint. A non-200 response is a hard failure. The retry budget is
//! forwarded for the gateway to enforce; no retries happen locally.

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::types::Message;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, error};

use super::LlmProvider;

/// Gateway/proxy chat completion backend.
#[derive(Debug)]
pub struct GatewayProvider {
    client: Client,
    url: String,
    bearer: String,
    virtual_key: Option<String>,
    provider_slug: String,
    retry_attempts: u32,
}

impl GatewayProvider {
    /// Create a new provider from configuration.
    ///
    /// Reads the bearer credential from the environment variable named in
    /// `config.gateway_key_env`.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let bearer =
            std::env::var(&config.gateway_key_env).map_err(|_| LlmError::AuthFailed {
                provider: format!("gateway: env var '{}' not set", config.gateway_key_env),
            })?;

        Ok(Self {
            client: Client::new(),
            url: config.gateway_url.clone(),
            bearer,
            virtual_key: config.gateway_virtual_key.clone(),
            provider_slug: config.gateway_provider.clone(),
            retry_attempts: config.gateway_retry_attempts,
        })
    }

    /// Pull the model text out of the gateway response body.
    ///
    /// The gateway normally relays a chat-completion envelope; when it does,
    /// the first choice's content is returned. Anything else is passed
    /// through as raw text for the normalizer to salvage.
    fn extract_content(body: &str) -> String {
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            if let Some(content) = value
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|choice| choice.get("message"))
                .and_then(|message| message.get("content"))
                .and_then(|content| content.as_str())
            {
                return content.trim().to_string();
            }
        }
        body.trim().to_string()
    }
}

#[async_trait]
impl LlmProvider for GatewayProvider {
    async fn complete(&self, messages: &[Message], model: &str) -> Result<String, LlmError> {
        let payload = json!({
            "model": model,
            "messages": super::messages_to_json(messages),
            "virtual_key": self.virtual_key,
            "provider": self.provider_slug,
            "retry": { "attempts": self.retry_attempts },
        });

        debug!(url = %self.url, model = %model, "Sending gateway request");

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.bearer))
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest {
                message: format!("Gateway request failed: {}", e),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LlmError::ApiRequest {
            message: format!("Failed to read gateway response body: {}", e),
        })?;

        if status.as_u16() != 200 {
            error!(status = %status, body = %body, "Gateway call failed");
            return Err(LlmError::ApiRequest {
                message: format!("Gateway call failed with HTTP {}", status),
            });
        }

        Ok(Self::extract_content(&body))
    }

    fn name(&self) -> &str {
        "gateway"
    }
}
