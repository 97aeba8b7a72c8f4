//! LLM backend implementations.
//!
//! Provides concrete implementations of the `LlmProvider` trait for:
//! - OpenAI-compatible chat completion APIs (direct backend)
//! - an internal gateway/proxy service (Portkey-style envelope)
//!
//! Use `create_provider()` to instantiate the appropriate backend based on
//! config. The backend is selected once at startup, never per request.

pub mod gateway;
pub mod openai;

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::types::Message;
use async_trait::async_trait;
use std::sync::Arc;

pub use gateway::GatewayProvider;
pub use openai::OpenAiProvider;

/// A chat completion backend.
///
/// One synchronous request per audit run: the two role-tagged messages go
/// out, the raw model text comes back. No retry or backoff is performed
/// here; upstream failures surface immediately to the caller.
#[async_trait]
pub trait LlmProvider: Send + Sync + std::fmt::Debug {
    /// Send the messages and return the raw text of the model's reply.
    async fn complete(&self, messages: &[Message], model: &str) -> Result<String, LlmError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Create an LLM provider based on the configuration.
///
/// Routes to the appropriate backend implementation:
/// - `"openai"` -> `OpenAiProvider` (OpenAI or any compatible endpoint)
/// - `"gateway"` -> `GatewayProvider` (internal proxy with virtual keys)
///
/// Returns an error for unknown backend names or missing credentials.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config)?)),
        "gateway" => Ok(Arc::new(GatewayProvider::new(config)?)),
        other => Err(LlmError::UnsupportedBackend {
            backend: other.to_string(),
        }),
    }
}

/// Convert messages to the OpenAI chat-completion JSON shape.
pub(crate) fn messages_to_json(messages: &[Message]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|msg| {
            serde_json::json!({
                "role": msg.role.to_string(),
                "content": msg.content,
            })
        })
        .collect()
}
