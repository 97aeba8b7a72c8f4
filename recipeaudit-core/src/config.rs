//! Configuration system for recipeaudit.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment. Configuration is loaded from
//! `~/.config/recipeaudit/config.toml` and/or `.recipeaudit/config.toml`
//! in the working directory, then overridden by `RECIPEAUDIT_`-prefixed
//! environment variables (`RECIPEAUDIT_LLM__BACKEND`, etc.).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Top-level configuration for the audit service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub audit: AuditConfig,
    pub ui: UiConfig,
}

/// LLM backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend selector: "openai" (direct, OpenAI-compatible) or "gateway".
    pub backend: String,
    /// Default model identifier.
    pub model: String,
    /// Environment variable holding the direct-backend API key.
    pub api_key_env: String,
    /// Explicit API key; takes precedence over `api_key_env` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL for the direct backend (defaults to the OpenAI API).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Gateway endpoint URL.
    pub gateway_url: String,
    /// Environment variable holding the gateway bearer credential.
    pub gateway_key_env: String,
    /// Virtual key forwarded in the gateway envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_virtual_key: Option<String>,
    /// Upstream provider slug forwarded to the gateway.
    pub gateway_provider: String,
    /// Retry attempts forwarded to the gateway. Never enforced locally;
    /// the gateway performs its own retries.
    pub gateway_retry_attempts: u32,
    /// Sampling temperature. Kept at 0 for deterministic decoding.
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            base_url: None,
            gateway_url: "http://internal-api.example.com".to_string(),
            gateway_key_env: "GATEWAY_API_KEY".to_string(),
            gateway_virtual_key: None,
            gateway_provider: "azure-openai".to_string(),
            gateway_retry_attempts: 3,
            temperature: 0.0,
            top_p: 1.0,
        }
    }
}

/// Audit pipeline limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Hard cap on records sent to the model; larger slices are truncated
    /// with a warning, never an error.
    pub max_entries: usize,
    /// Default number of entries audited when the user does not choose.
    pub default_entry_limit: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_entries: 64,
            default_entry_limit: 100,
        }
    }
}

/// Web shell bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8722,
        }
    }
}

impl LlmConfig {
    /// Validate that the selected backend can actually authenticate.
    ///
    /// Called once at process start; binaries refuse to start on error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend.as_str() {
            "openai" => {
                if self.api_key.is_none() && std::env::var(&self.api_key_env).is_err() {
                    return Err(ConfigError::MissingCredential {
                        var: self.api_key_env.clone(),
                        backend: self.backend.clone(),
                    });
                }
                Ok(())
            }
            "gateway" => {
                if std::env::var(&self.gateway_key_env).is_err() {
                    return Err(ConfigError::MissingCredential {
                        var: self.gateway_key_env.clone(),
                        backend: self.backend.clone(),
                    });
                }
                Ok(())
            }
            other => Err(ConfigError::UnsupportedBackend {
                backend: other.to_string(),
            }),
        }
    }
}

impl AppConfig {
    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.llm.validate()?;
        if self.audit.max_entries == 0 {
            return Err(ConfigError::Invalid {
                message: "audit.max_entries must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Load configuration with layered precedence.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `RECIPEAUDIT_`, `__` splits sections)
/// 2. Workspace-local config (`.recipeaudit/config.toml`)
/// 3. User config (`~/.config/recipeaudit/config.toml`)
/// 4. Built-in defaults
pub fn load_config(workspace: Option<&Path>) -> Result<AppConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "recipeaudit", "recipeaudit") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".recipeaudit").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    figment = figment.merge(Env::prefixed("RECIPEAUDIT_").split("__"));

    figment.extract().map_err(Box::new)
}
