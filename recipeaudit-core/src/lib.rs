//! # Recipeaudit Core
//!
//! Core library for the recipe quality audit service. Provides the audit
//! pipeline (file decoding, prompt building, LLM backends, response
//! normalization, severity reconciliation, PDF reporting), configuration,
//! and fundamental types.

pub mod config;
pub mod decode;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod report;
pub mod severity;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{AppConfig, AuditConfig, LlmConfig, UiConfig, load_config};
pub use error::{AuditError, ConfigError, DecodeError, LlmError, ReportError, Result};
pub use pipeline::{AuditOutcome, AuditPipeline};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_PROMPT, EntryLimit};
pub use providers::{LlmProvider, create_provider};
pub use types::{
    AuditResult, Deviation, Message, Record, RecordFinding, Role, RunState, Severity, SummaryStats,
};
