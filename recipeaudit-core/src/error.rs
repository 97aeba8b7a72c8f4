//! Error types for the recipeaudit core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering input decoding, LLM provider, report rendering, and
//! configuration domains.

/// Top-level error type for the recipeaudit core library.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Input error: {0}")]
    Decode(#[from] DecodeError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No records to audit")]
    NoRecords,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from decoding an uploaded recipe file into records.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("File contains binary data or embedded null bytes")]
    BinaryContent,

    #[error("File is not valid UTF-8 text: {message}")]
    NotUtf8 { message: String },

    #[error("Unsupported file extension '{extension}' (expected .json or .csv)")]
    UnsupportedExtension { extension: String },

    #[error("Malformed JSON input: {message}")]
    MalformedJson { message: String },

    #[error("JSON input must be an array of objects: {message}")]
    NotAnArray { message: String },

    #[error("Malformed CSV input: {message}")]
    MalformedCsv { message: String },
}

/// Errors from LLM provider interactions and response handling.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Model output is not valid JSON, even after salvage")]
    UnparseableOutput { raw: String },

    #[error("Unsupported LLM backend: {backend}")]
    UnsupportedBackend { backend: String },
}

/// Errors from rendering the PDF report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("No usable font found for PDF rendering: {message}")]
    FontNotFound { message: String },

    #[error("Failed to render PDF: {message}")]
    Render { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing credential: environment variable '{var}' is not set for backend '{backend}'")]
    MissingCredential { var: String, backend: String },

    #[error("Unsupported LLM backend '{backend}' (expected 'openai' or 'gateway')")]
    UnsupportedBackend { backend: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// A type alias for results using the top-level `AuditError`.
pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_decode() {
        let err = AuditError::Decode(DecodeError::BinaryContent);
        assert_eq!(
            err.to_string(),
            "Input error: File contains binary data or embedded null bytes"
        );
    }

    #[test]
    fn test_error_display_llm() {
        let err = AuditError::Llm(LlmError::ApiRequest {
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "LLM error: API request failed: connection refused"
        );
    }

    #[test]
    fn test_error_display_no_records() {
        assert_eq!(AuditError::NoRecords.to_string(), "No records to audit");
    }

    #[test]
    fn test_error_display_config() {
        let err = AuditError::Config(ConfigError::MissingCredential {
            var: "OPENAI_API_KEY".into(),
            backend: "openai".into(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing credential: environment variable 'OPENAI_API_KEY' is not set for backend 'openai'"
        );
    }

    #[test]
    fn test_unparseable_output_keeps_raw_text() {
        let err = LlmError::UnparseableOutput {
            raw: "not json at all".into(),
        };
        match err {
            LlmError::UnparseableOutput { raw } => assert_eq!(raw, "not json at all"),
            other => panic!("Expected UnparseableOutput, got {:?}", other),
        }
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: AuditError = serde_err.into();
        assert!(matches!(err, AuditError::Serialization(_)));
    }
}
