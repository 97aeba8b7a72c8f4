//! The audit pipeline: decode -> slice -> prompt -> LLM -> normalize ->
//! reconcile -> stats -> report.
//!
//! One synchronous run at a time; every stage failure aborts the run and
//! surfaces as a single [`AuditError`]. Nothing is persisted across runs.

use crate::config::AppConfig;
use crate::decode::decode_records;
use crate::error::Result;
use crate::normalize::parse_audit_result;
use crate::prompt::{EntryLimit, build_messages, estimate_cost, slice_records};
use crate::providers::{LlmProvider, create_provider};
use crate::report::{render_report, report_filename};
use crate::severity::{compute_stats, reconcile};
use crate::types::{AuditResult, Record, SummaryStats};
use std::sync::Arc;
use tracing::info;

/// Everything one successful run produces.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    /// The rendered PDF.
    pub pdf: Vec<u8>,
    /// Download filename for the PDF.
    pub filename: String,
    /// Locally recomputed statistics.
    pub stats: SummaryStats,
    /// The reconciled model verdict.
    pub result: AuditResult,
}

/// Orchestrates one audit run end to end.
pub struct AuditPipeline {
    config: AppConfig,
    provider: Arc<dyn LlmProvider>,
}

impl AuditPipeline {
    /// Create a pipeline with an explicit provider (used by tests and
    /// anywhere the provider is constructed separately).
    pub fn new(config: AppConfig, provider: Arc<dyn LlmProvider>) -> Self {
        Self { config, provider }
    }

    /// Create a pipeline with the provider selected by the configuration.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let provider = create_provider(&config.llm)?;
        Ok(Self { config, provider })
    }

    /// The configured default model identifier.
    pub fn default_model(&self) -> &str {
        &self.config.llm.model
    }

    /// The configured default entry limit for the UI controls.
    pub fn default_entry_limit(&self) -> usize {
        self.config.audit.default_entry_limit
    }

    /// Run everything up to (and including) the statistics pass.
    ///
    /// Returns the reconciled result, the recomputed stats, and the record
    /// slice that was analyzed (for the report appendix).
    pub async fn analyze(
        &self,
        bytes: &[u8],
        filename: &str,
        limit: EntryLimit,
        model: Option<&str>,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<(AuditResult, SummaryStats, Vec<Record>)> {
        let records = decode_records(bytes, filename)?;
        if records.is_empty() {
            return Err(crate::error::AuditError::NoRecords);
        }
        let total_entries = records.len();

        let slice = slice_records(&records, limit, self.config.audit.max_entries);
        let messages = build_messages(slice, system_prompt, user_prompt);
        let model = model.unwrap_or(&self.config.llm.model);

        // Rough 4-chars-per-token estimate, logged for cost visibility
        let est_tokens = messages.iter().map(|m| m.content.len()).sum::<usize>() / 4;
        info!(
            backend = self.provider.name(),
            model = %model,
            entries = slice.len(),
            total_entries,
            estimated_tokens = est_tokens,
            estimated_cost_usd = estimate_cost(est_tokens, model),
            "Starting audit run"
        );

        let raw = self.provider.complete(&messages, model).await?;
        let mut result = parse_audit_result(&raw)?;
        reconcile(&mut result);
        let stats = compute_stats(&result, total_entries)?;

        info!(
            records = stats.total_records,
            compliance_rate = stats.compliance_rate,
            critical = stats.critical,
            "Audit run complete"
        );

        Ok((result, stats, slice.to_vec()))
    }

    /// Run a full audit and render the PDF report.
    pub async fn run(
        &self,
        bytes: &[u8],
        filename: &str,
        limit: EntryLimit,
        model: Option<&str>,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<AuditOutcome> {
        let (result, stats, analyzed) = self
            .analyze(bytes, filename, limit, model, system_prompt, user_prompt)
            .await?;

        let pdf = render_report(&result, &stats, filename, &analyzed)?;
        let outcome_filename = report_filename(filename);

        Ok(AuditOutcome {
            pdf,
            filename: outcome_filename,
            stats,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuditError, LlmError};
    use crate::types::Message;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records every outbound call and replies with a canned response.
    #[derive(Debug)]
    struct MockProvider {
        calls: AtomicUsize,
        response: String,
    }

    impl MockProvider {
        fn new(response: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: response.to_string(),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            _model: &str,
        ) -> std::result::Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn pipeline_with(provider: Arc<MockProvider>) -> AuditPipeline {
        AuditPipeline::new(AppConfig::default(), provider)
    }

    const SCENARIO_CSV: &[u8] =
        b"id,step,qty,operator\nR1,Mix,5,Alice\nR2,,7,Bob\nR3,Heat,-2,Carol\n";

    /// Classifies the missing step and the negative quantity as Minor; the
    /// reconciler must upgrade both to Critical.
    const SCENARIO_RESPONSE: &str = r#"```json
{
  "summary_text": "Two of three records have integrity issues.",
  "data_quality_score": 6,
  "records": [
    {"record_id": "R1", "deviations": []},
    {"record_id": "R2", "deviations": [
      {"type": "Missing Required Step", "severity": "Minor", "description": "step field is empty"}
    ]},
    {"record_id": "R3", "deviations": [
      {"type": "Negative Quantity", "severity": "Minor", "description": "qty is -2"}
    ]}
  ]
}
```"#;

    #[tokio::test]
    async fn test_end_to_end_csv_scenario() {
        let provider = Arc::new(MockProvider::new(SCENARIO_RESPONSE));
        let pipeline = pipeline_with(provider.clone());

        let (result, stats, analyzed) = pipeline
            .analyze(
                SCENARIO_CSV,
                "batch.csv",
                EntryLimit::Count(100),
                None,
                "sys",
                "usr",
            )
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 1);
        assert_eq!(analyzed.len(), 3);

        // Reconciliation overrides the model's Minor with Critical
        assert_eq!(result.records[1].deviations[0].severity, "Critical");
        assert_eq!(result.records[2].deviations[0].severity, "Critical");

        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.records_fully_compliant, 1);
        assert_eq!(stats.compliance_rate, 33.3);
        assert_eq!(stats.critical, 2);
        assert_eq!(stats.minor, 0);
    }

    #[tokio::test]
    async fn test_binary_input_rejected_before_any_call() {
        let provider = Arc::new(MockProvider::new("{}"));
        let pipeline = pipeline_with(provider.clone());

        let bytes = b"id,qty\nR1,\x005\n";
        let err = pipeline
            .analyze(bytes, "batch.csv", EntryLimit::Full, None, "sys", "usr")
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::Decode(_)));
        assert_eq!(provider.call_count(), 0, "no outbound request may happen");
    }

    #[tokio::test]
    async fn test_empty_file_is_explicit_error() {
        let provider = Arc::new(MockProvider::new("{}"));
        let pipeline = pipeline_with(provider.clone());

        let err = pipeline
            .analyze(b"[]", "batch.json", EntryLimit::Full, None, "sys", "usr")
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::NoRecords));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_model_output_aborts() {
        let provider = Arc::new(MockProvider::new("I could not audit this."));
        let pipeline = pipeline_with(provider);

        let err = pipeline
            .analyze(
                b"[{\"id\": \"R1\"}]",
                "batch.json",
                EntryLimit::Full,
                None,
                "sys",
                "usr",
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AuditError::Llm(LlmError::UnparseableOutput { .. })
        ));
    }

    #[tokio::test]
    async fn test_truncation_respects_max_entries() {
        #[derive(Debug)]
        struct CapturingProvider {
            sent: std::sync::Mutex<Option<String>>,
        }

        #[async_trait]
        impl LlmProvider for CapturingProvider {
            async fn complete(
                &self,
                messages: &[Message],
                _model: &str,
            ) -> std::result::Result<String, LlmError> {
                *self.sent.lock().unwrap() = Some(messages[1].content.clone());
                Ok(r#"{"summary_text":"","data_quality_score":5,"records":[{"record_id":"R0","deviations":[]}]}"#.to_string())
            }
            fn name(&self) -> &str {
                "capture"
            }
        }

        let provider = Arc::new(CapturingProvider {
            sent: std::sync::Mutex::new(None),
        });
        let mut config = AppConfig::default();
        config.audit.max_entries = 2;
        let pipeline = AuditPipeline::new(config, provider.clone());

        let json = br#"[{"id":"R0"},{"id":"R1"},{"id":"R2"},{"id":"R3"}]"#;
        pipeline
            .analyze(json, "batch.json", EntryLimit::Full, None, "sys", "usr")
            .await
            .unwrap();

        let sent = provider.sent.lock().unwrap().clone().unwrap();
        assert!(sent.contains("\"R0\""));
        assert!(sent.contains("\"R1\""));
        assert!(!sent.contains("\"R2\""), "cap must truncate to first 2");
    }
}
