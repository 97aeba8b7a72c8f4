//! Response normalization: raw model text into a parsed [`AuditResult`].
//!
//! Models wrap their JSON in Markdown fences or surrounding prose often
//! enough that a two-stage parse is used: strict parse of the extracted
//! block first, then a bounded first-`{`-to-last-`}` substring salvage.
//! Both stages failing is a hard error that carries the raw text for
//! diagnostics; no partial result is ever produced.

use crate::error::LlmError;
use crate::types::AuditResult;
use tracing::{debug, error};

/// Strip Markdown fences and surrounding prose from raw model output.
///
/// Trimmed text starting with `{` is used as-is. Otherwise the interior of
/// the first ```json fenced block is extracted. Failing both, the trimmed
/// text is passed through unchanged for the parser to reject.
pub fn extract_json_block(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }

    if let Some(start) = trimmed.find("```json") {
        let interior = &trimmed[start + "```json".len()..];
        if let Some(end) = interior.find("```") {
            return interior[..end].trim();
        }
    }

    trimmed
}

/// Parse raw model output into an [`AuditResult`].
///
/// Stage one: strict parse of the extracted block. Stage two: greedy
/// substring from the first `{` to the last `}` of the raw text. Missing
/// `summary_text` becomes the empty string and a missing
/// `data_quality_score` defaults to 5 (serde defaults on the type).
pub fn parse_audit_result(raw: &str) -> Result<AuditResult, LlmError> {
    let block = extract_json_block(raw);

    match serde_json::from_str::<AuditResult>(block) {
        Ok(result) => Ok(result),
        Err(strict_err) => {
            debug!(error = %strict_err, "Strict parse failed, attempting substring salvage");
            salvage(raw).ok_or_else(|| {
                error!(raw = %raw, "Failed to parse JSON output from the backend");
                LlmError::UnparseableOutput {
                    raw: raw.to_string(),
                }
            })
        }
    }
}

/// Second-stage parse: the substring from the first `{` through the last `}`.
fn salvage(raw: &str) -> Option<AuditResult> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<AuditResult>(&raw[start..=end]).ok()
}
