//! Severity reconciliation and aggregate statistics.
//!
//! The model's own severity judgment is advisory: whenever a deviation's
//! type appears in the static override table, the mapped severity wins.
//! Statistics are then recomputed locally in one linear pass so the report
//! never depends on arithmetic the model did.

use crate::error::AuditError;
use crate::types::{AuditResult, Severity, SummaryStats};
use std::collections::BTreeMap;
use tracing::warn;

/// Static deviation-type to severity override table.
///
/// Types not listed here keep whatever severity the model assigned.
pub fn mapped_severity(deviation_type: &str) -> Option<Severity> {
    match deviation_type {
        // Critical issues
        "Missing Required Step"
        | "Grossly Incorrect Quantity"
        | "Conflicting Status Code"
        | "Negative Quantity"
        | "Data Conflict"
        | "Invalid Status"
        | "Step Contradicts Approved Recipe"
        | "Potential Falsification"
        | "Timestamp Sequence Error"
        | "Missing Mandatory Field" => Some(Severity::Critical),
        // Moderate issues
        "Slightly Out of Range Quantity"
        | "Incomplete Operator Name"
        | "Non-Standard Timestamp"
        | "Duplicate Record"
        | "Use of Deprecated Process Code"
        | "Inconsistent Sequencing"
        | "Missing Recommended Field"
        | "Format Error"
        | "Value Out of Range"
        | "Invalid Date Format"
        | "Partial Data Entry"
        | "Data Inconsistency" => Some(Severity::Moderate),
        // Minor issues
        "Minor Formatting Error"
        | "Non-Critical Typo"
        | "Slight Naming Deviation"
        | "Extra Spaces"
        | "Alternative Terminology"
        | "Timestamps Missing Seconds"
        | "Inconsistent Casing" => Some(Severity::Minor),
        _ => None,
    }
}

/// Re-apply the static severity mapping over every deviation.
///
/// Idempotent: a second pass over already-reconciled results is a no-op.
pub fn reconcile(result: &mut AuditResult) {
    for finding in &mut result.records {
        for deviation in &mut finding.deviations {
            if let Some(severity) = mapped_severity(deviation.deviation_type.trim()) {
                deviation.severity = severity.to_string();
            }
        }
    }
}

/// Compute aggregate statistics from a reconciled result.
///
/// `total_entries_in_file` is the pre-slice record count of the uploaded
/// file, reported alongside the audited count. An empty result set is an
/// explicit error rather than a division by zero.
pub fn compute_stats(
    result: &AuditResult,
    total_entries_in_file: usize,
) -> Result<SummaryStats, AuditError> {
    let total_records = result.records.len();
    if total_records == 0 {
        return Err(AuditError::NoRecords);
    }

    let mut critical = 0usize;
    let mut moderate = 0usize;
    let mut minor = 0usize;
    let mut unrecognized = 0usize;
    let mut critical_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut moderate_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut records_with_deviations = 0usize;
    let mut records_with_multiple_deviations = 0usize;

    for finding in &result.records {
        if finding.deviations.is_empty() {
            continue;
        }
        records_with_deviations += 1;
        if finding.deviations.len() > 1 {
            records_with_multiple_deviations += 1;
        }
        for deviation in &finding.deviations {
            // A missing "type" field deserializes to "", so absent and
            // empty types both land on the fallback label here.
            let type_label = if deviation.deviation_type.is_empty() {
                "Unknown".to_string()
            } else {
                deviation.deviation_type.clone()
            };
            match Severity::parse(&deviation.severity) {
                Some(Severity::Critical) => {
                    critical += 1;
                    *critical_types.entry(type_label).or_insert(0) += 1;
                }
                Some(Severity::Moderate) => {
                    moderate += 1;
                    *moderate_types.entry(type_label).or_insert(0) += 1;
                }
                Some(Severity::Minor) => minor += 1,
                None => {
                    warn!(
                        severity = %deviation.severity,
                        deviation_type = %type_label,
                        "Unrecognized severity string, excluded from severity totals"
                    );
                    unrecognized += 1;
                }
            }
        }
    }

    let records_fully_compliant = total_records - records_with_deviations;
    let compliance_rate =
        ((records_fully_compliant as f64 / total_records as f64) * 1000.0).round() / 10.0;

    Ok(SummaryStats {
        data_quality_score: result.data_quality_score,
        total_records,
        total_entries_in_file,
        records_with_deviations,
        records_with_multiple_deviations,
        records_fully_compliant,
        compliance_rate,
        critical,
        moderate,
        minor,
        unrecognized,
        critical_types,
        moderate_types,
    })
}
