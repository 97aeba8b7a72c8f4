//! PDF report rendering.
//!
//! Lays out the audit report with genpdf: title, audited filename and
//! timestamp, executive summary, the nine headline metrics, top deviation
//! type lists, a remediation advisory, per-record detailed findings sorted
//! worst-first, and an appendix with the analyzed record slice.
//!
//! genpdf's built-in encoding is single-byte, so all text is passed through
//! a lossy Latin-1 sanitizer before layout.

use crate::error::ReportError;
use crate::prompt::canonical_json;
use crate::types::{AuditResult, Record, RecordFinding, Severity, SummaryStats};
use chrono::Utc;
use chrono_tz::Europe::Zurich;
use genpdf::elements::{Break, Paragraph};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::{Style, StyledString};
use genpdf::{Document, SimplePageDecorator};
use std::collections::BTreeMap;

const ADVISORY_NOTE: &str = "Advisory: records flagged with Critical deviations must be \
quarantined and reviewed by quality assurance before batch release. Moderate deviations \
should be corrected at the source system and re-audited. Recurring deviation types \
indicate a process or training gap rather than isolated data entry mistakes.";

/// Drop every character outside the single-byte Latin-1 range.
pub fn latin1_lossy(text: &str) -> String {
    text.chars().filter(|c| (*c as u32) <= 0xFF).collect()
}

/// Build the report download filename:
/// `<timestamp>_<sanitized-original-name>_audit_report.pdf`.
pub fn report_filename(original_filename: &str) -> String {
    let timestamp = Utc::now()
        .with_timezone(&Zurich)
        .format("%Y-%m-%d %H:%M:%S %Z");
    let stem = original_filename
        .trim_end_matches(".json")
        .trim_end_matches(".csv")
        .replace(' ', "_");
    format!("{}_{}_audit_report.pdf", timestamp, stem)
}

/// The worst (lowest-ordinal) recognized severity among a record's deviations.
pub fn worst_severity(finding: &RecordFinding) -> Option<Severity> {
    finding
        .deviations
        .iter()
        .filter_map(|d| Severity::parse(&d.severity))
        .min()
}

/// Records with deviations, sorted ascending by their worst severity
/// (critical first). Records whose severities are all unrecognized sort last.
pub fn sorted_findings(result: &AuditResult) -> Vec<&RecordFinding> {
    let mut findings: Vec<&RecordFinding> = result
        .records
        .iter()
        .filter(|f| !f.deviations.is_empty())
        .collect();
    findings.sort_by_key(|f| match worst_severity(f) {
        Some(Severity::Critical) => 0u8,
        Some(Severity::Moderate) => 1,
        Some(Severity::Minor) => 2,
        None => 3,
    });
    findings
}

/// The nine headline metrics in fixed order.
pub fn summary_lines(stats: &SummaryStats) -> Vec<String> {
    vec![
        format!("Data quality score: {}/10", stats.data_quality_score),
        format!("Records audited: {}", stats.total_records),
        format!("Records with deviations: {}", stats.records_with_deviations),
        format!(
            "Records with multiple deviations: {}",
            stats.records_with_multiple_deviations
        ),
        format!("Fully compliant records: {}", stats.records_fully_compliant),
        format!("Compliance rate: {:.1}%", stats.compliance_rate),
        format!("Critical deviations: {}", stats.critical),
        format!("Moderate deviations: {}", stats.moderate),
        format!("Minor deviations: {}", stats.minor),
    ]
}

/// Frequency table lines, most common first, ties broken by name.
pub fn type_frequency_lines(types: &BTreeMap<String, usize>) -> Vec<String> {
    let mut entries: Vec<(&String, &usize)> = types.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .map(|(name, count)| format!("{}: {}", name, count))
        .collect()
}

/// Locate a usable TrueType family, trying common system locations.
fn load_font_family() -> Result<FontFamily<FontData>, ReportError> {
    let candidates: [(&str, &str); 4] = [
        ("/usr/share/fonts/truetype/liberation", "LiberationSans"),
        ("/usr/share/fonts/liberation-sans-fonts", "LiberationSans"),
        ("/System/Library/Fonts", "Helvetica"),
        ("/Library/Fonts", "Arial"),
    ];

    let mut last_error = String::new();
    for (dir, name) in candidates {
        match genpdf::fonts::from_files(dir, name, None) {
            Ok(family) => return Ok(family),
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(ReportError::FontNotFound {
        message: last_error,
    })
}

/// Render the full audit report to PDF bytes.
pub fn render_report(
    result: &AuditResult,
    stats: &SummaryStats,
    original_filename: &str,
    records: &[Record],
) -> Result<Vec<u8>, ReportError> {
    let timestamp = Utc::now()
        .with_timezone(&Zurich)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string();

    let font_family = load_font_family()?;
    let mut doc = Document::new(font_family);
    doc.set_title("Recipe Data Quality Audit Report");

    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(30);
    doc.set_page_decorator(decorator);

    let title_style = Style::new().bold().with_font_size(16);
    let heading_style = Style::new().bold().with_font_size(12);
    let small_style = Style::new().with_font_size(8);

    doc.push(Paragraph::new(StyledString::new(
        "Recipe Data Quality Audit Report".to_string(),
        title_style,
    )));
    doc.push(Break::new(1));

    doc.push(Paragraph::new(latin1_lossy(&format!(
        "Audited file: {}",
        original_filename
    ))));
    doc.push(Paragraph::new(format!("Audit performed: {}", timestamp)));
    doc.push(Paragraph::new(format!(
        "Entries in file: {} (audited: {})",
        stats.total_entries_in_file, stats.total_records
    )));
    doc.push(Break::new(1));

    push_heading(&mut doc, "Executive Summary", heading_style);
    let summary = if result.summary_text.is_empty() {
        "(no summary provided)".to_string()
    } else {
        latin1_lossy(&result.summary_text)
    };
    doc.push(Paragraph::new(summary));
    doc.push(Break::new(1));

    push_heading(&mut doc, "Summary Statistics", heading_style);
    for line in summary_lines(stats) {
        doc.push(Paragraph::new(line));
    }
    doc.push(Break::new(1));

    push_heading(&mut doc, "Most Common Critical Deviations", heading_style);
    push_frequency_list(&mut doc, &stats.critical_types);
    doc.push(Break::new(1));

    push_heading(&mut doc, "Most Common Moderate Deviations", heading_style);
    push_frequency_list(&mut doc, &stats.moderate_types);
    doc.push(Break::new(1));

    doc.push(Paragraph::new(latin1_lossy(ADVISORY_NOTE)));
    doc.push(Break::new(1));

    push_heading(&mut doc, "Detailed Findings", heading_style);
    let findings = sorted_findings(result);
    if findings.is_empty() {
        doc.push(Paragraph::new("No deviations were found."));
    }
    for finding in findings {
        doc.push(Paragraph::new(StyledString::new(
            latin1_lossy(&format!("Record {}", finding.record_id)),
            Style::new().bold(),
        )));
        for deviation in &finding.deviations {
            doc.push(Paragraph::new(latin1_lossy(&format!(
                "- {} [{}]: {}",
                deviation.deviation_type, deviation.severity, deviation.description
            ))));
        }
        doc.push(Break::new(0.5));
    }
    doc.push(Break::new(1));

    push_heading(&mut doc, "Appendix: Analyzed Records", heading_style);
    for line in canonical_json(records).lines() {
        doc.push(Paragraph::new(StyledString::new(
            latin1_lossy(line),
            small_style,
        )));
    }

    let mut buffer = Vec::new();
    doc.render(&mut buffer)
        .map_err(|e| ReportError::Render {
            message: e.to_string(),
        })?;
    Ok(buffer)
}

fn push_heading(doc: &mut Document, text: &str, style: Style) {
    doc.push(Paragraph::new(StyledString::new(text.to_string(), style)));
}

fn push_frequency_list(doc: &mut Document, types: &BTreeMap<String, usize>) {
    let lines = type_frequency_lines(types);
    if lines.is_empty() {
        doc.push(Paragraph::new("None"));
        return;
    }
    for line in lines {
        doc.push(Paragraph::new(latin1_lossy(&line)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Deviation;
    use pretty_assertions::assert_eq;

    fn finding(id: &str, severities: &[&str]) -> RecordFinding {
        RecordFinding {
            record_id: id.to_string(),
            deviations: severities
                .iter()
                .map(|s| Deviation {
                    deviation_type: "X".to_string(),
                    severity: s.to_string(),
                    description: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_latin1_lossy_drops_wide_chars() {
        assert_eq!(latin1_lossy("touché ✅ done"), "touché  done");
        assert_eq!(latin1_lossy("plain ascii"), "plain ascii");
    }

    #[test]
    fn test_report_filename_shape() {
        let name = report_filename("My Batch.json");
        assert!(name.ends_with("_My_Batch_audit_report.pdf"), "{name}");
        assert!(!name.contains(".json"));

        let name = report_filename("rows.csv");
        assert!(name.ends_with("_rows_audit_report.pdf"));
    }

    #[test]
    fn test_worst_severity() {
        assert_eq!(
            worst_severity(&finding("R1", &["Minor", "Critical", "Moderate"])),
            Some(Severity::Critical)
        );
        assert_eq!(
            worst_severity(&finding("R2", &["minor"])),
            Some(Severity::Minor)
        );
        assert_eq!(worst_severity(&finding("R3", &["bogus"])), None);
        assert_eq!(worst_severity(&finding("R4", &[])), None);
    }

    #[test]
    fn test_sorted_findings_worst_first() {
        let result = AuditResult {
            summary_text: String::new(),
            data_quality_score: 5,
            records: vec![
                finding("minor-rec", &["Minor"]),
                finding("clean-rec", &[]),
                finding("critical-rec", &["Moderate", "Critical"]),
                finding("moderate-rec", &["Moderate"]),
                finding("unknown-rec", &["bogus"]),
            ],
        };
        let sorted = sorted_findings(&result);
        let ids: Vec<&str> = sorted.iter().map(|f| f.record_id.as_str()).collect();
        // Clean record excluded; critical first, unrecognized last
        assert_eq!(
            ids,
            vec!["critical-rec", "moderate-rec", "minor-rec", "unknown-rec"]
        );
    }

    #[test]
    fn test_summary_lines_are_nine_in_fixed_order() {
        let stats = SummaryStats {
            data_quality_score: 7,
            total_records: 3,
            total_entries_in_file: 3,
            records_with_deviations: 2,
            records_with_multiple_deviations: 1,
            records_fully_compliant: 1,
            compliance_rate: 33.3,
            critical: 2,
            moderate: 0,
            minor: 1,
            unrecognized: 0,
            critical_types: BTreeMap::new(),
            moderate_types: BTreeMap::new(),
        };
        let lines = summary_lines(&stats);
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "Data quality score: 7/10");
        assert_eq!(lines[5], "Compliance rate: 33.3%");
        assert_eq!(lines[8], "Minor deviations: 1");
    }

    #[test]
    fn test_type_frequency_lines_sorted_by_count() {
        let mut types = BTreeMap::new();
        types.insert("Rare".to_string(), 1);
        types.insert("Common".to_string(), 5);
        types.insert("Also Common".to_string(), 5);
        let lines = type_frequency_lines(&types);
        assert_eq!(lines, vec!["Also Common: 5", "Common: 5", "Rare: 1"]);
    }

    // render_report itself requires TrueType fonts installed on the host,
    // so the layout is exercised through the pure helpers above.
}
