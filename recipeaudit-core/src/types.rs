//! Shared types for the audit pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One uploaded recipe entry: a flat mapping of field name to value.
///
/// No schema is enforced beyond "is an object"; CSV rows decode to
/// all-string values, JSON objects keep their original scalar types.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
        }
    }
}

/// A single role-tagged chat message sent to the LLM backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Deviation severity levels, worst first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Moderate,
    Minor,
}

impl Severity {
    /// Parse a severity string case-insensitively.
    ///
    /// Returns `None` for anything that is not critical/moderate/minor;
    /// callers decide how to treat unrecognized values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "moderate" => Some(Severity::Moderate),
            "minor" => Some(Severity::Minor),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "Critical"),
            Severity::Moderate => write!(f, "Moderate"),
            Severity::Minor => write!(f, "Minor"),
        }
    }
}

/// A detected quality issue on one record.
///
/// The severity is kept as the wire string the model produced; the
/// reconciler overwrites it with the canonical mapped value whenever the
/// deviation type appears in the static override table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deviation {
    #[serde(rename = "type", default)]
    pub deviation_type: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
}

/// The model's findings for a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFinding {
    #[serde(default, deserialize_with = "de_record_id")]
    pub record_id: String,
    #[serde(default)]
    pub deviations: Vec<Deviation>,
}

/// Accept both string and numeric record IDs from the model.
fn de_record_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn default_quality_score() -> i64 {
    5
}

/// The parsed structured verdict returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResult {
    #[serde(default)]
    pub summary_text: String,
    #[serde(default = "default_quality_score")]
    pub data_quality_score: i64,
    #[serde(default)]
    pub records: Vec<RecordFinding>,
}

/// Aggregate statistics recomputed locally from an [`AuditResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub data_quality_score: i64,
    pub total_records: usize,
    pub total_entries_in_file: usize,
    pub records_with_deviations: usize,
    pub records_with_multiple_deviations: usize,
    pub records_fully_compliant: usize,
    /// Percentage of audited records with zero deviations, one decimal.
    pub compliance_rate: f64,
    pub critical: usize,
    pub moderate: usize,
    pub minor: usize,
    /// Deviations whose severity string is not critical/moderate/minor.
    /// These never enter the three severity totals above.
    pub unrecognized: usize,
    pub critical_types: BTreeMap<String, usize>,
    pub moderate_types: BTreeMap<String, usize>,
}

/// Run state of the UI shell: one audit at a time per process.
///
/// Transitions: `Idle -> Running` on trigger, `Running -> Done` on
/// success, `Running -> Idle` on error. A finished run can be retriggered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Done,
}

impl RunState {
    /// Attempt to start a run. Returns `false` if one is already running.
    pub fn trigger(&mut self) -> bool {
        match self {
            RunState::Running => false,
            _ => {
                *self = RunState::Running;
                true
            }
        }
    }

    /// Mark the running audit as completed.
    pub fn complete(&mut self) {
        *self = RunState::Done;
    }

    /// Return to idle after a failed run.
    pub fn fail(&mut self) {
        *self = RunState::Idle;
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running => write!(f, "running"),
            RunState::Done => write!(f, "done"),
        }
    }
}
