//! Prompt construction for the audit request.
//!
//! The record slice is serialized with recursively sorted keys so repeated
//! runs over identical input produce byte-identical prompts regardless of
//! the key order the decoder happened to preserve.

use crate::types::{Message, Record};
use tracing::warn;

/// Default system instruction, editable in the UI.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a meticulous manufacturing quality auditor. \
You review batch recipe execution records for data integrity deviations and respond with \
structured JSON only, never prose.";

/// Default user instruction, editable in the UI.
pub const DEFAULT_USER_PROMPT: &str = "Audit the following manufacturing recipe records for data \
quality deviations (missing required steps, out-of-range or negative quantities, conflicting \
status codes, timestamp sequence errors, formatting problems, and similar issues). Respond with \
a single JSON object with exactly these fields: \"summary_text\" (a short executive summary), \
\"data_quality_score\" (integer 1-10), and \"records\" (array of objects, one per audited record, \
each with \"record_id\" and \"deviations\": an array of {\"type\", \"severity\", \"description\"} \
where severity is one of Critical, Moderate, or Minor). Include every audited record, with an \
empty deviations array when the record is compliant.";

/// How many entries of the decoded file to audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryLimit {
    /// Audit at most this many entries.
    Count(usize),
    /// Audit the whole file.
    Full,
}

impl EntryLimit {
    /// Resolve the limit against the actual record count.
    pub fn resolve(&self, total: usize) -> usize {
        match self {
            EntryLimit::Count(n) => (*n).min(total),
            EntryLimit::Full => total,
        }
    }
}

/// Take the slice of records that will be sent to the model.
///
/// Applies the user-chosen entry limit first, then the configured hard cap.
/// Exceeding the cap truncates to the first `max_entries` records in their
/// original order and logs a warning; it is never an error.
pub fn slice_records<'a>(
    records: &'a [Record],
    limit: EntryLimit,
    max_entries: usize,
) -> &'a [Record] {
    let requested = limit.resolve(records.len());
    if requested > max_entries {
        warn!(
            requested,
            max_entries, "Truncated to first {max_entries} entries to stay within context limits"
        );
        &records[..max_entries]
    } else {
        &records[..requested]
    }
}

/// Serialize records as pretty JSON with recursively sorted object keys.
///
/// `serde_json`'s map ordering depends on feature flags elsewhere in the
/// dependency graph, so the sort is applied explicitly.
pub fn canonical_json(records: &[Record]) -> String {
    let sorted: Vec<serde_json::Value> = records
        .iter()
        .map(|r| sort_keys(&serde_json::Value::Object(r.clone())))
        .collect();
    // Serializing a Value cannot fail.
    serde_json::to_string_pretty(&sorted).unwrap_or_default()
}

fn sort_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sort_keys).collect())
        }
        other => other.clone(),
    }
}

/// Build the two role-tagged messages for the chat completion request.
pub fn build_messages(records: &[Record], system_prompt: &str, user_prompt: &str) -> Vec<Message> {
    let full_prompt = format!(
        "{}\n\nRecipe data:\n{}",
        user_prompt,
        canonical_json(records)
    );
    vec![Message::system(system_prompt), Message::user(full_prompt)]
}

/// Estimate the run cost in USD from a token count and model name.
///
/// Static per-1K-token input prices; shown to the user before large runs,
/// never enforced.
pub fn estimate_cost(num_tokens: usize, model: &str) -> f64 {
    let price_per_1k = if model.starts_with("gpt-3.5") {
        0.001
    } else if model.starts_with("gpt-4o") {
        0.005
    } else {
        0.01
    };
    let cost = (num_tokens as f64 / 1000.0) * price_per_1k;
    (cost * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use pretty_assertions::assert_eq;

    fn record(pairs: &[(&str, &str)]) -> Record {
        let mut map = Record::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), serde_json::Value::String(v.to_string()));
        }
        map
    }

    #[test]
    fn test_entry_limit_resolve() {
        assert_eq!(EntryLimit::Count(10).resolve(3), 3);
        assert_eq!(EntryLimit::Count(2).resolve(3), 2);
        assert_eq!(EntryLimit::Full.resolve(3), 3);
    }

    #[test]
    fn test_slice_truncates_to_cap_in_order() {
        let records: Vec<Record> = (0..10)
            .map(|i| record(&[("id", &format!("R{i}"))]))
            .collect();
        let slice = slice_records(&records, EntryLimit::Full, 4);
        assert_eq!(slice.len(), 4);
        assert_eq!(slice[0]["id"], "R0");
        assert_eq!(slice[3]["id"], "R3");
    }

    #[test]
    fn test_slice_under_cap_untouched() {
        let records: Vec<Record> = (0..3).map(|i| record(&[("id", &format!("R{i}"))])).collect();
        let slice = slice_records(&records, EntryLimit::Count(2), 64);
        assert_eq!(slice.len(), 2);
    }

    #[test]
    fn test_canonical_json_is_key_order_independent() {
        let mut a = Record::new();
        a.insert("zeta".into(), serde_json::json!(1));
        a.insert("alpha".into(), serde_json::json!(2));

        let mut b = Record::new();
        b.insert("alpha".into(), serde_json::json!(2));
        b.insert("zeta".into(), serde_json::json!(1));

        assert_eq!(canonical_json(&[a]), canonical_json(&[b]));
    }

    #[test]
    fn test_canonical_json_is_deterministic() {
        let records = vec![record(&[("b", "2"), ("a", "1")])];
        assert_eq!(canonical_json(&records), canonical_json(&records));
        assert!(canonical_json(&records).find("\"a\"") < canonical_json(&records).find("\"b\""));
    }

    #[test]
    fn test_canonical_json_sorts_nested_objects() {
        let mut inner = serde_json::Map::new();
        inner.insert("y".into(), serde_json::json!(1));
        inner.insert("x".into(), serde_json::json!(2));
        let mut rec = Record::new();
        rec.insert("nested".into(), serde_json::Value::Object(inner));

        let out = canonical_json(&[rec]);
        assert!(out.find("\"x\"").unwrap() < out.find("\"y\"").unwrap());
    }

    #[test]
    fn test_build_messages_shape() {
        let records = vec![record(&[("id", "R1")])];
        let messages = build_messages(&records, "sys", "audit these");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "sys");
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.starts_with("audit these\n\nRecipe data:\n"));
        assert!(messages[1].content.contains("\"R1\""));
    }

    #[test]
    fn test_estimate_cost_tiers() {
        assert_eq!(estimate_cost(1000, "gpt-3.5-turbo"), 0.001);
        assert_eq!(estimate_cost(1000, "gpt-4o"), 0.005);
        assert_eq!(estimate_cost(2000, "some-other-model"), 0.02);
    }
}
