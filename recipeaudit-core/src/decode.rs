//! File decoding: raw uploaded bytes into a list of recipe records.
//!
//! Format is determined from the file extension only. Binary content
//! (embedded null bytes) and non-UTF-8 text are rejected before any
//! parsing, so a bad upload never reaches the network.

use crate::error::DecodeError;
use crate::types::Record;
use tracing::debug;

/// Input file format, detected from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Csv,
    Unknown,
}

impl FileFormat {
    /// Detect the format from a filename. Extension matching only; the
    /// content is never sniffed.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".json") {
            FileFormat::Json
        } else if lower.ends_with(".csv") {
            FileFormat::Csv
        } else {
            FileFormat::Unknown
        }
    }
}

/// Decode raw uploaded bytes into a list of records.
///
/// Rejects binary content (null-byte heuristic), invalid UTF-8, and
/// unknown extensions. Performs no schema validation of record contents.
pub fn decode_records(bytes: &[u8], filename: &str) -> Result<Vec<Record>, DecodeError> {
    if bytes.contains(&0u8) {
        return Err(DecodeError::BinaryContent);
    }

    let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::NotUtf8 {
        message: e.to_string(),
    })?;

    let records = match FileFormat::from_name(filename) {
        FileFormat::Json => decode_json(text)?,
        FileFormat::Csv => decode_csv(text)?,
        FileFormat::Unknown => {
            let extension = filename
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_string())
                .unwrap_or_default();
            return Err(DecodeError::UnsupportedExtension { extension });
        }
    };

    debug!(
        filename = %filename,
        records = records.len(),
        "Decoded uploaded file"
    );
    Ok(records)
}

/// Parse a JSON array of flat objects.
fn decode_json(text: &str) -> Result<Vec<Record>, DecodeError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| DecodeError::MalformedJson {
            message: e.to_string(),
        })?;

    let array = match value {
        serde_json::Value::Array(items) => items,
        other => {
            return Err(DecodeError::NotAnArray {
                message: format!("top-level value is {}", json_type_name(&other)),
            });
        }
    };

    let mut records = Vec::with_capacity(array.len());
    for (index, item) in array.into_iter().enumerate() {
        match item {
            serde_json::Value::Object(map) => records.push(map),
            other => {
                return Err(DecodeError::NotAnArray {
                    message: format!("element {} is {}", index, json_type_name(&other)),
                });
            }
        }
    }
    Ok(records)
}

/// Parse CSV text (header + rows) into records with all-string values.
fn decode_csv(text: &str) -> Result<Vec<Record>, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DecodeError::MalformedCsv {
            message: e.to_string(),
        })?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| DecodeError::MalformedCsv {
            message: e.to_string(),
        })?;
        let mut record = Record::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            record.insert(
                header.to_string(),
                serde_json::Value::String(cell.to_string()),
            );
        }
        records.push(record);
    }
    Ok(records)
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_name("batch.json"), FileFormat::Json);
        assert_eq!(FileFormat::from_name("Batch.JSON"), FileFormat::Json);
        assert_eq!(FileFormat::from_name("rows.csv"), FileFormat::Csv);
        assert_eq!(FileFormat::from_name("notes.txt"), FileFormat::Unknown);
        assert_eq!(FileFormat::from_name("noextension"), FileFormat::Unknown);
    }

    #[test]
    fn test_rejects_null_bytes() {
        let bytes = b"{\"a\": 1}\x00trailer";
        let err = decode_records(bytes, "data.json").unwrap_err();
        assert!(matches!(err, DecodeError::BinaryContent));
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let bytes = [0xff, 0xfe, 0x41];
        let err = decode_records(&bytes, "data.json").unwrap_err();
        assert!(matches!(err, DecodeError::NotUtf8 { .. }));
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let err = decode_records(b"hello", "data.parquet").unwrap_err();
        match err {
            DecodeError::UnsupportedExtension { extension } => assert_eq!(extension, "parquet"),
            other => panic!("Expected UnsupportedExtension, got {:?}", other),
        }
    }

    #[test]
    fn test_json_array_of_objects() {
        let text = br#"[{"id": "R1", "qty": 5}, {"id": "R2", "qty": 7}]"#;
        let records = decode_records(text, "batch.json").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], "R1");
        assert_eq!(records[1]["qty"], 7);
    }

    #[test]
    fn test_json_root_not_array() {
        let err = decode_records(br#"{"id": "R1"}"#, "batch.json").unwrap_err();
        assert!(matches!(err, DecodeError::NotAnArray { .. }));
    }

    #[test]
    fn test_json_scalar_element() {
        let err = decode_records(br#"[{"id": "R1"}, 42]"#, "batch.json").unwrap_err();
        match err {
            DecodeError::NotAnArray { message } => assert!(message.contains("element 1")),
            other => panic!("Expected NotAnArray, got {:?}", other),
        }
    }

    #[test]
    fn test_json_malformed() {
        let err = decode_records(b"[{", "batch.json").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedJson { .. }));
    }

    #[test]
    fn test_csv_rows_to_string_records() {
        let text = b"id,step,qty\nR1,Mix,5\nR2,Heat,7\n";
        let records = decode_records(text, "batch.csv").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], "R1");
        assert_eq!(records[0]["qty"], "5"); // CSV cells stay strings
        assert_eq!(records[1]["step"], "Heat");
    }

    #[test]
    fn test_csv_ragged_row_rejected() {
        let text = b"id,step\nR1,Mix,extra\n";
        let err = decode_records(text, "batch.csv").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedCsv { .. }));
    }

    #[test]
    fn test_empty_json_array_is_ok() {
        // An empty record set decodes fine; the pipeline rejects it later
        // with an explicit "no records" error.
        let records = decode_records(b"[]", "batch.json").unwrap();
        assert!(records.is_empty());
    }
}
