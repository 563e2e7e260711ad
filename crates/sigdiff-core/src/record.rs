//! Decoded-record data model and normalization
//!
//! A record is one structured decode event: an ordered JSON object keyed by
//! field name. Records come from two sources — reference corpus files and
//! decoder stdout — both as newline-delimited JSON. Reference files must
//! parse completely; decoder output lines that fail to parse are dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Conventional field identifying which decoder produced a record.
pub const MODEL_FIELD: &str = "model";

/// One decoded record: an ordered field-name to JSON-value mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record (used as the first-line-mode placeholder).
    pub fn empty() -> Self {
        Self { fields: Map::new() }
    }

    /// Parse a single JSON line into a record.
    ///
    /// Only JSON objects qualify; arrays and scalars are rejected by the
    /// transparent map representation.
    pub fn parse_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// The decoder model name, when present as a string field.
    pub fn model(&self) -> Option<&str> {
        self.fields.get(MODEL_FIELD).and_then(Value::as_str)
    }

    /// Whether the record carries a `model` field at all.
    pub fn has_model(&self) -> bool {
        self.fields.contains_key(MODEL_FIELD)
    }

    /// Look up a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Remove a field if present. Absence is not an error.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Iterate over field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Remove every ignored field from every record in the sequence.
///
/// Length and order are preserved; records missing an ignored field are
/// left untouched. Idempotent.
pub fn strip_fields(records: &mut [Record], fields: &[String]) {
    for record in records.iter_mut() {
        for field in fields {
            record.remove(field);
        }
    }
}

/// Parse a reference file body: one JSON record per line, blank lines
/// skipped. Any unparsable line fails the whole sequence.
pub fn parse_ndjson(text: &str) -> serde_json::Result<Vec<Record>> {
    let mut records = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        records.push(Record::parse_line(line)?);
    }
    Ok(records)
}

/// Parse decoder stdout: one JSON record per line, blank lines skipped,
/// malformed lines silently dropped.
pub fn parse_ndjson_lossy(text: &str) -> Vec<Record> {
    let mut records = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match Record::parse_line(line) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::debug!("Dropping malformed output line: {}", err);
            }
        }
    }
    records
}
