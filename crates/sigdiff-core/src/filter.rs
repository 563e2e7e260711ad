//! Cross-decoder false-positive filtering
//!
//! Two physically similar protocols can both fire on the same signal. A
//! record whose model name appears nowhere in the expected sequence is a
//! cross-decoder false positive: it is kept out of the comparison path and
//! tallied separately so it never scores as a content mismatch.

use std::collections::{BTreeMap, BTreeSet};

use crate::record::Record;

/// One filtered record: the unexpected model and the models that were
/// expected instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FalsePositive {
    pub model: String,
    pub expected_models: BTreeSet<String>,
}

/// Per-model false-positive counts accumulated across a whole run.
#[derive(Debug, Clone, Default)]
pub struct FalsePositiveTally {
    entries: BTreeMap<String, TallyEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct TallyEntry {
    pub count: u64,
    pub expected_models: BTreeSet<String>,
}

impl FalsePositiveTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one false positive: count increments, expected-model set
    /// grows by union. Monotonic.
    pub fn record(&mut self, fp: FalsePositive) {
        let entry = self.entries.entry(fp.model).or_default();
        entry.count += 1;
        entry.expected_models.extend(fp.expected_models);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_for(&self, model: &str) -> u64 {
        self.entries.get(model).map(|e| e.count).unwrap_or(0)
    }

    /// Entries sorted by descending count, ties by model name.
    pub fn by_descending_count(&self) -> Vec<(&str, &TallyEntry)> {
        let mut rows: Vec<(&str, &TallyEntry)> = self
            .entries
            .iter()
            .map(|(model, entry)| (model.as_str(), entry))
            .collect();
        rows.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(b.0)));
        rows
    }
}

/// The set of model names present anywhere in the expected sequence.
/// Records without a model contribute the empty string, matching the
/// reference corpus convention.
pub fn expected_models(expected: &[Record]) -> BTreeSet<String> {
    expected
        .iter()
        .map(|r| r.model().unwrap_or("").to_string())
        .collect()
}

/// Split raw decoder records into the actual sequence and false positives.
///
/// A record is rerouted when it carries a model name absent from the
/// expected-model set. Records without a `model` field, or parsed while
/// the expected sequence is empty, are never filtered.
pub fn filter_false_positives(
    raw: Vec<Record>,
    expected: &[Record],
) -> (Vec<Record>, Vec<FalsePositive>) {
    if expected.is_empty() {
        return (raw, Vec::new());
    }

    let expected_set = expected_models(expected);
    let mut actual = Vec::with_capacity(raw.len());
    let mut false_positives = Vec::new();

    for record in raw {
        match record.model() {
            Some(model) if !expected_set.contains(model) => {
                tracing::debug!("False positive: {} not in expected set", model);
                false_positives.push(FalsePositive {
                    model: model.to_string(),
                    expected_models: expected_set.clone(),
                });
            }
            _ => actual.push(record),
        }
    }

    (actual, false_positives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: serde_json::Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_unexpected_model_is_filtered() {
        let expected = records(json!([{"model":"X"}]));
        let raw = records(json!([{"model":"Y"}]));
        let (actual, fps) = filter_false_positives(raw, &expected);
        assert!(actual.is_empty());
        assert_eq!(fps.len(), 1);
        assert_eq!(fps[0].model, "Y");
        assert!(fps[0].expected_models.contains("X"));
    }

    #[test]
    fn test_expected_model_passes_through() {
        let expected = records(json!([{"model":"X","id":1}]));
        let raw = records(json!([{"model":"X","id":2}]));
        let (actual, fps) = filter_false_positives(raw, &expected);
        assert_eq!(actual.len(), 1);
        assert!(fps.is_empty());
    }

    #[test]
    fn test_record_without_model_is_never_filtered() {
        let expected = records(json!([{"model":"X"}]));
        let raw = records(json!([{"id":7}]));
        let (actual, fps) = filter_false_positives(raw, &expected);
        assert_eq!(actual.len(), 1);
        assert!(fps.is_empty());
    }

    #[test]
    fn test_empty_expected_disables_filtering() {
        let raw = records(json!([{"model":"Y"}]));
        let (actual, fps) = filter_false_positives(raw, &[]);
        assert_eq!(actual.len(), 1);
        assert!(fps.is_empty());
    }

    #[test]
    fn test_tally_accumulates_counts_and_models() {
        let mut tally = FalsePositiveTally::new();
        let set_x: BTreeSet<String> = ["X".to_string()].into();
        let set_z: BTreeSet<String> = ["Z".to_string()].into();
        tally.record(FalsePositive {
            model: "Y".into(),
            expected_models: set_x,
        });
        tally.record(FalsePositive {
            model: "Y".into(),
            expected_models: set_z,
        });
        assert_eq!(tally.count_for("Y"), 2);
        let rows = tally.by_descending_count();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].1.expected_models,
            BTreeSet::from(["X".to_string(), "Z".to_string()])
        );
    }

    #[test]
    fn test_tally_sorts_by_descending_count() {
        let mut tally = FalsePositiveTally::new();
        for _ in 0..3 {
            tally.record(FalsePositive {
                model: "B".into(),
                expected_models: BTreeSet::new(),
            });
        }
        tally.record(FalsePositive {
            model: "A".into(),
            expected_models: BTreeSet::new(),
        });
        let rows = tally.by_descending_count();
        assert_eq!(rows[0].0, "B");
        assert_eq!(rows[1].0, "A");
    }

    #[test]
    fn test_expected_models_uses_empty_string_for_absent_model() {
        let expected = records(json!([{"id":1},{"model":"X"}]));
        let set = expected_models(&expected);
        assert!(set.contains(""));
        assert!(set.contains("X"));
    }
}
