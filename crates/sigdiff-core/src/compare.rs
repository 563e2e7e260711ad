//! Sequence comparison and outcome classification
//!
//! Decides whether the record sequence emitted by the decoder under test
//! matches the reference sequence. Matching is fuzzy in exactly two ways:
//! the actual sequence may be a strict multiset superset (duplicate
//! repeated signal decoded twice) or a strict multiset subset of the
//! expected records. Anything else is a mismatch or a structural failure.

use std::collections::BTreeSet;
use std::fmt;

use crate::record::Record;

/// Classification assigned to one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Output matches the reference exactly
    Pass,
    /// Correct data plus extra duplicate decode(s)
    Extra,
    /// Fewer decodes than expected, present ones correct
    MissingDecode,
    /// Field values differ from the reference
    Mismatch,
    /// Structural mismatch not classifiable as extra/missing
    Fail,
    /// No usable decoder output where output was expected
    NoOutput,
    /// Reference unparsable, decoder timeout, or launch failure
    Error,
    /// No input sample file paired with the reference
    MissingInput,
}

impl Status {
    /// All classifications, in summary-table order.
    pub const ALL: [Status; 8] = [
        Status::Pass,
        Status::Extra,
        Status::MissingDecode,
        Status::Mismatch,
        Status::Fail,
        Status::NoOutput,
        Status::Error,
        Status::MissingInput,
    ];

    /// Stable identifier used in tallies and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Extra => "extra",
            Status::MissingDecode => "missing_decode",
            Status::Mismatch => "mismatch",
            Status::Fail => "fail",
            Status::NoOutput => "no_output",
            Status::Error => "error",
            Status::MissingInput => "missing_input",
        }
    }

    /// Content-confirmed disagreement: contributes to the process exit code.
    pub fn is_content_failure(&self) -> bool {
        matches!(
            self,
            Status::Mismatch | Status::Fail | Status::MissingDecode
        )
    }

    /// Functionally correct: exact pass or extra duplicate decodes.
    pub fn is_effective_pass(&self) -> bool {
        matches!(self, Status::Pass | Status::Extra)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many differing line details to keep before truncating.
const MAX_DIFF_LINES: usize = 3;

/// Compare an expected and an actual record sequence.
///
/// Both sequences must already be normalized. Returns the classification
/// and a human-readable detail string (empty on pass).
pub fn compare(expected: &[Record], actual: &[Record]) -> (Status, String) {
    if expected == actual {
        return (Status::Pass, String::new());
    }

    if expected.len() != actual.len() {
        if actual.len() > expected.len() && multiset_contains(actual, expected) {
            let n_extra = actual.len() - expected.len();
            return (
                Status::Extra,
                format!(
                    "+{} extra decode(s) (expected {}, got {})",
                    n_extra,
                    expected.len(),
                    actual.len()
                ),
            );
        }

        if actual.len() < expected.len() && multiset_contains(expected, actual) {
            let n_missing = expected.len() - actual.len();
            return (
                Status::MissingDecode,
                format!(
                    "-{} missing decode(s) (expected {}, got {})",
                    n_missing,
                    expected.len(),
                    actual.len()
                ),
            );
        }

        return (
            Status::Fail,
            format!(
                "Line count: expected {}, got {}",
                expected.len(),
                actual.len()
            ),
        );
    }

    // Same line count: walk pairwise and collect field-level differences.
    let mut diffs = Vec::new();
    for (i, (exp, act)) in expected.iter().zip(actual.iter()).enumerate() {
        if exp == act {
            continue;
        }
        diffs.push(format!("Line {}: {}", i + 1, field_diff(exp, act)));
    }

    if diffs.is_empty() {
        // Unreachable given the exact-equality check above, but the
        // classification must stay total.
        return (Status::Pass, String::new());
    }

    diffs.truncate(MAX_DIFF_LINES);
    (Status::Mismatch, diffs.join("; "))
}

/// Whether every element of `smaller` matches a distinct element of
/// `larger` by exact equality. Greedy first-fit; match order does not
/// affect the yes/no result because matching is by value equality.
fn multiset_contains(larger: &[Record], smaller: &[Record]) -> bool {
    let mut unmatched: Vec<&Record> = smaller.iter().collect();
    for candidate in larger {
        if let Some(pos) = unmatched.iter().position(|r| *r == candidate) {
            unmatched.remove(pos);
        }
    }
    unmatched.is_empty()
}

/// Per-field difference summary over the sorted union of field names.
fn field_diff(expected: &Record, actual: &Record) -> String {
    let keys: BTreeSet<&str> = expected.field_names().chain(actual.field_names()).collect();
    let mut parts = Vec::new();
    for key in keys {
        match (expected.get(key), actual.get(key)) {
            (None, Some(value)) => parts.push(format!("+{key}={value}")),
            (Some(value), None) => parts.push(format!("-{key}={value}")),
            (Some(old), Some(new)) if old != new => {
                parts.push(format!("{key}: {old} -> {new}"));
            }
            _ => {}
        }
    }
    parts.join("; ")
}
