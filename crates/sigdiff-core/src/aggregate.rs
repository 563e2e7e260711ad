//! Run-wide outcome aggregation
//!
//! The aggregate is the single owner of all mutable run state: global
//! per-status counters, per-protocol outcome lists, and the false-positive
//! tally. Case results enter exclusively through `fold`, so a future
//! parallel runner only needs to serialize calls to this one value.

use std::collections::BTreeMap;

use crate::compare::Status;
use crate::filter::{FalsePositive, FalsePositiveTally};

/// The scored result of one processed test case. Append-only.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub test_name: String,
    pub status: Status,
    pub detail: String,
}

impl CaseOutcome {
    pub fn new(test_name: impl Into<String>, status: Status, detail: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            status,
            detail: detail.into(),
        }
    }
}

/// Per-protocol counts in report-table buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolSummary {
    pub tests: u64,
    pub pass: u64,
    pub extra: u64,
    /// Mismatch or structural failure
    pub mismatch: u64,
    /// Missing decode or no output
    pub missing: u64,
    /// Error or missing input
    pub error: u64,
}

/// Accumulated state of one whole compatibility run.
#[derive(Debug, Clone, Default)]
pub struct RunAggregate {
    counts: BTreeMap<Status, u64>,
    outcomes: BTreeMap<String, Vec<CaseOutcome>>,
    false_positives: FalsePositiveTally,
}

impl RunAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one case outcome into the aggregate: append to the protocol
    /// group's list and bump exactly one global counter.
    pub fn fold(&mut self, protocol_group: &str, outcome: CaseOutcome) {
        *self.counts.entry(outcome.status).or_insert(0) += 1;
        self.outcomes
            .entry(protocol_group.to_string())
            .or_default()
            .push(outcome);
    }

    /// Fold one false positive into the run tally.
    pub fn record_false_positive(&mut self, fp: FalsePositive) {
        self.false_positives.record(fp);
    }

    /// Global count for one status.
    pub fn count(&self, status: Status) -> u64 {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Total processed cases. Equals the sum over all status buckets.
    pub fn total_cases(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Exact passes plus extra decodes, which are functionally correct.
    pub fn effective_pass(&self) -> u64 {
        self.count(Status::Pass) + self.count(Status::Extra)
    }

    /// Content-confirmed disagreements; this sum drives the process exit
    /// code.
    pub fn failure_count(&self) -> u64 {
        Status::ALL
            .iter()
            .filter(|s| s.is_content_failure())
            .map(|s| self.count(*s))
            .sum()
    }

    /// Outcomes grouped by protocol, iterated in sorted group order.
    pub fn outcomes(&self) -> &BTreeMap<String, Vec<CaseOutcome>> {
        &self.outcomes
    }

    /// Number of distinct protocol groups seen.
    pub fn protocol_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Per-protocol counts in report-table buckets.
    pub fn protocol_summary(&self, protocol_group: &str) -> ProtocolSummary {
        let mut summary = ProtocolSummary::default();
        let Some(outcomes) = self.outcomes.get(protocol_group) else {
            return summary;
        };
        summary.tests = outcomes.len() as u64;
        for outcome in outcomes {
            match outcome.status {
                Status::Pass => summary.pass += 1,
                Status::Extra => summary.extra += 1,
                Status::Mismatch | Status::Fail => summary.mismatch += 1,
                Status::MissingDecode | Status::NoOutput => summary.missing += 1,
                Status::Error | Status::MissingInput => summary.error += 1,
            }
        }
        summary
    }

    pub fn false_positives(&self) -> &FalsePositiveTally {
        &self.false_positives
    }
}
