//! Compatibility report rendering
//!
//! Pure function from a completed run aggregate to a Markdown document.
//! Table contents (counts, percentages, detail strings) are exact and
//! reproducible; the narrative sections are fixed prose.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::aggregate::RunAggregate;
use crate::compare::Status;

/// Run metadata carried into the report header and narrative sections.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub date: String,
    pub executable: String,
    pub suite_label: String,
    pub suite_size: usize,
    pub duration: Duration,
    pub ignored_fields: Vec<String>,
    pub timeout_secs: u64,
}

impl ReportMeta {
    /// Stamp a metadata block with today's date.
    pub fn new(
        executable: impl Into<String>,
        suite_label: impl Into<String>,
        suite_size: usize,
        duration: Duration,
        ignored_fields: Vec<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            executable: executable.into(),
            suite_label: suite_label.into(),
            suite_size,
            duration,
            ignored_fields,
            timeout_secs,
        }
    }
}

fn status_label(status: Status) -> &'static str {
    match status {
        Status::Pass => "PASS (exact)",
        Status::Extra => "PASS (extra decode)",
        Status::MissingDecode => "FAIL (missing decode)",
        Status::Mismatch => "FAIL (value mismatch)",
        Status::Fail => "FAIL (other)",
        Status::NoOutput => "No output",
        Status::Error => "Error",
        Status::MissingInput => "Missing input",
    }
}

fn status_description(status: Status) -> &'static str {
    match status {
        Status::Pass => "Output matches reference exactly",
        Status::Extra => "Correct data + extra duplicate decode(s)",
        Status::MissingDecode => "Fewer decodes than expected",
        Status::Mismatch => "Field values differ from reference",
        Status::Fail => "Structural mismatch",
        Status::NoOutput => "No matching decoder output",
        Status::Error => "Timeout or launch failure",
        Status::MissingInput => "No input sample for reference",
    }
}

fn percent(count: u64, total: u64) -> String {
    if total > 0 {
        format!("{:.1}", 100.0 * count as f64 / total as f64)
    } else {
        "0".to_string()
    }
}

/// Render the full Markdown compatibility report.
pub fn render(aggregate: &RunAggregate, meta: &ReportMeta) -> String {
    let mut lines: Vec<String> = Vec::new();
    let total = aggregate.total_cases();
    let effective = aggregate.effective_pass();

    // Header
    lines.push("# Protocol Compatibility Test Report".to_string());
    lines.push(String::new());
    lines.push(format!("**Date**: {}", meta.date));
    lines.push(format!("**Executable**: `{}`", meta.executable));
    lines.push(format!(
        "**Test suite**: {} ({} reference files)",
        meta.suite_label, meta.suite_size
    ));
    lines.push(format!("**Duration**: {:.1}s", meta.duration.as_secs_f64()));
    let ignored: BTreeSet<&str> = meta.ignored_fields.iter().map(String::as_str).collect();
    lines.push(format!(
        "**Ignored fields**: {}",
        ignored.into_iter().collect::<Vec<_>>().join(", ")
    ));
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());

    // Summary table
    lines.push("## Summary".to_string());
    lines.push(String::new());
    lines.push("| Result | Count | % | Description |".to_string());
    lines.push("|--------|-------|---|-------------|".to_string());
    for status in Status::ALL {
        let count = aggregate.count(status);
        if count == 0 {
            continue;
        }
        lines.push(format!(
            "| {} | {} | {}% | {} |",
            status_label(status),
            count,
            percent(count, total),
            status_description(status)
        ));
    }
    lines.push(format!("| **Total** | **{total}** | **100%** | |"));
    lines.push(String::new());
    lines.push(format!(
        "**Effective pass rate: {}%** ({}/{} - exact + extra decode)",
        percent(effective, total),
        effective,
        total
    ));
    lines.push(String::new());

    // Per-protocol table
    lines.push("## Protocol Results".to_string());
    lines.push(String::new());
    lines.push("| Protocol | Tests | Pass | Extra | Mismatch | Missing | Error |".to_string());
    lines.push("|----------|-------|------|-------|----------|---------|-------|".to_string());
    for protocol in aggregate.outcomes().keys() {
        let s = aggregate.protocol_summary(protocol);
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} | {} |",
            protocol, s.tests, s.pass, s.extra, s.mismatch, s.missing, s.error
        ));
    }
    lines.push(String::new());

    render_extra_decodes(aggregate, &mut lines);
    render_detailed_failures(aggregate, &mut lines);
    render_no_output(aggregate, &mut lines);
    render_false_positives(aggregate, &mut lines);
    render_methodology(meta, &mut lines);
    render_conclusion(aggregate, meta, &mut lines);

    lines.push("---".to_string());
    lines.push(String::new());
    lines.push("*Generated by `sigdiff run`*".to_string());
    lines.push(String::new());

    lines.join("\n")
}

fn render_extra_decodes(aggregate: &RunAggregate, lines: &mut Vec<String>) {
    let mut sections = Vec::new();
    for (protocol, outcomes) in aggregate.outcomes() {
        let extras: Vec<String> = outcomes
            .iter()
            .filter(|o| o.status == Status::Extra)
            .map(|o| format!("{} ({})", o.test_name, o.detail))
            .collect();
        if !extras.is_empty() {
            sections.push(format!("- **{}**: {}", protocol, extras.join(", ")));
        }
    }
    if sections.is_empty() {
        return;
    }

    lines.push("## Extra Decodes (Duplicate Sensitivity)".to_string());
    lines.push(String::new());
    lines.push("These tests produced correct data but with additional duplicate".to_string());
    lines.push("decode(s). This is a minor sensitivity difference: the tested".to_string());
    lines.push("executable decoded both repetitions of a signal where the reference".to_string());
    lines.push("deduplicated to one.".to_string());
    lines.push(String::new());
    lines.append(&mut sections);
    lines.push(String::new());
}

fn render_detailed_failures(aggregate: &RunAggregate, lines: &mut Vec<String>) {
    let has_failures = aggregate
        .outcomes()
        .values()
        .flatten()
        .any(|o| o.status.is_content_failure());
    if !has_failures {
        return;
    }

    lines.push("## Detailed Failures".to_string());
    lines.push(String::new());
    for (protocol, outcomes) in aggregate.outcomes() {
        if !outcomes.iter().any(|o| o.status.is_content_failure()) {
            continue;
        }
        lines.push(format!("### {protocol}"));
        lines.push(String::new());
        for outcome in outcomes {
            let tag = match outcome.status {
                Status::Mismatch => "MISMATCH",
                Status::Fail => "FAIL",
                Status::MissingDecode => "MISSING",
                _ => continue,
            };
            lines.push(format!(
                "- **{}** [{}]: {}",
                outcome.test_name, tag, outcome.detail
            ));
        }
        lines.push(String::new());
    }
}

fn render_no_output(aggregate: &RunAggregate, lines: &mut Vec<String>) {
    let mut sections = Vec::new();
    for (protocol, outcomes) in aggregate.outcomes() {
        let names: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.status == Status::NoOutput)
            .map(|o| o.test_name.as_str())
            .collect();
        if !names.is_empty() {
            sections.push(format!("- **{}**: {}", protocol, names.join(", ")));
        }
    }
    if sections.is_empty() {
        return;
    }

    lines.push("## Tests With No Output".to_string());
    lines.push(String::new());
    lines.append(&mut sections);
    lines.push(String::new());
}

fn render_false_positives(aggregate: &RunAggregate, lines: &mut Vec<String>) {
    let tally = aggregate.false_positives();
    if tally.is_empty() {
        return;
    }

    lines.push("## False Positives (Cross-Decoder Matches)".to_string());
    lines.push(String::new());
    lines.push("These are outputs from a different decoder than expected. They are".to_string());
    lines.push("inherent to the protocol similarity between certain devices and exist".to_string());
    lines.push("in the reference implementation as well.".to_string());
    lines.push(String::new());
    lines.push("| Model (false match) | Count | Expected models |".to_string());
    lines.push("|---------------------|-------|-----------------|".to_string());
    for (model, entry) in tally.by_descending_count() {
        let expected: Vec<&str> = entry.expected_models.iter().map(String::as_str).collect();
        lines.push(format!(
            "| {} | {} | {} |",
            model,
            entry.count,
            expected.join(", ")
        ));
    }
    lines.push(String::new());
}

fn render_methodology(meta: &ReportMeta, lines: &mut Vec<String>) {
    lines.push("## Methodology".to_string());
    lines.push(String::new());
    lines.push("Each test file was processed as follows:".to_string());
    lines.push(String::new());
    lines.push("1. For each `.json` reference file in the test suite, find matching input".to_string());
    lines.push("   (`.cu8`, `.ook`, `.cs16`, or `.cf32`)".to_string());
    lines.push(format!(
        "2. Run `{} -c 0 -F json -r <input_file>` with {}-second timeout",
        meta.executable, meta.timeout_secs
    ));
    lines.push("3. Parse JSON output, filtering false positives (wrong model name)".to_string());
    lines.push("4. Compare against reference JSON, ignoring configured fields".to_string());
    lines.push("5. Classify result: exact match, extra decode, mismatch, missing decode,".to_string());
    lines.push("   no output, or error".to_string());
    lines.push(String::new());
}

fn render_conclusion(aggregate: &RunAggregate, meta: &ReportMeta, lines: &mut Vec<String>) {
    let total = aggregate.total_cases();
    let effective = aggregate.effective_pass();

    lines.push("## Conclusion".to_string());
    lines.push(String::new());
    lines.push(format!(
        "`{}` achieves **{}% compatibility** with the reference test suite across {} tests covering {} protocol families.",
        meta.executable,
        percent(effective, total),
        total,
        aggregate.protocol_count()
    ));
    lines.push(String::new());
    lines.push(format!(
        "- **{} errors** or timeouts",
        aggregate.count(Status::Error)
    ));
    lines.push(format!(
        "- **{} exact matches** ({}%)",
        aggregate.count(Status::Pass),
        percent(aggregate.count(Status::Pass), total)
    ));
    if aggregate.count(Status::Extra) > 0 {
        lines.push(format!(
            "- **{} extra decodes** (correct data, duplicate sensitivity difference)",
            aggregate.count(Status::Extra)
        ));
    }
    if aggregate.count(Status::Mismatch) > 0 {
        lines.push(format!(
            "- **{} value mismatch(es)** (field differences vs reference)",
            aggregate.count(Status::Mismatch)
        ));
    }
    if aggregate.count(Status::MissingDecode) > 0 {
        lines.push(format!(
            "- **{} missing decode(s)**",
            aggregate.count(Status::MissingDecode)
        ));
    }
    lines.push(String::new());
}
