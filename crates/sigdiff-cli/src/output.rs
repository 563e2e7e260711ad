//! Console output and progress reporting

use std::time::{Duration, Instant};

use colored::*;
use sigdiff_core::{RunAggregate, Status};

/// Prints a progress line every `INTERVAL` completed cases so long runs
/// show signs of life without flooding the console.
pub struct ProgressReporter {
    total: usize,
    start: Instant,
}

const INTERVAL: usize = 100;

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            start: Instant::now(),
        }
    }

    pub fn tick(&self, completed: usize) {
        if completed % INTERVAL != 0 {
            return;
        }
        eprintln!(
            "  [{}/{}] {:.0}s elapsed...",
            completed,
            self.total,
            self.start.elapsed().as_secs_f64()
        );
    }
}

/// Final console summary, mirroring the report's totals.
pub fn print_run_summary(aggregate: &RunAggregate, elapsed: Duration) {
    let total = aggregate.total_cases();
    let effective = aggregate.effective_pass();

    println!(
        "\n=== RESULTS: {} exact pass, {} extra decode, {} mismatch, {} missing decode, {} other fail, {} no output, {} errors ({}) ===",
        aggregate.count(Status::Pass).to_string().green(),
        aggregate.count(Status::Extra),
        aggregate.count(Status::Mismatch).to_string().red(),
        aggregate.count(Status::MissingDecode),
        aggregate.count(Status::Fail),
        aggregate.count(Status::NoOutput),
        aggregate.count(Status::Error),
        utils::format_duration(elapsed)
    );

    let rate = if total > 0 {
        100.0 * effective as f64 / total as f64
    } else {
        0.0
    };
    println!("=== Effective pass rate: {rate:.1}% ===");
}

/// Utility functions for output formatting
pub mod utils {
    /// Format duration in human-readable format
    pub fn format_duration(duration: std::time::Duration) -> String {
        let total_ms = duration.as_millis();

        if total_ms < 1000 {
            format!("{total_ms}ms")
        } else if total_ms < 60_000 {
            format!("{:.1}s", total_ms as f64 / 1000.0)
        } else {
            let minutes = total_ms / 60_000;
            let seconds = (total_ms % 60_000) as f64 / 1000.0;
            format!("{minutes}m {seconds:.1}s")
        }
    }
}
