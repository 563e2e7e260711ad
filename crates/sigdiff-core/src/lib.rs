//! sigdiff core
//!
//! Comparison engine for validating a signal-decoding executable against a
//! reference corpus: replay captured sample files through the decoder,
//! compare the emitted records against trusted reference records under
//! fuzzy matching rules, and aggregate the results into a compatibility
//! report.

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod corpus;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod record;
pub mod report;
pub mod result;
pub mod runner;

// Re-export commonly used types
pub use aggregate::{CaseOutcome, ProtocolSummary, RunAggregate};
pub use compare::{Status, compare};
pub use config::{ConfigLoader, DEFAULT_IGNORE_FIELD, HarnessConfig};
pub use corpus::{
    CorpusDiscovery, DecoderSelection, IGNORE_MARKER, INPUT_EXTENSIONS, PROTOCOL_MARKER, TestCase,
};
pub use decoder::{
    DEFAULT_TIMEOUT, Decoder, DecoderRun, DecoderStatus, EXIT_LAUNCH_FAILED, EXIT_TIMEOUT,
};
pub use error::{ErrorKind, SigdiffError};
pub use filter::{FalsePositive, FalsePositiveTally, expected_models, filter_false_positives};
pub use record::{MODEL_FIELD, Record, parse_ndjson, parse_ndjson_lossy, strip_fields};
pub use report::{ReportMeta, render};
pub use result::Result;
pub use runner::{CaseReport, CaseRunner};

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sigdiff=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
