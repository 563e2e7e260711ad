//! CLI command implementations

use std::path::PathBuf;
use std::time::{Duration, Instant};

use colored::*;
use sigdiff_core::{
    CaseRunner, ConfigLoader, CorpusDiscovery, DEFAULT_IGNORE_FIELD, DEFAULT_TIMEOUT, Decoder,
    DecoderSelection, HarnessConfig, ReportMeta, Result, RunAggregate, SigdiffError, render,
};
use tracing::debug;

use crate::output::{ProgressReporter, print_run_summary};

/// Built-in directory defaults, used when neither the CLI nor the config
/// file says otherwise.
const DEFAULT_TEST_DIR: &str = "tests";
const DEFAULT_CONFIG_DIR: &str = "conf";

/// Fully resolved run settings after merging CLI flags over the config file.
struct RunSettings {
    decoder: PathBuf,
    config_dir: PathBuf,
    test_dir: PathBuf,
    ignore_fields: Vec<String>,
    output: Option<PathBuf>,
    first_line: bool,
    timeout: Duration,
}

#[allow(clippy::too_many_arguments)]
fn resolve_settings(
    decoder: Option<PathBuf>,
    config_path: Option<PathBuf>,
    test_dir: Option<PathBuf>,
    ignore_field: Vec<String>,
    output: Option<PathBuf>,
    first_line: bool,
    timeout: Option<u64>,
    config: HarnessConfig,
) -> Result<RunSettings> {
    let decoder = decoder.or(config.decoder).ok_or_else(|| {
        SigdiffError::config_error(
            "No decoder executable specified (use --decoder or set 'decoder' in the config file)",
        )
    })?;

    // The default ignored field stays active; -I only adds to it.
    let mut ignore_fields = config
        .ignore_fields
        .unwrap_or_else(|| vec![DEFAULT_IGNORE_FIELD.to_string()]);
    ignore_fields.extend(ignore_field);

    Ok(RunSettings {
        decoder,
        config_dir: config_path
            .or(config.config_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
        test_dir: test_dir
            .or(config.test_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEST_DIR)),
        ignore_fields,
        output: output.or(config.output),
        first_line: first_line || config.first_line.unwrap_or(false),
        timeout: timeout
            .or(config.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT),
    })
}

/// Run command implementation
#[allow(clippy::too_many_arguments)]
pub async fn run_command(
    decoder: Option<PathBuf>,
    config_path: Option<PathBuf>,
    test_dir: Option<PathBuf>,
    ignore_field: Vec<String>,
    output: Option<PathBuf>,
    first_line: bool,
    timeout: Option<u64>,
    harness_config: Option<PathBuf>,
) -> Result<()> {
    let config = ConfigLoader::load(harness_config.as_deref(), None)?;
    let settings = resolve_settings(
        decoder,
        config_path,
        test_dir,
        ignore_field,
        output,
        first_line,
        timeout,
        config,
    )?;
    debug!(
        "Testing {} against corpus {}",
        settings.decoder.display(),
        settings.test_dir.display()
    );

    let discovery = CorpusDiscovery::new(&settings.test_dir, &settings.config_dir);
    let cases = discovery.discover()?;
    println!(
        "Found {} reference JSON files in {}",
        cases.len(),
        settings.test_dir.display()
    );

    let runner = CaseRunner::new(
        Decoder::new(&settings.decoder).with_timeout(settings.timeout),
        settings.ignore_fields.clone(),
    )
    .with_first_line(settings.first_line);

    let start_time = Instant::now();
    let mut aggregate = RunAggregate::new();
    let progress = ProgressReporter::new(cases.len());

    // One case at a time, in sorted path order, so reruns are reproducible.
    for (idx, case) in cases.iter().enumerate() {
        if let Some(report) = runner.run_case(case).await {
            aggregate.fold(&case.protocol_group, report.outcome);
            for fp in report.false_positives {
                aggregate.record_false_positive(fp);
            }
        }
        progress.tick(idx + 1);
    }

    let elapsed = start_time.elapsed();
    let executable = settings
        .decoder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| settings.decoder.display().to_string());
    let meta = ReportMeta::new(
        executable,
        settings.test_dir.display().to_string(),
        cases.len(),
        elapsed,
        settings.ignore_fields.clone(),
        settings.timeout.as_secs(),
    );
    let report = render(&aggregate, &meta);

    match &settings.output {
        Some(path) => {
            std::fs::write(path, &report).map_err(|e| {
                SigdiffError::report_error(format!("Failed to write '{}': {}", path.display(), e))
            })?;
            println!("\nReport written to {}", path.display());
        }
        None => println!("{report}"),
    }

    print_run_summary(&aggregate, elapsed);

    let failures = aggregate.failure_count();
    if failures > 0 {
        // Exit with the content-failure count; capped because a raw exit
        // byte wraps modulo 256 and could alias back to 0.
        std::process::exit(failures.min(101) as i32);
    }
    Ok(())
}

/// List command implementation
pub async fn list_command(
    test_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
    harness_config: Option<PathBuf>,
) -> Result<()> {
    let config = ConfigLoader::load(harness_config.as_deref(), None)?;
    let test_dir = test_dir
        .or(config.test_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEST_DIR));
    let config_dir = config_path
        .or(config.config_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));

    let discovery = CorpusDiscovery::new(&test_dir, &config_dir);
    let cases = discovery.discover()?;

    let mut with_input = 0usize;
    for case in &cases {
        let mut markers = Vec::new();
        match &case.input {
            Some(input) => {
                with_input += 1;
                if let Some(ext) = input.extension() {
                    markers.push(format!("input: .{}", ext.to_string_lossy()));
                }
            }
            None => markers.push("no input".red().to_string()),
        }
        if case.ignored {
            markers.push("ignored".yellow().to_string());
        }
        match &case.selection {
            DecoderSelection::Default => {}
            DecoderSelection::Protocol(token) => markers.push(format!("protocol: {token}")),
            DecoderSelection::ConfigFile(path) => {
                markers.push(format!("config: {}", path.display()));
            }
        }
        println!(
            "{}/{} ({})",
            case.protocol_group.bold(),
            case.test_name,
            markers.join(", ")
        );
    }

    println!(
        "\n{} test cases, {} with input samples",
        cases.len(),
        with_input
    );
    Ok(())
}
