//! sigdiff CLI
//!
//! Command-line interface for the decoder compatibility harness

mod commands;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use sigdiff_core::{Result, init_tracing};
use std::io;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "sigdiff")]
#[command(about = "sigdiff: validate a signal decoder against a reference corpus")]
#[command(version = sigdiff_core::VERSION)]
#[command(
    long_about = "sigdiff replays captured radio-sample files through a decoder executable and\n\
compares its JSON output against reference records from a trusted baseline,\n\
producing a Markdown compatibility report.\n\
\n\
Examples:\n  \
sigdiff run -c ./build/decoder_433          # Run the suite in ./tests\n  \
sigdiff run -c decoder_433 -t corpus -o report.md\n  \
sigdiff run -c decoder_433 -I time -I mic   # Ignore extra volatile fields\n  \
sigdiff list -t corpus                      # Show discovered test cases"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Harness configuration file path
    #[arg(
        long,
        global = true,
        help = "Path to harness configuration file (.sigdiffrc.json/.sigdiffrc.toml)"
    )]
    config: Option<PathBuf>,

    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Generate shell completion script
    #[arg(
        long,
        value_enum,
        help = "Generate completion script for specified shell"
    )]
    generate_completion: Option<Shell>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the test corpus through the decoder and report compatibility
    #[command(alias = "compare")]
    Run {
        /// Path to the decoder executable under test
        #[arg(short = 'c', long = "decoder", help = "Decoder executable to test")]
        decoder: Option<PathBuf>,

        /// Directory with named decoder configuration files
        #[arg(
            short = 'C',
            long,
            help = "Config directory for protocol marker files (default: conf)"
        )]
        config_path: Option<PathBuf>,

        /// Test corpus root directory
        #[arg(short, long, help = "Corpus root with reference files (default: tests)")]
        test_dir: Option<PathBuf>,

        /// Field to ignore during comparison (can be used multiple times)
        #[arg(
            short = 'I',
            long = "ignore-field",
            help = "Field to ignore in addition to the default 'time'"
        )]
        ignore_field: Vec<String>,

        /// Report output file
        #[arg(short, long, help = "Write the Markdown report here (default: stdout)")]
        output: Option<PathBuf>,

        /// Only compare the first output record of each case
        #[arg(long, help = "Smoke-test mode: compare only the first output line")]
        first_line: bool,

        /// Per-case decoder timeout in seconds
        #[arg(long, help = "Per-case decoder timeout in seconds (default: 30)")]
        timeout: Option<u64>,
    },

    /// List discovered test cases without running the decoder
    List {
        /// Test corpus root directory
        #[arg(short, long, help = "Corpus root with reference files (default: tests)")]
        test_dir: Option<PathBuf>,

        /// Directory with named decoder configuration files
        #[arg(
            short = 'C',
            long,
            help = "Config directory for protocol marker files (default: conf)"
        )]
        config_path: Option<PathBuf>,
    },

    /// Show version information
    #[command(alias = "ver")]
    Version {
        /// Show detailed version information
        #[arg(long, help = "Show detailed version and build information")]
        detailed: bool,
    },
}

fn main() -> Result<()> {
    // Sequential harness: cases run one at a time, so a current-thread
    // runtime is enough to drive the bounded subprocess waits.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();

    // Handle shell completion generation
    if let Some(shell) = cli.generate_completion {
        generate_completion_script(shell);
        return Ok(());
    }

    // Initialize colored output
    if !cli.no_color && std::env::var("NO_COLOR").is_err() {
        colored::control::set_override(true);
    } else {
        colored::control::set_override(false);
    }

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "sigdiff=error",
        1 => "sigdiff=warn",
        2 => "sigdiff=info",
        3 => "sigdiff=debug",
        _ => "sigdiff=trace",
    };
    unsafe {
        std::env::set_var("RUST_LOG", log_level);
    }
    init_tracing();

    match run_command(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("sigdiff failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn generate_completion_script(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

async fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Run {
            decoder,
            config_path,
            test_dir,
            ignore_field,
            output,
            first_line,
            timeout,
        }) => {
            commands::run_command(
                decoder,
                config_path,
                test_dir,
                ignore_field,
                output,
                first_line,
                timeout,
                cli.config,
            )
            .await
        }

        Some(Commands::List {
            test_dir,
            config_path,
        }) => commands::list_command(test_dir, config_path, cli.config).await,

        Some(Commands::Version { detailed }) => {
            if detailed {
                println!("sigdiff {}", sigdiff_core::VERSION);
                println!("Build information:");
                println!("  Target: {}", std::env::consts::ARCH);
                println!("  OS: {}", std::env::consts::OS);
            } else {
                println!("{}", sigdiff_core::VERSION);
            }
            Ok(())
        }

        None => {
            // No subcommand provided, show help
            let mut cmd = Cli::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}
