//! External decoder invocation
//!
//! Runs the executable under test over one captured sample file in JSON
//! output mode and captures its stdout, stderr, and exit status. The wait
//! is bounded by a per-case timeout; an expired case kills the subprocess
//! rather than hanging the run.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::corpus::DecoderSelection;

/// Contract sentinel exit code for a timed-out decoder.
pub const EXIT_TIMEOUT: i32 = -1;

/// Contract sentinel exit code for a decoder that failed to launch.
pub const EXIT_LAUNCH_FAILED: i32 = -2;

/// Default bound on one decoder invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How one decoder invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderStatus {
    /// Process ran to completion with this exit code
    Exited(i32),
    /// Process exceeded the timeout and was killed
    TimedOut,
    /// Process could not be spawned
    LaunchFailed(String),
}

/// Captured output of one decoder invocation.
#[derive(Debug, Clone)]
pub struct DecoderRun {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: DecoderStatus,
}

impl DecoderRun {
    /// Exit code with the interface sentinels: −1 timeout, −2 launch failure.
    pub fn exit_code(&self) -> i32 {
        match &self.status {
            DecoderStatus::Exited(code) => *code,
            DecoderStatus::TimedOut => EXIT_TIMEOUT,
            DecoderStatus::LaunchFailed(_) => EXIT_LAUNCH_FAILED,
        }
    }

    /// Decoder stdout as text, lossily decoded.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Decoder stderr as text, lossily decoded.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// The executable under test plus its per-invocation timeout.
#[derive(Debug, Clone)]
pub struct Decoder {
    command: PathBuf,
    timeout: Duration,
}

impl Decoder {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Argument vector for one invocation: JSON output mode, the sample
    /// path, and the optional protocol/config selection.
    fn build_args(input: &Path, selection: &DecoderSelection) -> Vec<String> {
        let mut args = vec!["-c".to_string(), "0".to_string()];
        match selection {
            DecoderSelection::Default => {}
            DecoderSelection::Protocol(token) => {
                args.push("-R".to_string());
                args.push(token.clone());
            }
            DecoderSelection::ConfigFile(path) => {
                args.push("-c".to_string());
                args.push(path.display().to_string());
            }
        }
        args.push("-F".to_string());
        args.push("json".to_string());
        args.push("-r".to_string());
        args.push(input.display().to_string());
        args
    }

    /// Run the decoder over one sample file.
    ///
    /// Never returns an error: timeouts and launch failures are part of
    /// the run's status so the caller can classify the case and move on.
    pub async fn run(&self, input: &Path, selection: &DecoderSelection) -> DecoderRun {
        let args = Self::build_args(input, selection);
        tracing::debug!("Running {} {}", self.command.display(), args.join(" "));

        let child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(err) => {
                return DecoderRun {
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                    status: DecoderStatus::LaunchFailed(err.to_string()),
                };
            }
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => DecoderRun {
                stdout: output.stdout,
                stderr: output.stderr,
                status: DecoderStatus::Exited(output.status.code().unwrap_or(-1)),
            },
            Ok(Err(err)) => DecoderRun {
                stdout: Vec::new(),
                stderr: Vec::new(),
                status: DecoderStatus::LaunchFailed(err.to_string()),
            },
            // Dropping the future drops the child; kill_on_drop reaps it.
            Err(_) => DecoderRun {
                stdout: Vec::new(),
                stderr: Vec::new(),
                status: DecoderStatus::TimedOut,
            },
        }
    }
}
