//! Error types and handling for compatibility runs
//!
//! Per-case failures (bad reference JSON, decoder timeouts, launch
//! failures) are case outcomes, not errors; this type covers harness
//! failures that abort the whole run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for compatibility-harness operations
#[derive(Debug, Error)]
pub enum SigdiffError {
    /// Harness configuration loading or validation errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corpus layout errors (missing test root, unwalkable directories)
    #[error("Corpus error: {message}")]
    CorpusError { message: String },

    /// Report rendering or writing errors
    #[error("Report error: {message}")]
    ReportError { message: String },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Io,
    Corpus,
    Report,
}

impl SigdiffError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SigdiffError::ConfigError { .. } => ErrorKind::Config,
            SigdiffError::IoError { .. } => ErrorKind::Io,
            SigdiffError::CorpusError { .. } => ErrorKind::Corpus,
            SigdiffError::ReportError { .. } => ErrorKind::Report,
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Create a corpus error
    pub fn corpus_error(message: impl Into<String>) -> Self {
        Self::CorpusError {
            message: message.into(),
        }
    }

    /// Create a report error
    pub fn report_error(message: impl Into<String>) -> Self {
        Self::ReportError {
            message: message.into(),
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for SigdiffError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            path: PathBuf::new(),
            source: err,
        }
    }
}
