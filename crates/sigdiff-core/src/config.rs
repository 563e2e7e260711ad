//! Harness configuration discovery and loading
//!
//! Run settings can live in a config file next to the corpus so CI and
//! developers share one setup. CLI flags always override file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, SigdiffError};

/// Default field ignored during comparison (volatile timestamp).
pub const DEFAULT_IGNORE_FIELD: &str = "time";

/// Persistent run settings. Every field is optional so a file only needs
/// to state what it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Path to the decoder executable under test
    pub decoder: Option<PathBuf>,
    /// Directory holding named decoder configuration files
    pub config_dir: Option<PathBuf>,
    /// Corpus root with the reference files
    pub test_dir: Option<PathBuf>,
    /// Fields stripped from both sequences before comparison
    pub ignore_fields: Option<Vec<String>>,
    /// Per-case decoder timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Compare only the first output record per case
    pub first_line: Option<bool>,
    /// Report output path (stdout when unset)
    pub output: Option<PathBuf>,
}

/// Configuration loader for discovering and loading config files
pub struct ConfigLoader;

/// Config file names tried in priority order.
const CONFIG_FILENAMES: [&str; 4] = [
    ".sigdiffrc.json",
    ".sigdiffrc.toml",
    "sigdiff.toml",
    "sigdiff.json",
];

impl ConfigLoader {
    /// Auto-discover a config file by traversing upward from `start_path`
    /// until one is found or the filesystem root is reached.
    pub fn auto_discover(start_path: &Path) -> Result<Option<PathBuf>> {
        let mut current = start_path
            .canonicalize()
            .map_err(|e| SigdiffError::config_error(format!("Invalid path: {e}")))?;

        loop {
            for filename in &CONFIG_FILENAMES {
                let config_path = current.join(filename);
                if config_path.is_file() {
                    tracing::debug!("Found config: {}", config_path.display());
                    return Ok(Some(config_path));
                }
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Load configuration from a specific file. The extension selects the
    /// format: `.toml` is TOML, anything else is JSON.
    pub fn load_from_file(path: &Path) -> Result<HarnessConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| SigdiffError::io_error(path, e))?;

        if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|e| {
                SigdiffError::config_error(format!(
                    "Failed to parse '{}': {}",
                    path.display(),
                    e
                ))
            })
        } else {
            serde_json::from_str(&content).map_err(|e| {
                SigdiffError::config_error(format!(
                    "Failed to parse '{}': {}",
                    path.display(),
                    e
                ))
            })
        }
    }

    /// Load config from an explicit path or auto-discover from `start_dir`.
    /// Falls back to defaults when nothing is found.
    pub fn load(custom_path: Option<&Path>, start_dir: Option<&Path>) -> Result<HarnessConfig> {
        if let Some(path) = custom_path {
            if !path.exists() {
                return Err(SigdiffError::config_error(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_from_file(path);
        }

        let search_dir = start_dir.unwrap_or_else(|| Path::new("."));
        match Self::auto_discover(search_dir)? {
            Some(discovered) => Self::load_from_file(&discovered),
            None => Ok(HarnessConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sigdiffrc.json");
        fs::write(
            &path,
            r#"{"decoder":"/usr/bin/decoder_433","ignore_fields":["time","mic"],"timeout_secs":10}"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.decoder, Some(PathBuf::from("/usr/bin/decoder_433")));
        assert_eq!(
            config.ignore_fields,
            Some(vec!["time".to_string(), "mic".to_string()])
        );
        assert_eq!(config.timeout_secs, Some(10));
        assert_eq!(config.first_line, None);
    }

    #[test]
    fn test_load_toml_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sigdiff.toml");
        fs::write(&path, "test_dir = \"corpus\"\nfirst_line = true\n").unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.test_dir, Some(PathBuf::from("corpus")));
        assert_eq!(config.first_line, Some(true));
    }

    #[test]
    fn test_auto_discover_walks_upward() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("sigdiff.toml"), "timeout_secs = 5\n").unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let found = ConfigLoader::auto_discover(&nested).unwrap().unwrap();
        assert!(found.ends_with("sigdiff.toml"));
    }

    #[test]
    fn test_load_defaults_when_nothing_found() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::load(None, Some(dir.path())).unwrap();
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        assert!(ConfigLoader::load(Some(Path::new("/no/such/file.json")), None).is_err());
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sigdiffrc.json");
        fs::write(&path, "{not json").unwrap();
        assert!(ConfigLoader::load_from_file(&path).is_err());
    }
}
