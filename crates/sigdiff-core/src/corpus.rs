//! Reference corpus discovery and test-case resolution
//!
//! The corpus is a directory tree of reference files, one JSON record per
//! line, grouped by protocol: the top-level directory name under the test
//! root identifies the protocol group. Each reference file is paired with
//! a captured sample file of the same stem, and sibling marker files tune
//! how the case runs.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{Result, SigdiffError};

/// Candidate sample extensions, tried in this fixed order.
pub const INPUT_EXTENSIONS: [&str; 4] = ["cu8", "ook", "cs16", "cf32"];

/// Marker file that skips every case in its directory.
pub const IGNORE_MARKER: &str = "ignore";

/// Marker file whose first line selects a decoder config or protocol.
pub const PROTOCOL_MARKER: &str = "protocol";

/// How the decoder is selected for one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderSelection {
    /// All decoders enabled (no selection flag)
    Default,
    /// Literal protocol token passed through to the decoder
    Protocol(String),
    /// Named configuration file resolved against the config directory
    ConfigFile(PathBuf),
}

/// One reference-file/input-sample pairing, resolved once at discovery.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Reference file with the expected record sequence
    pub reference: PathBuf,
    /// Paired sample file, when one exists
    pub input: Option<PathBuf>,
    /// Directory-derived grouping identifier
    pub protocol_group: String,
    /// Reference file stem
    pub test_name: String,
    /// Sibling `ignore` marker present
    pub ignored: bool,
    /// Decoder selection from the sibling `protocol` marker
    pub selection: DecoderSelection,
}

/// Discovers test cases under a corpus root.
#[derive(Debug, Clone)]
pub struct CorpusDiscovery {
    test_dir: PathBuf,
    config_dir: PathBuf,
}

impl CorpusDiscovery {
    pub fn new(test_dir: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            test_dir: test_dir.into(),
            config_dir: config_dir.into(),
        }
    }

    /// Find all reference JSON files under the test root, sorted by path
    /// so reruns process cases in a stable order.
    pub fn find_reference_files(&self) -> Result<Vec<PathBuf>> {
        if !self.test_dir.is_dir() {
            return Err(SigdiffError::corpus_error(format!(
                "Test directory not found: {}",
                self.test_dir.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.test_dir) {
            let entry = entry.map_err(|e| {
                SigdiffError::corpus_error(format!(
                    "Failed to walk {}: {}",
                    self.test_dir.display(),
                    e
                ))
            })?;
            let path = entry.path();
            if entry.file_type().is_file()
                && path.extension().is_some_and(|ext| ext == "json")
            {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        tracing::debug!(
            "Found {} reference files under {}",
            files.len(),
            self.test_dir.display()
        );
        Ok(files)
    }

    /// Resolve every discovered reference file into a test case.
    pub fn discover(&self) -> Result<Vec<TestCase>> {
        self.find_reference_files()?
            .iter()
            .map(|path| self.resolve_case(path))
            .collect()
    }

    /// Resolve one reference file into an immutable test case value.
    pub fn resolve_case(&self, reference: &Path) -> Result<TestCase> {
        let input = INPUT_EXTENSIONS
            .iter()
            .map(|ext| reference.with_extension(ext))
            .find(|candidate| candidate.is_file());

        let dir = reference.parent().unwrap_or(Path::new(""));
        let ignored = dir.join(IGNORE_MARKER).is_file();
        let selection = self.resolve_selection(dir)?;

        let (protocol_group, test_name) = self.derive_identifiers(reference);

        Ok(TestCase {
            reference: reference.to_path_buf(),
            input,
            protocol_group,
            test_name,
            ignored,
            selection,
        })
    }

    /// Protocol group is the first path component under the test root when
    /// the reference is nested, `unknown` otherwise; the test name is the
    /// file stem.
    fn derive_identifiers(&self, reference: &Path) -> (String, String) {
        let rel = reference.strip_prefix(&self.test_dir).unwrap_or(reference);
        let components: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let protocol_group = if components.len() > 1 {
            components[0].clone()
        } else {
            "unknown".to_string()
        };
        let test_name = reference
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        (protocol_group, test_name)
    }

    /// Read the sibling `protocol` marker: its first line names a config
    /// file under the config directory (which takes priority) or a literal
    /// protocol token.
    fn resolve_selection(&self, dir: &Path) -> Result<DecoderSelection> {
        let marker = dir.join(PROTOCOL_MARKER);
        if !marker.is_file() {
            return Ok(DecoderSelection::Default);
        }

        let content =
            fs::read_to_string(&marker).map_err(|e| SigdiffError::io_error(&marker, e))?;
        let token = content.lines().next().unwrap_or("").trim();
        if token.is_empty() {
            return Ok(DecoderSelection::Default);
        }

        let config_file = self.config_dir.join(token);
        if config_file.is_file() {
            Ok(DecoderSelection::ConfigFile(config_file))
        } else {
            Ok(DecoderSelection::Protocol(token.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    fn corpus() -> (TempDir, CorpusDiscovery) {
        let dir = TempDir::new().unwrap();
        let discovery = CorpusDiscovery::new(dir.path().join("tests"), dir.path().join("conf"));
        fs::create_dir_all(dir.path().join("tests")).unwrap();
        fs::create_dir_all(dir.path().join("conf")).unwrap();
        (dir, discovery)
    }

    #[test]
    fn test_find_reference_files_sorted_recursive() {
        let (dir, discovery) = corpus();
        let root = dir.path().join("tests");
        fs::create_dir_all(root.join("proto_b")).unwrap();
        fs::create_dir_all(root.join("proto_a/nested")).unwrap();
        touch(&root.join("proto_b/one.json"));
        touch(&root.join("proto_a/nested/two.json"));
        touch(&root.join("proto_a/nested/two.cu8"));

        let files = discovery.find_reference_files().unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("proto_a/nested/two.json"));
        assert!(files[1].ends_with("proto_b/one.json"));
    }

    #[test]
    fn test_missing_test_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let discovery = CorpusDiscovery::new(dir.path().join("nope"), dir.path());
        assert!(discovery.find_reference_files().is_err());
    }

    #[test]
    fn test_input_resolution_order() {
        let (dir, discovery) = corpus();
        let root = dir.path().join("tests");
        fs::create_dir_all(root.join("p")).unwrap();
        let reference = root.join("p/sample.json");
        touch(&reference);
        touch(&root.join("p/sample.ook"));
        touch(&root.join("p/sample.cu8"));

        let case = discovery.resolve_case(&reference).unwrap();
        // .cu8 comes before .ook in the candidate order.
        assert!(case.input.unwrap().ends_with("sample.cu8"));
    }

    #[test]
    fn test_no_input_file() {
        let (dir, discovery) = corpus();
        let root = dir.path().join("tests");
        fs::create_dir_all(root.join("p")).unwrap();
        let reference = root.join("p/sample.json");
        touch(&reference);

        let case = discovery.resolve_case(&reference).unwrap();
        assert!(case.input.is_none());
    }

    #[test]
    fn test_protocol_group_and_test_name() {
        let (dir, discovery) = corpus();
        let root = dir.path().join("tests");
        fs::create_dir_all(root.join("acurite/sub")).unwrap();
        let nested = root.join("acurite/sub/tx1.json");
        touch(&nested);
        let case = discovery.resolve_case(&nested).unwrap();
        assert_eq!(case.protocol_group, "acurite");
        assert_eq!(case.test_name, "tx1");

        let flat = root.join("lonely.json");
        touch(&flat);
        let case = discovery.resolve_case(&flat).unwrap();
        assert_eq!(case.protocol_group, "unknown");
    }

    #[test]
    fn test_ignore_marker() {
        let (dir, discovery) = corpus();
        let root = dir.path().join("tests");
        fs::create_dir_all(root.join("p")).unwrap();
        let reference = root.join("p/sample.json");
        touch(&reference);
        touch(&root.join("p/ignore"));

        let case = discovery.resolve_case(&reference).unwrap();
        assert!(case.ignored);
    }

    #[test]
    fn test_protocol_marker_literal_token() {
        let (dir, discovery) = corpus();
        let root = dir.path().join("tests");
        fs::create_dir_all(root.join("p")).unwrap();
        let reference = root.join("p/sample.json");
        touch(&reference);
        fs::write(root.join("p/protocol"), "40\nsecond line ignored\n").unwrap();

        let case = discovery.resolve_case(&reference).unwrap();
        assert_eq!(case.selection, DecoderSelection::Protocol("40".to_string()));
    }

    #[test]
    fn test_protocol_marker_config_file_takes_priority() {
        let (dir, discovery) = corpus();
        let root = dir.path().join("tests");
        fs::create_dir_all(root.join("p")).unwrap();
        let reference = root.join("p/sample.json");
        touch(&reference);
        fs::write(root.join("p/protocol"), "special.conf\n").unwrap();
        touch(&dir.path().join("conf/special.conf"));

        let case = discovery.resolve_case(&reference).unwrap();
        match case.selection {
            DecoderSelection::ConfigFile(path) => assert!(path.ends_with("special.conf")),
            other => panic!("expected config selection, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_protocol_marker_is_default() {
        let (dir, discovery) = corpus();
        let root = dir.path().join("tests");
        fs::create_dir_all(root.join("p")).unwrap();
        let reference = root.join("p/sample.json");
        touch(&reference);
        fs::write(root.join("p/protocol"), "\n").unwrap();

        let case = discovery.resolve_case(&reference).unwrap();
        assert_eq!(case.selection, DecoderSelection::Default);
    }
}
