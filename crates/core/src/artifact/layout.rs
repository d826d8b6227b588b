//! Paths belonging to a single pipeline run.

use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name of the staged document inside a run directory.
pub const STAGED_FILE_NAME: &str = "document";

/// Extension of the converted artifact.
pub const CONVERTED_EXTENSION: &str = "json";

const PARTIAL_SUFFIX: &str = ".partial";

/// Generates a fresh run id.
pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// All file-system locations a run reads or writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunArtifacts {
    pub run_id: String,
    pub run_dir: PathBuf,
    /// Staged input document.
    pub staged: PathBuf,
    /// Scheduler output, the staged path plus the raw output suffix.
    pub raw_output: PathBuf,
    /// Converter output.
    pub converted: PathBuf,
}

impl RunArtifacts {
    pub fn new(buffer_dir: &Path, run_id: &str, raw_output_suffix: &str) -> Self {
        let run_dir = buffer_dir.join(run_id);
        let staged = run_dir.join(STAGED_FILE_NAME);
        let raw_output = with_suffix(&staged, raw_output_suffix);
        let converted = staged.with_extension(CONVERTED_EXTENSION);

        Self {
            run_id: run_id.to_string(),
            run_dir,
            staged,
            raw_output,
            converted,
        }
    }

    /// Temporary location the stager writes to before the final rename.
    pub fn partial_path(&self) -> PathBuf {
        with_suffix(&self.staged, PARTIAL_SUFFIX)
    }

    /// Removes the run directory and everything in it.
    pub async fn remove(&self) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(&self.run_dir).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_layout_paths() {
        let artifacts = RunArtifacts::new(Path::new("/buf"), "run-1", ".xml");
        assert_eq!(artifacts.run_dir, PathBuf::from("/buf/run-1"));
        assert_eq!(artifacts.staged, PathBuf::from("/buf/run-1/document"));
        assert_eq!(artifacts.raw_output, PathBuf::from("/buf/run-1/document.xml"));
        assert_eq!(artifacts.converted, PathBuf::from("/buf/run-1/document.json"));
        assert_eq!(
            artifacts.partial_path(),
            PathBuf::from("/buf/run-1/document.partial")
        );
    }

    #[test]
    fn test_distinct_runs_share_no_paths() {
        let buffer = Path::new("/buf");
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let artifacts = RunArtifacts::new(buffer, &new_run_id(), ".xml");
            assert!(seen.insert(artifacts.staged.clone()));
            assert!(seen.insert(artifacts.raw_output.clone()));
            assert!(seen.insert(artifacts.converted.clone()));
        }
    }

    #[tokio::test]
    async fn test_remove_missing_dir_is_ok() {
        let temp = tempfile::tempdir().unwrap();
        let artifacts = RunArtifacts::new(temp.path(), "never-created", ".xml");
        assert!(artifacts.remove().await.is_ok());
    }
}
