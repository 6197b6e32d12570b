use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("could not read bundled prompt `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
}

/// Source of the system prompt shipped with the deployment.
pub trait PromptSource: Send + Sync {
    fn read_bundled_prompt(&self) -> Result<String, PromptError>;
}

#[derive(Clone, Debug)]
pub struct FilePromptSource {
    path: PathBuf,
}

impl FilePromptSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PromptSource for FilePromptSource {
    fn read_bundled_prompt(&self) -> Result<String, PromptError> {
        fs::read_to_string(&self.path)
            .map_err(|source| PromptError::Read { path: self.path.clone(), source })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{FilePromptSource, PromptError, PromptSource};

    #[test]
    fn reads_prompt_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("system_prompt.txt");
        fs::write(&path, "You are a careful editor.").expect("write prompt");

        let prompt = FilePromptSource::new(&path).read_bundled_prompt().expect("prompt readable");
        assert_eq!(prompt, "You are a careful editor.");
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("absent.txt");

        let error = FilePromptSource::new(&path).read_bundled_prompt().expect_err("file missing");
        assert!(matches!(error, PromptError::Read { ref path, .. } if path.ends_with("absent.txt")));
    }
}
