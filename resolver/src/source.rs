//! Input documents.

use std::fs;
use std::path::{Path, PathBuf};

/// One readable input document: where it came from and what it says.
///
/// Sources are immutable once created. Two sources are equal when both the
/// path and the content match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefinitionSource {
    path: PathBuf,
    content: String,
}

impl DefinitionSource {
    /// Creates an in-memory source. `path` is only used for classification
    /// and diagnostics.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Reads a source from disk.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file is missing or cannot be
    /// read as UTF-8 text.
    pub fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Ok(Self::new(path, content))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Lower-cased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DefinitionSource::read(dir.path().join("absent.avsc")).is_err());
    }

    #[test]
    fn test_read_keeps_path_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Gender.AVSC");
        fs::write(&path, r#""string""#).unwrap();

        let source = DefinitionSource::read(&path).unwrap();
        assert_eq!(source.path(), path.as_path());
        assert_eq!(source.content(), r#""string""#);
        assert_eq!(source.extension().as_deref(), Some("avsc"));
    }

    #[test]
    fn test_equality_covers_path_and_content() {
        let a = DefinitionSource::new("a.avsc", "\"int\"");
        assert_eq!(a, DefinitionSource::new("a.avsc", "\"int\""));
        assert_ne!(a, DefinitionSource::new("b.avsc", "\"int\""));
        assert_ne!(a, DefinitionSource::new("a.avsc", "\"long\""));
    }
}
