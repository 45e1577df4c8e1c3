//! Input classification.
//!
//! Buckets input files by declared kind. Missing or unreadable files and
//! files of unknown kind are skipped with a diagnostic, never an error.
//! Relative input order is preserved within each bucket.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::report::{Diagnostic, DiagnosticCode, ResolutionReport};
use crate::source::DefinitionSource;

const SNIFFED_EXTENSION: &str = "json";

/// Declared kind of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Standalone schema document, resolved across documents.
    Schema,
    /// Self-contained protocol document.
    Protocol,
    /// Recognized but not consumed (IDL sources need compiling first).
    Unsupported,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema => write!(f, "schema"),
            Self::Protocol => write!(f, "protocol"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Inputs bucketed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub schemas: Vec<DefinitionSource>,
    pub protocols: Vec<DefinitionSource>,
    pub unsupported: Vec<DefinitionSource>,
}

impl Classification {
    /// Returns the bucket for `kind`.
    pub fn bucket(&self, kind: SourceKind) -> &[DefinitionSource] {
        match kind {
            SourceKind::Schema => &self.schemas,
            SourceKind::Protocol => &self.protocols,
            SourceKind::Unsupported => &self.unsupported,
        }
    }

    /// Total number of classified sources.
    pub fn len(&self) -> usize {
        self.schemas.len() + self.protocols.len() + self.unsupported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, kind: SourceKind, source: DefinitionSource) {
        match kind {
            SourceKind::Schema => self.schemas.push(source),
            SourceKind::Protocol => self.protocols.push(source),
            SourceKind::Unsupported => self.unsupported.push(source),
        }
    }
}

/// Determines the kind of `source` from its extension, sniffing the content
/// of `.json` files when enabled.
///
/// # Examples
///
/// ```
/// use avro_resolve::{DefinitionSource, ResolverConfig, SourceKind, kind_of};
///
/// let config = ResolverConfig::default();
/// let proto = DefinitionSource::new("mail.json", r#"{"protocol": "Mail"}"#);
/// let schema = DefinitionSource::new("person.json", r#"{"type": "record"}"#);
///
/// assert_eq!(kind_of(&proto, &config), Some(SourceKind::Protocol));
/// assert_eq!(kind_of(&schema, &config), Some(SourceKind::Schema));
/// assert_eq!(kind_of(&DefinitionSource::new("notes.txt", ""), &config), None);
/// ```
pub fn kind_of(source: &DefinitionSource, config: &ResolverConfig) -> Option<SourceKind> {
    let extension = source.extension()?;
    if let Some(kind) = config.extensions.kind_of(&extension) {
        return Some(kind);
    }
    if config.sniff_json && extension == SNIFFED_EXTENSION {
        let is_protocol = serde_json::from_str::<Value>(source.content())
            .ok()
            .and_then(|value| value.as_object().map(|obj| obj.contains_key("protocol")))
            .unwrap_or(false);
        return Some(if is_protocol {
            SourceKind::Protocol
        } else {
            SourceKind::Schema
        });
    }
    None
}

/// Reads and classifies files from disk.
pub fn classify(
    paths: &[PathBuf],
    config: &ResolverConfig,
    report: &mut ResolutionReport,
) -> Classification {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        match DefinitionSource::read(path) {
            Ok(source) => sources.push(source),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable input");
                report.push(Diagnostic::new(DiagnosticCode::Unreadable, path, e.to_string()));
            }
        }
    }
    classify_sources(sources, config, report)
}

/// Classifies in-memory sources.
pub fn classify_sources(
    sources: impl IntoIterator<Item = DefinitionSource>,
    config: &ResolverConfig,
    report: &mut ResolutionReport,
) -> Classification {
    let mut classification = Classification::default();

    for source in sources {
        match kind_of(&source, config) {
            Some(SourceKind::Unsupported) => {
                warn!(
                    path = %source.path().display(),
                    "Unsupported IDL source; compile it to a schema or protocol first"
                );
                report.push(Diagnostic::new(
                    DiagnosticCode::UnsupportedKind,
                    source.path(),
                    "IDL sources must be compiled before resolution",
                ));
                classification.push(SourceKind::Unsupported, source);
            }
            Some(kind) => classification.push(kind, source),
            None => {
                warn!(path = %source.path().display(), "Skipping input of unknown kind");
                report.push(Diagnostic::new(
                    DiagnosticCode::UnknownKind,
                    source.path(),
                    "unrecognized file extension",
                ));
            }
        }
    }

    info!(
        schemas = classification.schemas.len(),
        protocols = classification.protocols.len(),
        unsupported = classification.unsupported.len(),
        "Classified inputs"
    );
    classification
}

/// Expands directories to their immediate file entries in sorted order.
///
/// Other inputs are kept as given, including missing paths, which the
/// classifier later skips with a diagnostic.
///
/// # Errors
///
/// Returns [`ResolveError::EmptyInput`] if `inputs` is empty, or an I/O
/// error if a directory cannot be listed.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if inputs.is_empty() {
        return Err(ResolveError::EmptyInput);
    }

    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries = Vec::new();
            for entry in fs::read_dir(input)? {
                let path = entry?.path();
                if path.is_file() {
                    entries.push(path);
                }
            }
            entries.sort();
            paths.extend(entries);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(path: &str, content: &str) -> DefinitionSource {
        DefinitionSource::new(path, content)
    }

    #[test]
    fn test_extension_buckets_preserve_order() {
        let mut report = ResolutionReport::new();
        let classification = classify_sources(
            vec![
                source("b.avsc", "\"int\""),
                source("mail.avpr", "{}"),
                source("a.avsc", "\"long\""),
                source("Service.avdl", "protocol Service {}"),
                source("README.md", "# docs"),
            ],
            &ResolverConfig::default(),
            &mut report,
        );

        let schema_paths: Vec<_> = classification.schemas.iter().map(|s| s.path()).collect();
        assert_eq!(schema_paths, vec![PathBuf::from("b.avsc"), PathBuf::from("a.avsc")]);
        assert_eq!(classification.protocols.len(), 1);
        assert_eq!(classification.bucket(SourceKind::Unsupported).len(), 1);
        assert_eq!(classification.len(), 4);

        assert_eq!(report.count(DiagnosticCode::UnsupportedKind), 1);
        assert_eq!(report.count(DiagnosticCode::UnknownKind), 1);
    }

    #[test]
    fn test_json_sniffing_can_be_disabled() {
        let mut config = ResolverConfig::default();
        config.sniff_json = false;
        assert_eq!(kind_of(&source("x.json", r#"{"protocol": "P"}"#), &config), None);
    }

    #[test]
    fn test_invalid_json_is_sniffed_as_schema() {
        let config = ResolverConfig::default();
        assert_eq!(kind_of(&source("x.json", "{nope"), &config), Some(SourceKind::Schema));
    }

    #[test]
    fn test_file_without_extension_is_unknown() {
        assert_eq!(kind_of(&source("Makefile", ""), &ResolverConfig::default()), None);
    }

    #[test]
    fn test_missing_file_is_skipped_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("Gender.avsc");
        fs::write(&present, r#"{"type": "enum", "name": "Gender", "symbols": ["F"]}"#).unwrap();

        let mut report = ResolutionReport::new();
        let classification = classify(
            &[dir.path().join("missing.avsc"), present],
            &ResolverConfig::default(),
            &mut report,
        );

        assert_eq!(classification.schemas.len(), 1);
        assert_eq!(report.count(DiagnosticCode::Unreadable), 1);
    }

    #[test]
    fn test_expand_inputs_sorts_directory_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.avsc"), "\"int\"").unwrap();
        fs::write(dir.path().join("a.avsc"), "\"int\"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let explicit = PathBuf::from("z.avsc");
        let paths = expand_inputs(&[explicit.clone(), dir.path().to_path_buf()]).unwrap();
        assert_eq!(
            paths,
            vec![explicit, dir.path().join("a.avsc"), dir.path().join("b.avsc")]
        );
    }

    #[test]
    fn test_expand_inputs_rejects_empty_input() {
        assert!(matches!(expand_inputs(&[]), Err(ResolveError::EmptyInput)));
    }
}
