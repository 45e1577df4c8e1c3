//! Resolver configuration.
//!
//! Controls how input files are classified and how long the type resolver
//! may keep retrying. Every field has a default, so an empty YAML document
//! is a valid configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! extensions:
//!   schema: [avsc]
//!   protocol: [avpr]
//!   unsupported: [avdl]
//! sniff_json: true
//! max_passes: 50
//! deny_unresolved: false
//! validate_defaults: true
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classify::SourceKind;
use crate::error::Result;

/// File extensions (without the leading dot) mapped to each source kind.
///
/// Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Standalone schema documents.
    pub schema: Vec<String>,
    /// Self-contained protocol documents.
    pub protocol: Vec<String>,
    /// Recognized kinds that need a separate compilation step (IDL).
    pub unsupported: Vec<String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            schema: vec!["avsc".to_string()],
            protocol: vec!["avpr".to_string()],
            unsupported: vec!["avdl".to_string()],
        }
    }
}

impl ExtensionConfig {
    /// Returns the kind registered for `extension`, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use avro_resolve::{ExtensionConfig, SourceKind};
    ///
    /// let extensions = ExtensionConfig::default();
    /// assert_eq!(extensions.kind_of("AVPR"), Some(SourceKind::Protocol));
    /// assert_eq!(extensions.kind_of("txt"), None);
    /// ```
    pub fn kind_of(&self, extension: &str) -> Option<SourceKind> {
        let matches = |list: &[String]| list.iter().any(|e| e.eq_ignore_ascii_case(extension));
        if matches(&self.schema) {
            Some(SourceKind::Schema)
        } else if matches(&self.protocol) {
            Some(SourceKind::Protocol)
        } else if matches(&self.unsupported) {
            Some(SourceKind::Unsupported)
        } else {
            None
        }
    }
}

/// Top-level resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Configuration format version.
    pub version: String,
    /// Extension to kind mapping.
    pub extensions: ExtensionConfig,
    /// Classify `.json` files by content: a top-level object with a
    /// `protocol` key is a protocol, anything else a schema.
    pub sniff_json: bool,
    /// Upper bound on resolver passes. `None` uses the input count plus one,
    /// which a well-behaved parser can never exceed.
    pub max_passes: Option<usize>,
    /// Treat a partial resolution as a failure (used by the CLI).
    pub deny_unresolved: bool,
    /// Check field defaults against their declared types.
    pub validate_defaults: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            extensions: ExtensionConfig::default(),
            sniff_json: true,
            max_passes: None,
            deny_unresolved: false,
            validate_defaults: true,
        }
    }
}

impl ResolverConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ResolveError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::ResolveError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ResolveError::Io) if the file cannot be
    /// written, or [`Yaml`](crate::ResolveError::Yaml) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
version: "1.0"
extensions:
  schema: [avsc, schema]
  protocol: [avpr]
  unsupported: []
sniff_json: false
max_passes: 10
deny_unresolved: true
validate_defaults: false
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: ResolverConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.extensions.schema, vec!["avsc", "schema"]);
        assert!(config.extensions.unsupported.is_empty());
        assert!(!config.sniff_json);
        assert_eq!(config.max_passes, Some(10));
        assert!(config.deny_unresolved);
        assert!(!config.validate_defaults);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: ResolverConfig = serde_yaml::from_str("deny_unresolved: true").unwrap();
        assert!(config.deny_unresolved);
        assert!(config.sniff_json);
        assert_eq!(config.max_passes, None);
        assert_eq!(config.extensions, ExtensionConfig::default());
    }

    #[test]
    fn test_kind_of_is_case_insensitive() {
        let config: ResolverConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.extensions.kind_of("SCHEMA"), Some(SourceKind::Schema));
        assert_eq!(config.extensions.kind_of("avdl"), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avro-resolve.yml");

        let mut config = ResolverConfig::default();
        config.max_passes = Some(3);
        config.save(&path).unwrap();

        assert_eq!(ResolverConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ResolverConfig::load(dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, crate::ResolveError::Io(_)));
    }
}
