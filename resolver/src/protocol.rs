//! Protocol document resolution.
//!
//! Protocols are self-contained, so each one is parsed on its own. A broken
//! protocol is recorded and skipped; it never affects the others.

use std::collections::BTreeMap;
use std::path::PathBuf;

use avro_resolve_core::Protocol;
use tracing::{debug, error, warn};

use crate::source::DefinitionSource;

/// A protocol document that failed to parse.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedProtocol {
    pub source: DefinitionSource,
    pub reason: String,
}

/// A protocol whose name was already taken by an earlier document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateProtocol {
    pub name: String,
    pub path: PathBuf,
}

/// Result of resolving protocol documents.
#[derive(Debug, Clone, Default)]
pub struct ProtocolResolution {
    /// Protocols keyed by simple name.
    pub protocols: BTreeMap<String, Protocol>,
    pub failures: Vec<FailedProtocol>,
    pub duplicates: Vec<DuplicateProtocol>,
}

/// Parses every protocol document independently.
///
/// When two documents declare the same protocol name, the first one in input
/// order is kept. Later ones never replace it; each is recorded in
/// [`ProtocolResolution::duplicates`] instead.
///
/// # Examples
///
/// ```
/// use avro_resolve::{DefinitionSource, resolve_protocols};
///
/// let sources = vec![
///     DefinitionSource::new("mail.avpr", r#"{"protocol": "Mail", "namespace": "ex"}"#),
///     DefinitionSource::new("broken.avpr", r#"{"namespace": "ex"}"#),
/// ];
///
/// let resolution = resolve_protocols(&sources);
/// assert!(resolution.protocols.contains_key("Mail"));
/// assert_eq!(resolution.failures.len(), 1);
/// ```
pub fn resolve_protocols(sources: &[DefinitionSource]) -> ProtocolResolution {
    let mut resolution = ProtocolResolution::default();

    for source in sources {
        match Protocol::parse_str(source.content()) {
            Ok(protocol) if resolution.protocols.contains_key(&protocol.name) => {
                warn!(
                    path = %source.path().display(),
                    protocol = %protocol.name,
                    "Ignoring protocol with a name already in use"
                );
                resolution.duplicates.push(DuplicateProtocol {
                    name: protocol.name,
                    path: source.path().to_path_buf(),
                });
            }
            Ok(protocol) => {
                debug!(
                    path = %source.path().display(),
                    protocol = %protocol.fullname(),
                    types = protocol.types.len(),
                    messages = protocol.messages.len(),
                    "Resolved protocol"
                );
                resolution.protocols.insert(protocol.name.clone(), protocol);
            }
            Err(e) => {
                error!(path = %source.path().display(), error = %e, "Failed to parse protocol");
                resolution.failures.push(FailedProtocol {
                    source: source.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    resolution
}
