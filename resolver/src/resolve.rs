//! Fixed-point type resolution.
//!
//! Schema documents may refer to types declared in documents that have not
//! been parsed yet. The resolver sweeps the documents in passes: the first
//! pass covers every document in input order, and each later pass retries
//! only the documents that failed on a missing reference. Resolution stops
//! when nothing is left to retry, or when a pass adds no new definition.
//!
//! # Examples
//!
//! ```
//! use avro_resolve::{AvroDocumentParser, DefinitionSource, ResolutionStatus, TypeResolver};
//!
//! let sources = vec![
//!     DefinitionSource::new("person.avsc", r#"{"type": "record", "name": "ex.Person",
//!         "fields": [{"name": "pet", "type": "Dog"}]}"#),
//!     DefinitionSource::new("dog.avsc", r#"{"type": "record", "name": "ex.Dog", "fields": []}"#),
//! ];
//!
//! let resolution = TypeResolver::new(AvroDocumentParser::default()).resolve(&sources).unwrap();
//! assert_eq!(resolution.status(), ResolutionStatus::Complete);
//! assert_eq!(resolution.definitions.len(), 2);
//! assert_eq!(resolution.passes, 2);
//! ```

use std::path::PathBuf;

use avro_resolve_core::{Definitions, NamedType, ParseFailure, ParseResult, SchemaParser, TypeName};
use tracing::{debug, error, info, warn};

use crate::error::{ResolveError, Result};
use crate::reconcile::{Reconciliation, reconcile};
use crate::report::ResolutionStatus;
use crate::source::DefinitionSource;

/// Parses one document against the definitions known so far.
///
/// Implemented for any `Fn(&DefinitionSource, &Definitions)` closure, so
/// tests and embedders can inject their own parser.
///
/// A parser is expected to report a redeclaration of a `known` name as
/// [`ParseFailure::AlreadyDefined`]. Names returned on success are still
/// checked against the known definitions: an identical one is recorded as
/// a duplicate and a different one is a conflict.
pub trait DocumentParser {
    /// Returns the names the document introduces, or a typed failure.
    fn parse(
        &self,
        source: &DefinitionSource,
        known: &Definitions,
    ) -> ParseResult<Vec<(TypeName, NamedType)>>;
}

impl<F> DocumentParser for F
where
    F: Fn(&DefinitionSource, &Definitions) -> ParseResult<Vec<(TypeName, NamedType)>>,
{
    fn parse(
        &self,
        source: &DefinitionSource,
        known: &Definitions,
    ) -> ParseResult<Vec<(TypeName, NamedType)>> {
        self(source, known)
    }
}

/// [`DocumentParser`] backed by [`SchemaParser`].
#[derive(Debug, Clone, Copy)]
pub struct AvroDocumentParser {
    validate_defaults: bool,
}

impl AvroDocumentParser {
    pub fn new(validate_defaults: bool) -> Self {
        Self { validate_defaults }
    }
}

impl Default for AvroDocumentParser {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DocumentParser for AvroDocumentParser {
    fn parse(
        &self,
        source: &DefinitionSource,
        known: &Definitions,
    ) -> ParseResult<Vec<(TypeName, NamedType)>> {
        SchemaParser::with_known(known)
            .validate_defaults(self.validate_defaults)
            .parse_str(source.content())
            .map(|parsed| parsed.defined)
    }
}

/// A document still waiting on a missing type when resolution stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedSource {
    pub source: DefinitionSource,
    /// The reference that failed on the last attempt.
    pub missing: TypeName,
}

/// A document that failed to parse and was never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedSource {
    pub source: DefinitionSource,
    pub reason: String,
}

/// An identical redeclaration that was folded into the existing definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenignDuplicate {
    pub name: TypeName,
    pub path: PathBuf,
}

/// Result of a type resolution run that was not aborted.
#[derive(Debug, Clone, Default)]
pub struct TypeResolution {
    /// Every resolved type by full name.
    pub definitions: Definitions,
    /// Documents left with a missing reference, in input order.
    pub unresolved: Vec<UnresolvedSource>,
    /// Documents dropped on a parse error, in the order they failed.
    pub dropped: Vec<DroppedSource>,
    pub duplicates: Vec<BenignDuplicate>,
    /// Number of passes performed.
    pub passes: usize,
}

impl TypeResolution {
    /// `Complete` when no document was left unresolved or dropped.
    pub fn status(&self) -> ResolutionStatus {
        if self.unresolved.is_empty() && self.dropped.is_empty() {
            ResolutionStatus::Complete
        } else {
            ResolutionStatus::Partial
        }
    }
}

/// Resolves schema documents in any order.
#[derive(Debug, Clone)]
pub struct TypeResolver<P> {
    parser: P,
    max_passes: Option<usize>,
}

impl<P: DocumentParser> TypeResolver<P> {
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            max_passes: None,
        }
    }

    /// Caps the number of passes. `None` allows the input count plus one.
    pub fn with_max_passes(mut self, max_passes: Option<usize>) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Resolves `sources` into a single set of definitions.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Conflict`] or
    /// [`ResolveError::DuplicateInDocument`] when a name is declared with
    /// two different definitions, and [`ResolveError::PassLimitExceeded`]
    /// when the pass cap is hit. Missing references and broken documents are
    /// not errors; see [`TypeResolution::status`].
    pub fn resolve(&self, sources: &[DefinitionSource]) -> Result<TypeResolution> {
        let max_passes = self.max_passes.unwrap_or(sources.len() + 1);
        let mut resolution = TypeResolution::default();
        let mut queue: Vec<usize> = (0..sources.len()).collect();

        loop {
            if resolution.passes == max_passes {
                return Err(ResolveError::PassLimitExceeded(max_passes));
            }
            resolution.passes += 1;

            let before = resolution.definitions.len();
            let carryover = self.run_pass(sources, &queue, &mut resolution)?;
            let after = resolution.definitions.len();

            debug!(
                pass = resolution.passes,
                attempted = queue.len(),
                defined = after - before,
                carryover = carryover.len(),
                "Finished resolver pass"
            );

            if carryover.is_empty() {
                return Ok(resolution);
            }
            if after == before {
                for (index, missing) in carryover {
                    let source = &sources[index];
                    warn!(
                        path = %source.path().display(),
                        missing = %missing,
                        "Leaving document unresolved"
                    );
                    resolution.unresolved.push(UnresolvedSource {
                        source: source.clone(),
                        missing,
                    });
                }
                return Ok(resolution);
            }

            queue = carryover.into_iter().map(|(index, _)| index).collect();
        }
    }

    /// Attempts each queued document once and returns the carryover.
    fn run_pass(
        &self,
        sources: &[DefinitionSource],
        queue: &[usize],
        resolution: &mut TypeResolution,
    ) -> Result<Vec<(usize, TypeName)>> {
        let mut carryover = Vec::new();

        for &index in queue {
            let source = &sources[index];
            match self.parser.parse(source, &resolution.definitions) {
                Ok(defined) => merge_defined(resolution, source, defined)?,
                Err(ParseFailure::UnresolvedReference(missing)) => {
                    debug!(path = %source.path().display(), missing = %missing, "Deferring document");
                    carryover.push((index, missing));
                }
                Err(ParseFailure::AlreadyDefined(name)) => {
                    match reconcile(&self.parser, source, name, &resolution.definitions)? {
                        Reconciliation::Merged { added, duplicates } => {
                            for name in duplicates {
                                record_duplicate(resolution, source, name);
                            }
                            merge_defined(resolution, source, added)?;
                        }
                        Reconciliation::Unresolved(missing) => {
                            debug!(
                                path = %source.path().display(),
                                missing = %missing,
                                "Deferring redeclaring document"
                            );
                            carryover.push((index, missing));
                        }
                        Reconciliation::Failed(reason) => drop_source(resolution, source, reason),
                    }
                }
                Err(ParseFailure::Other(reason)) => drop_source(resolution, source, reason),
            }
        }

        Ok(carryover)
    }
}

/// Adds newly parsed names without ever replacing a known definition.
fn merge_defined(
    resolution: &mut TypeResolution,
    source: &DefinitionSource,
    defined: Vec<(TypeName, NamedType)>,
) -> Result<()> {
    for (name, ty) in defined {
        match resolution.definitions.get(&name) {
            None => {
                resolution.definitions.insert(name, ty);
            }
            Some(existing) if *existing == ty => record_duplicate(resolution, source, name),
            Some(_) => {
                return Err(ResolveError::Conflict {
                    name,
                    path: source.path().to_path_buf(),
                });
            }
        }
    }
    Ok(())
}

fn record_duplicate(resolution: &mut TypeResolution, source: &DefinitionSource, name: TypeName) {
    info!(path = %source.path().display(), name = %name, "Ignoring identical redeclaration");
    resolution.duplicates.push(BenignDuplicate {
        name,
        path: source.path().to_path_buf(),
    });
}

fn drop_source(resolution: &mut TypeResolution, source: &DefinitionSource, reason: String) {
    error!(path = %source.path().display(), reason = %reason, "Dropping unparseable document");
    resolution.dropped.push(DroppedSource {
        source: source.clone(),
        reason,
    });
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn record(name: &str, refs: &[&str]) -> DefinitionSource {
        let fields: Vec<String> = refs
            .iter()
            .enumerate()
            .map(|(i, r)| format!(r#"{{"name": "f{i}", "type": "{r}"}}"#))
            .collect();
        DefinitionSource::new(
            format!("{name}.avsc"),
            format!(
                r#"{{"type": "record", "name": "{name}", "fields": [{}]}}"#,
                fields.join(", ")
            ),
        )
    }

    fn resolver() -> TypeResolver<AvroDocumentParser> {
        TypeResolver::new(AvroDocumentParser::default())
    }

    fn keys(resolution: &TypeResolution) -> Vec<String> {
        resolution.definitions.keys().map(TypeName::fullname).collect()
    }

    #[test]
    fn test_single_document_without_references() {
        let resolution = resolver().resolve(&[record("ex.Solo", &[])]).unwrap();
        assert_eq!(keys(&resolution), vec!["ex.Solo"]);
        assert_eq!(resolution.passes, 1);
        assert_eq!(resolution.status(), ResolutionStatus::Complete);
    }

    #[test]
    fn test_reverse_chain_needs_one_pass_per_link() {
        let sources = vec![
            record("ex.A", &["ex.B"]),
            record("ex.B", &["ex.C"]),
            record("ex.C", &[]),
        ];
        let resolution = resolver().resolve(&sources).unwrap();
        assert_eq!(keys(&resolution), vec!["ex.A", "ex.B", "ex.C"]);
        assert_eq!(resolution.passes, 3);
    }

    #[test]
    fn test_missing_leaf_resolves_nothing() {
        let resolution = resolver().resolve(&[record("ex.A", &["ex.B"])]).unwrap();
        assert!(resolution.definitions.is_empty());
        assert_eq!(resolution.unresolved.len(), 1);
        assert_eq!(resolution.unresolved[0].missing, TypeName::qualify("ex.B", None));
        assert_eq!(resolution.status(), ResolutionStatus::Partial);
    }

    #[test]
    fn test_broken_document_is_dropped_once() {
        let attempts = Cell::new(0);
        let parser = |source: &DefinitionSource, known: &Definitions| {
            if source.path().ends_with("broken.avsc") {
                attempts.set(attempts.get() + 1);
            }
            AvroDocumentParser::default().parse(source, known)
        };

        let sources = vec![
            record("ex.A", &["ex.B"]),
            DefinitionSource::new("broken.avsc", r#"{"type": "record"}"#),
            record("ex.B", &[]),
        ];
        let resolution = TypeResolver::new(parser).resolve(&sources).unwrap();

        assert_eq!(keys(&resolution), vec!["ex.A", "ex.B"]);
        assert_eq!(resolution.dropped.len(), 1);
        assert_eq!(attempts.get(), 1);
        assert_eq!(resolution.status(), ResolutionStatus::Partial);
    }

    #[test]
    fn test_identical_duplicates_are_recorded() {
        let sources = vec![record("ex.A", &[]), record("ex.A", &[])];
        let resolution = resolver().resolve(&sources).unwrap();
        assert_eq!(keys(&resolution), vec!["ex.A"]);
        assert_eq!(resolution.duplicates.len(), 1);
        assert_eq!(resolution.status(), ResolutionStatus::Complete);
    }

    #[test]
    fn test_conflict_aborts() {
        let sources = vec![record("ex.A", &[]), record("ex.A", &["int"])];
        let err = resolver().resolve(&sources).unwrap_err();
        assert!(matches!(err, ResolveError::Conflict { .. }));
    }

    fn unseeded(
        source: &DefinitionSource,
        _: &Definitions,
    ) -> ParseResult<Vec<(TypeName, NamedType)>> {
        SchemaParser::new().parse_str(source.content()).map(|parsed| parsed.defined)
    }

    fn fixed(file: &str, size: usize) -> DefinitionSource {
        DefinitionSource::new(
            file,
            format!(r#"{{"type": "fixed", "name": "ex.X", "size": {size}}}"#),
        )
    }

    #[test]
    fn test_parser_returning_known_name_cannot_replace_it() {
        let sources = vec![fixed("small.avsc", 4), fixed("large.avsc", 8)];
        let err = TypeResolver::new(unseeded).resolve(&sources).unwrap_err();
        match err {
            ResolveError::Conflict { name, path } => {
                assert_eq!(name, TypeName::qualify("ex.X", None));
                assert_eq!(path, PathBuf::from("large.avsc"));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_parser_returning_known_identical_name_records_duplicate() {
        let sources = vec![fixed("first.avsc", 4), fixed("second.avsc", 4)];
        let resolution = TypeResolver::new(unseeded).resolve(&sources).unwrap();

        assert_eq!(keys(&resolution), vec!["ex.X"]);
        assert_eq!(
            resolution.duplicates,
            vec![BenignDuplicate {
                name: TypeName::qualify("ex.X", None),
                path: PathBuf::from("second.avsc"),
            }]
        );
    }

    #[test]
    fn test_reference_ahead_of_redeclaration_is_dropped_not_unresolved() {
        let sources = vec![
            DefinitionSource::new(
                "gender.avsc",
                r#"{"type": "enum", "name": "ex.Gender", "symbols": ["F"]}"#,
            ),
            DefinitionSource::new(
                "dog.avsc",
                r#"{"type": "record", "name": "ex.Dog", "fields": [
                    {"name": "mother", "type": "Gender"},
                    {"name": "gender", "type": {"type": "enum", "name": "Gender", "symbols": ["F"]}}
                ]}"#,
            ),
        ];
        let resolution = resolver().resolve(&sources).unwrap();

        assert_eq!(keys(&resolution), vec!["ex.Gender"]);
        assert!(resolution.unresolved.is_empty());
        assert_eq!(resolution.dropped.len(), 1);
        assert!(resolution.dropped[0].source.path().ends_with("dog.avsc"));
    }

    #[test]
    fn test_pass_cap_is_enforced() {
        let sources = vec![
            record("ex.A", &["ex.B"]),
            record("ex.B", &["ex.C"]),
            record("ex.C", &[]),
        ];
        let err = resolver().with_max_passes(Some(2)).resolve(&sources).unwrap_err();
        assert!(matches!(err, ResolveError::PassLimitExceeded(2)));
    }

    #[test]
    fn test_default_cap_allows_worst_case_order() {
        let sources: Vec<DefinitionSource> = (0..6)
            .map(|i| {
                let next = format!("ex.T{}", i + 1);
                if i == 5 {
                    record(&format!("ex.T{i}"), &[])
                } else {
                    record(&format!("ex.T{i}"), &[next.as_str()])
                }
            })
            .collect();

        let resolution = resolver().resolve(&sources).unwrap();
        assert_eq!(resolution.definitions.len(), 6);
        assert_eq!(resolution.passes, 6);
    }

    #[test]
    fn test_primitive_document_defines_nothing_and_completes() {
        let source = DefinitionSource::new("alias.avsc", r#""string""#);
        let resolution = resolver().resolve(&[source]).unwrap();
        assert!(resolution.definitions.is_empty());
        assert_eq!(resolution.status(), ResolutionStatus::Complete);
    }
}
