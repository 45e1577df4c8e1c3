//! The aggregated result and the [`Resolver`] entry point.

use std::collections::BTreeMap;
use std::path::PathBuf;

use avro_resolve_core::{Definitions, NamedType, Protocol, TypeName};
use serde_json::{Map, Value};
use tracing::info;

use crate::classify::{Classification, classify, classify_sources};
use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::protocol::{ProtocolResolution, resolve_protocols};
use crate::report::{Diagnostic, DiagnosticCode, ResolutionReport, ResolutionStatus};
use crate::resolve::{AvroDocumentParser, TypeResolution, TypeResolver};
use crate::source::DefinitionSource;

/// Resolved types and protocols. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    types: Definitions,
    protocols: BTreeMap<String, Protocol>,
}

impl Resolution {
    pub fn new(types: Definitions, protocols: BTreeMap<String, Protocol>) -> Self {
        Self { types, protocols }
    }

    /// All resolved types by full name.
    pub fn types(&self) -> &Definitions {
        &self.types
    }

    /// All resolved protocols by simple name.
    pub fn protocols(&self) -> &BTreeMap<String, Protocol> {
        &self.protocols
    }

    /// Looks up a type by full name, e.g. `"example.Person"`.
    pub fn get_type(&self, fullname: &str) -> Option<&NamedType> {
        self.types.get(&TypeName::qualify(fullname, None))
    }

    pub fn get_protocol(&self, name: &str) -> Option<&Protocol> {
        self.protocols.get(name)
    }

    /// Full names of all resolved types in sorted order.
    pub fn type_names(&self) -> impl Iterator<Item = String> + '_ {
        self.types.keys().map(TypeName::fullname)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.protocols.is_empty()
    }

    /// Renders the resolution as `{"types": {..}, "protocols": {..}}`.
    pub fn to_json_value(&self) -> Value {
        let types: Map<String, Value> = self
            .types
            .iter()
            .map(|(name, ty)| (name.fullname(), ty.to_json_value()))
            .collect();
        let protocols: Map<String, Value> = self
            .protocols
            .iter()
            .map(|(name, protocol)| (name.clone(), protocol.to_json_value()))
            .collect();

        let mut obj = Map::new();
        obj.insert("types".to_string(), Value::Object(types));
        obj.insert("protocols".to_string(), Value::Object(protocols));
        Value::Object(obj)
    }
}

/// A finished run: the resolution plus what happened along the way.
#[derive(Debug, Clone)]
pub struct ResolutionOutcome {
    pub resolution: Resolution,
    pub report: ResolutionReport,
}

impl ResolutionOutcome {
    pub fn status(&self) -> ResolutionStatus {
        self.report.status
    }
}

/// Classifies inputs, resolves schemas and protocols, and aggregates the
/// results.
///
/// # Examples
///
/// ```
/// use avro_resolve::{DefinitionSource, ResolutionStatus, Resolver};
///
/// let outcome = Resolver::new()
///     .resolve_sources(vec![
///         DefinitionSource::new("a.avsc", r#"{"type": "record", "name": "ex.A",
///             "fields": [{"name": "b", "type": "B"}]}"#),
///         DefinitionSource::new("b.avsc", r#"{"type": "fixed", "name": "ex.B", "size": 4}"#),
///         DefinitionSource::new("p.avpr", r#"{"protocol": "Ping", "messages": {}}"#),
///     ])
///     .unwrap();
///
/// assert_eq!(outcome.status(), ResolutionStatus::Complete);
/// assert!(outcome.resolution.get_type("ex.A").is_some());
/// assert!(outcome.resolution.get_protocol("Ping").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Overrides the pass cap.
    pub fn max_passes(mut self, max_passes: Option<usize>) -> Self {
        self.config.max_passes = max_passes;
        self
    }

    /// Enables or disables checking field defaults.
    pub fn validate_defaults(mut self, validate: bool) -> Self {
        self.config.validate_defaults = validate;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Reads, classifies and resolves files.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::EmptyInput`] when `paths` is empty, and any
    /// error from [`TypeResolver::resolve`].
    pub fn resolve_paths(&self, paths: &[PathBuf]) -> Result<ResolutionOutcome> {
        if paths.is_empty() {
            return Err(ResolveError::EmptyInput);
        }
        let mut report = ResolutionReport::new();
        let classification = classify(paths, &self.config, &mut report);
        self.resolve_classified(&classification, report)
    }

    /// Classifies and resolves in-memory sources.
    ///
    /// # Errors
    ///
    /// Same as [`resolve_paths`](Self::resolve_paths).
    pub fn resolve_sources(&self, sources: Vec<DefinitionSource>) -> Result<ResolutionOutcome> {
        if sources.is_empty() {
            return Err(ResolveError::EmptyInput);
        }
        let mut report = ResolutionReport::new();
        let classification = classify_sources(sources, &self.config, &mut report);
        self.resolve_classified(&classification, report)
    }

    /// Resolves already classified sources, appending to `report`.
    ///
    /// Unsupported sources are ignored.
    pub fn resolve_classified(
        &self,
        classification: &Classification,
        mut report: ResolutionReport,
    ) -> Result<ResolutionOutcome> {
        let types = TypeResolver::new(AvroDocumentParser::new(self.config.validate_defaults))
            .with_max_passes(self.config.max_passes)
            .resolve(&classification.schemas)?;
        let protocols = resolve_protocols(&classification.protocols);

        let complete = types.status() == ResolutionStatus::Complete
            && protocols.failures.is_empty();
        report.status = if complete {
            ResolutionStatus::Complete
        } else {
            ResolutionStatus::Partial
        };
        report.passes = types.passes;
        report.types = types.definitions.len();
        report.protocols = protocols.protocols.len();
        record_types(&mut report, &types);
        record_protocols(&mut report, &protocols);

        info!(
            status = %report.status,
            types = report.types,
            protocols = report.protocols,
            passes = report.passes,
            "Resolution finished"
        );

        Ok(ResolutionOutcome {
            resolution: Resolution::new(types.definitions, protocols.protocols),
            report,
        })
    }
}

fn record_types(report: &mut ResolutionReport, types: &TypeResolution) {
    for duplicate in &types.duplicates {
        report.push(
            Diagnostic::new(
                DiagnosticCode::BenignDuplicate,
                &duplicate.path,
                "identical redeclaration ignored",
            )
            .with_type_name(&duplicate.name),
        );
    }
    for unresolved in &types.unresolved {
        report.push(
            Diagnostic::new(
                DiagnosticCode::Unresolved,
                unresolved.source.path(),
                format!("undefined name: {}", unresolved.missing),
            )
            .with_type_name(&unresolved.missing),
        );
    }
    for dropped in &types.dropped {
        report.push(Diagnostic::new(
            DiagnosticCode::Dropped,
            dropped.source.path(),
            dropped.reason.clone(),
        ));
    }
}

fn record_protocols(report: &mut ResolutionReport, protocols: &ProtocolResolution) {
    for failure in &protocols.failures {
        report.push(Diagnostic::new(
            DiagnosticCode::ProtocolFailed,
            failure.source.path(),
            failure.reason.clone(),
        ));
    }
    for duplicate in &protocols.duplicates {
        report.push(
            Diagnostic::new(
                DiagnosticCode::DuplicateProtocol,
                &duplicate.path,
                "protocol name already in use",
            )
            .with_name(duplicate.name.clone()),
        );
    }
}
