//! Order-independent resolution of Avro schema and protocol documents.
//!
//! Schema documents may refer to each other in any order, and the same
//! named type may appear in several documents. This crate resolves a flat
//! set of such documents into one consistent set of definitions:
//!
//! - [`classify`] buckets input files by kind ([`SourceKind`]).
//! - [`TypeResolver`] retries documents with forward references until a
//!   fixed point is reached.
//! - [`reconcile`] decides whether a redeclared name is a harmless
//!   duplicate or a genuine conflict.
//! - [`resolve_protocols`] parses self-contained protocol documents.
//! - [`Resolver`] runs all of the above and returns a
//!   [`ResolutionOutcome`]: the immutable [`Resolution`] plus a
//!   [`ResolutionReport`].
//!
//! Only genuine conflicts, misuse (no input) and the optional pass cap
//! abort a run. Everything else degrades to a partial result with
//! diagnostics.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use avro_resolve::{ResolutionStatus, Resolver, ResolverConfig, expand_inputs};
//!
//! let config = ResolverConfig::load("avro-resolve.yml").unwrap_or_default();
//! let paths = expand_inputs(&[PathBuf::from("schemas/")]).unwrap();
//! let outcome = Resolver::with_config(config).resolve_paths(&paths).unwrap();
//!
//! for name in outcome.resolution.type_names() {
//!     println!("{name}");
//! }
//! if outcome.status() == ResolutionStatus::Partial {
//!     eprintln!("{} diagnostics", outcome.report.diagnostics.len());
//! }
//! ```

mod classify;
mod config;
mod error;
mod protocol;
mod reconcile;
mod report;
mod resolution;
mod resolve;
mod source;

pub use classify::{
    Classification, SourceKind, classify, classify_sources, expand_inputs, kind_of,
};
pub use config::{ExtensionConfig, ResolverConfig};
pub use error::{ResolveError, Result};
pub use protocol::{DuplicateProtocol, FailedProtocol, ProtocolResolution, resolve_protocols};
pub use reconcile::{Reconciliation, reconcile};
pub use report::{
    Diagnostic, DiagnosticCode, ResolutionReport, ResolutionStatus, Severity,
};
pub use resolution::{Resolution, ResolutionOutcome, Resolver};
pub use resolve::{
    AvroDocumentParser, BenignDuplicate, DocumentParser, DroppedSource, TypeResolution,
    TypeResolver, UnresolvedSource,
};
pub use source::DefinitionSource;
