//! Redeclaration handling.
//!
//! When a document declares a name that is already defined, the document is
//! re-parsed with that name removed from the known definitions. If the
//! re-parse trips over another known name (an inline type nested in the
//! first one), that name is peeled as well, recursively, until the document
//! parses. Every peeled name is then compared structurally with the
//! definition already on record.

use avro_resolve_core::{Definitions, NamedType, ParseFailure, TypeName};
use tracing::debug;

use crate::error::{ResolveError, Result};
use crate::resolve::DocumentParser;
use crate::source::DefinitionSource;

/// Outcome of reconciling a redeclaring document.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// All peeled names were identical redeclarations.
    Merged {
        /// Names the document introduces that were not known before.
        added: Vec<(TypeName, NamedType)>,
        /// Known names the document redeclared identically.
        duplicates: Vec<TypeName>,
    },
    /// The reduced re-parse needs a type that is not known yet.
    Unresolved(TypeName),
    /// The reduced re-parse failed for a structural reason.
    Failed(String),
}

/// Reconciles `source`, which failed to parse because it redeclares `name`.
///
/// `definitions` is never modified; the caller adopts the returned
/// additions.
///
/// # Errors
///
/// Returns [`ResolveError::Conflict`] if a redeclared type differs from the
/// known one, or [`ResolveError::DuplicateInDocument`] if the document
/// declares the same name twice.
pub fn reconcile<P: DocumentParser + ?Sized>(
    parser: &P,
    source: &DefinitionSource,
    name: TypeName,
    definitions: &Definitions,
) -> Result<Reconciliation> {
    peel(parser, source, definitions, vec![name])
}

fn peel<P: DocumentParser + ?Sized>(
    parser: &P,
    source: &DefinitionSource,
    definitions: &Definitions,
    peeled: Vec<TypeName>,
) -> Result<Reconciliation> {
    let reduced: Definitions = definitions
        .iter()
        .filter(|(name, _)| !peeled.contains(name))
        .map(|(name, ty)| (name.clone(), ty.clone()))
        .collect();

    match parser.parse(source, &reduced) {
        Ok(defined) => {
            let mut added = Vec::new();
            for (name, ty) in defined {
                match definitions.get(&name) {
                    Some(original) if *original == ty => {}
                    Some(_) => {
                        return Err(ResolveError::Conflict {
                            name,
                            path: source.path().to_path_buf(),
                        });
                    }
                    None => added.push((name, ty)),
                }
            }
            Ok(Reconciliation::Merged {
                added,
                duplicates: peeled,
            })
        }
        Err(ParseFailure::AlreadyDefined(name)) if peeled.contains(&name) => {
            Err(ResolveError::DuplicateInDocument {
                name,
                path: source.path().to_path_buf(),
            })
        }
        Err(ParseFailure::AlreadyDefined(name)) => {
            debug!(path = %source.path().display(), name = %name, "Peeling nested redeclaration");
            let mut peeled = peeled;
            peeled.push(name);
            peel(parser, source, definitions, peeled)
        }
        // Only the document's own redeclaration could satisfy this reference,
        // and it comes later in the document.
        Err(ParseFailure::UnresolvedReference(missing)) if peeled.contains(&missing) => {
            Ok(Reconciliation::Failed(format!(
                "reference to redeclared type {missing} before its declaration"
            )))
        }
        Err(ParseFailure::UnresolvedReference(missing)) => Ok(Reconciliation::Unresolved(missing)),
        Err(ParseFailure::Other(reason)) => Ok(Reconciliation::Failed(reason)),
    }
}
