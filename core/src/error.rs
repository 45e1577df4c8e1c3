//! Typed parser failures.
//!
//! The resolver's retry and reconciliation decisions branch on these
//! variants, so every failure the parser can produce falls into exactly one
//! of them.

use thiserror::Error;

use crate::TypeName;

/// Why a single document failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// The document refers to a named type that is not known yet.
    #[error("undefined name: {0}")]
    UnresolvedReference(TypeName),

    /// The document declares a name that is already known, either from the
    /// seeded definitions or from an earlier declaration in the same
    /// document.
    #[error("can't redefine: {0}")]
    AlreadyDefined(TypeName),

    /// Malformed JSON or any other structural violation.
    #[error("{0}")]
    Other(String),
}

impl ParseFailure {
    pub(crate) fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Convenience alias for parser results.
pub type ParseResult<T> = std::result::Result<T, ParseFailure>;
