//! Error types for resolution runs.
//!
//! Only genuine conflicts and caller misuse abort a run. Unreadable files,
//! unresolved references and broken documents are recorded in the
//! [`ResolutionReport`](crate::ResolutionReport) instead.

use std::path::PathBuf;

use avro_resolve_core::TypeName;
use thiserror::Error;

/// Errors that abort a resolution run.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Two documents declare structurally different types with the same
    /// full name.
    #[error("found conflicting schema definitions for {name} in {}", .path.display())]
    Conflict { name: TypeName, path: PathBuf },

    /// One document declares the same full name twice.
    #[error("duplicated schema definition of {name} in a single file: {}", .path.display())]
    DuplicateInDocument { name: TypeName, path: PathBuf },

    /// No input documents were given.
    #[error("no input files given")]
    EmptyInput,

    /// The resolver did not settle within the configured number of passes.
    #[error("resolution did not settle within {0} passes")]
    PassLimitExceeded(usize),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results with [`ResolveError`].
pub type Result<T> = std::result::Result<T, ResolveError>;
