//! Structured diagnostics for resolution runs.
//!
//! Everything the resolver logs through `tracing` is also recorded here, so
//! callers can inspect or serialize what happened without a subscriber.

use std::path::Path;

use avro_resolve_core::TypeName;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Overall result of a run that was not aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Every input document was resolved.
    #[default]
    Complete,
    /// Some documents were left unresolved or dropped; their names are
    /// absent from the result.
    Partial,
}

impl std::fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// Structured code for one diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// Input file is missing or unreadable and was skipped.
    Unreadable,
    /// Input file has no recognized kind and was skipped.
    UnknownKind,
    /// Input file is a recognized kind the resolver does not consume.
    UnsupportedKind,
    /// A document redeclared a known type identically.
    BenignDuplicate,
    /// A document still refers to a missing type after the last pass.
    Unresolved,
    /// A document failed to parse and was never retried.
    Dropped,
    /// A protocol document failed to parse.
    ProtocolFailed,
    /// A protocol name was already taken by an earlier document.
    DuplicateProtocol,
}

impl DiagnosticCode {
    /// Severity this code is reported at.
    pub fn severity(self) -> Severity {
        match self {
            Self::BenignDuplicate => Severity::Info,
            Self::Unreadable
            | Self::UnknownKind
            | Self::UnsupportedKind
            | Self::Unresolved
            | Self::DuplicateProtocol => Severity::Warning,
            Self::Dropped | Self::ProtocolFailed => Severity::Error,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable => write!(f, "unreadable"),
            Self::UnknownKind => write!(f, "unknown_kind"),
            Self::UnsupportedKind => write!(f, "unsupported_kind"),
            Self::BenignDuplicate => write!(f, "benign_duplicate"),
            Self::Unresolved => write!(f, "unresolved"),
            Self::Dropped => write!(f, "dropped"),
            Self::ProtocolFailed => write!(f, "protocol_failed"),
            Self::DuplicateProtocol => write!(f, "duplicate_protocol"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// Document the diagnostic is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Type or protocol name involved, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub detail: String,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, path: &Path, detail: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            path: Some(path.display().to_string()),
            name: None,
            detail: detail.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type_name(self, name: &TypeName) -> Self {
        self.with_name(name.fullname())
    }
}

/// Report for a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// RFC 3339 timestamp of when the report was created.
    pub generated_at: String,
    pub status: ResolutionStatus,
    /// Type resolver passes performed.
    pub passes: usize,
    /// Number of resolved types.
    pub types: usize,
    /// Number of resolved protocols.
    pub protocols: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolutionReport {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            status: ResolutionStatus::Complete,
            passes: 0,
            types: 0,
            protocols: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Iterates over diagnostics carrying `code`.
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.with_code(code).count()
    }

    /// Returns `true` if any diagnostic is at warning level or above.
    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity >= Severity::Warning)
    }
}

impl Default for ResolutionReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_code_display_matches_serde() {
        let codes = [
            (DiagnosticCode::Unreadable, "unreadable"),
            (DiagnosticCode::UnknownKind, "unknown_kind"),
            (DiagnosticCode::UnsupportedKind, "unsupported_kind"),
            (DiagnosticCode::BenignDuplicate, "benign_duplicate"),
            (DiagnosticCode::Unresolved, "unresolved"),
            (DiagnosticCode::Dropped, "dropped"),
            (DiagnosticCode::ProtocolFailed, "protocol_failed"),
            (DiagnosticCode::DuplicateProtocol, "duplicate_protocol"),
        ];

        for (code, expected) in codes {
            assert_eq!(code.to_string(), expected);
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{expected}\""));
        }
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&ResolutionStatus::Partial).unwrap();
        assert_eq!(json, "\"partial\"");
        assert_eq!(ResolutionStatus::default(), ResolutionStatus::Complete);
    }

    #[test]
    fn test_diagnostic_omits_missing_name() {
        let diagnostic = Diagnostic::new(
            DiagnosticCode::Unreadable,
            Path::new("missing.avsc"),
            "No such file or directory",
        );
        let json = serde_json::to_string(&diagnostic).unwrap();
        assert!(!json.contains("\"name\""));
        assert!(json.contains("\"severity\":\"warning\""));
    }

    #[test]
    fn test_report_counts_by_code() {
        let mut report = ResolutionReport::new();
        assert!(!report.has_warnings());

        report.push(
            Diagnostic::new(DiagnosticCode::BenignDuplicate, Path::new("a.avsc"), "identical")
                .with_name("example.Gender"),
        );
        assert!(!report.has_warnings());

        report.push(Diagnostic::new(DiagnosticCode::Dropped, Path::new("b.avsc"), "bad"));
        assert_eq!(report.count(DiagnosticCode::BenignDuplicate), 1);
        assert_eq!(report.count(DiagnosticCode::Unresolved), 0);
        assert!(report.has_warnings());
    }

    #[test]
    fn test_generated_at_is_rfc3339() {
        let report = ResolutionReport::new();
        assert!(chrono::DateTime::parse_from_rfc3339(&report.generated_at).is_ok());
    }
}
