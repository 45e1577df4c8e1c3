//! Output formatting for resolutions and reports.

use avro_resolve::{Classification, Resolution, ResolutionReport, SourceKind};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
}

/// Formats a resolution in the requested output format.
pub fn format_resolution(resolution: &Resolution, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&resolution.to_json_value())
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => serde_yaml::to_string(&resolution.to_json_value())
            .map_err(|e| format!("YAML serialization failed: {e}")),
        OutputFormat::Table => Ok(resolution_to_table(resolution)),
    }
}

/// Formats a run report in the requested output format.
pub fn format_report(report: &ResolutionReport, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(report).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Table => Ok(report_to_table(report)),
    }
}

fn resolution_to_table(resolution: &Resolution) -> String {
    let mut out = String::new();

    if !resolution.types().is_empty() {
        out.push_str("Types:\n");
        let max_name = resolution
            .type_names()
            .map(|name| name.len())
            .max()
            .unwrap_or(4);

        for (name, ty) in resolution.types() {
            let refs: Vec<String> = ty.references().iter().map(|r| r.fullname()).collect();
            let refs = if refs.is_empty() {
                String::new()
            } else {
                format!("  -> {}", refs.join(", "))
            };
            out.push_str(&format!(
                "  {:<6}  {:<width$}{refs}\n",
                ty.kind(),
                name.fullname(),
                width = max_name
            ));
        }
    }

    if !resolution.protocols().is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Protocols:\n");
        for protocol in resolution.protocols().values() {
            out.push_str(&format!(
                "  {}  ({} type(s), {} message(s))\n",
                protocol.fullname(),
                protocol.types.len(),
                protocol.messages.len()
            ));
        }
    }

    if out.is_empty() {
        out.push_str("Nothing resolved.\n");
    }
    out
}

fn report_to_table(report: &ResolutionReport) -> String {
    let mut out = format!(
        "Status: {}  Types: {}  Protocols: {}  Passes: {}\n",
        report.status, report.types, report.protocols, report.passes
    );
    for diagnostic in &report.diagnostics {
        let path = diagnostic.path.as_deref().unwrap_or("-");
        out.push_str(&format!("  [{}] {path}: {}", diagnostic.code, diagnostic.detail));
        if let Some(name) = &diagnostic.name {
            out.push_str(&format!(" ({name})"));
        }
        out.push('\n');
    }
    out
}

/// Lists classified sources, one `kind  path` line each.
pub fn classification_to_table(classification: &Classification) -> String {
    let mut out = String::new();
    for kind in [SourceKind::Schema, SourceKind::Protocol, SourceKind::Unsupported] {
        for source in classification.bucket(kind) {
            out.push_str(&format!("{:<11}  {}\n", kind.to_string(), source.path().display()));
        }
    }
    out
}
