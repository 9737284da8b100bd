//! JSON output formatter for diagnostic display
//!
//! Wraps the per-document reports with run metadata and a summary for
//! programmatic integration.

use serde::Serialize;
use vbscope_core::{PublishDiagnostics, Severity};

#[derive(Serialize)]
pub struct JsonOutput<'a> {
    pub version: &'static str,
    pub metadata: JsonMetadata,
    pub summary: JsonSummary,
    pub documents: &'a [PublishDiagnostics],
}

#[derive(Serialize)]
pub struct JsonMetadata {
    pub vbscope_version: &'static str,
    pub working_directory: String,
    pub analyzed_path: String,
}

#[derive(Serialize, Default)]
pub struct JsonSummary {
    pub total_files: usize,
    pub files_with_issues: usize,
    pub total_diagnostics: usize,
    pub by_severity: SeverityCounts,
}

#[derive(Serialize, Default)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub information: usize,
    pub hint: usize,
}

pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(
        &self,
        reports: &[PublishDiagnostics],
        total_files: usize,
        analyzed_path: &str,
    ) -> String {
        let output = JsonOutput {
            version: "1.0",
            metadata: self.build_metadata(analyzed_path),
            summary: self.build_summary(reports, total_files),
            documents: reports,
        };
        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }

    fn build_metadata(&self, analyzed_path: &str) -> JsonMetadata {
        JsonMetadata {
            vbscope_version: env!("CARGO_PKG_VERSION"),
            working_directory: std::env::current_dir()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
            analyzed_path: analyzed_path.to_string(),
        }
    }

    fn build_summary(&self, reports: &[PublishDiagnostics], total_files: usize) -> JsonSummary {
        let mut summary = JsonSummary {
            total_files,
            ..JsonSummary::default()
        };

        for report in reports {
            if !report.diagnostics.is_empty() {
                summary.files_with_issues += 1;
            }
            for diagnostic in &report.diagnostics {
                summary.total_diagnostics += 1;
                match diagnostic.severity {
                    Severity::Error => summary.by_severity.error += 1,
                    Severity::Warning => summary.by_severity.warning += 1,
                    Severity::Information => summary.by_severity.information += 1,
                    Severity::Hint => summary.by_severity.hint += 1,
                }
            }
        }

        summary
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vbscope_core::{Diagnostic, TextRange};

    fn sample_reports() -> Vec<PublishDiagnostics> {
        let range = TextRange::from_coords(2, 4, 2, 7);
        vec![
            PublishDiagnostics {
                uri: "file:///project/Module1.bas".to_string(),
                version: 1,
                diagnostics: vec![
                    Diagnostic::sub_or_function_not_defined(range, "Foo"),
                    Diagnostic::unused_declaration(range, "x"),
                ],
            },
            PublishDiagnostics {
                uri: "file:///project/Module2.bas".to_string(),
                version: 1,
                diagnostics: Vec::new(),
            },
        ]
    }

    #[test]
    fn format_produces_valid_json() {
        let output = JsonFormatter::new().format(&sample_reports(), 2, "./project");

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["version"], "1.0");
        assert!(parsed["metadata"]["vbscope_version"].is_string());
        assert_eq!(parsed["metadata"]["analyzed_path"], "./project");
        assert_eq!(parsed["documents"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn summary_counts_by_severity() {
        let output = JsonFormatter::new().format(&sample_reports(), 2, "./project");

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let summary = &parsed["summary"];
        assert_eq!(summary["total_files"], 2);
        assert_eq!(summary["files_with_issues"], 1);
        assert_eq!(summary["total_diagnostics"], 2);
        assert_eq!(summary["by_severity"]["error"], 1);
        assert_eq!(summary["by_severity"]["hint"], 1);
    }

    #[test]
    fn diagnostics_serialize_with_kebab_case_codes() {
        let output = JsonFormatter::new().format(&sample_reports(), 2, "./project");

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let first = &parsed["documents"][0]["diagnostics"][0];
        assert_eq!(first["code"], "sub-or-function-not-defined");
        assert_eq!(first["severity"], "error");
        assert_eq!(first["range"]["start"]["line"], 2);
        assert_eq!(parsed["documents"][0]["diagnostics"][1]["tags"][0], "unnecessary");
    }
}
