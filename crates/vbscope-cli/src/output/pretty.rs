//! Pretty formatter for human-readable terminal output
//!
//! Positions are printed one-based, the way editors display them.

use colored::{ColoredString, Colorize};
use vbscope_core::diagnostic::Diagnostic;
use vbscope_core::{Location, LocationLink, Position, PublishDiagnostics, Severity};

pub struct PrettyFormatter;

impl PrettyFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(&self, reports: &[PublishDiagnostics]) -> String {
        let mut output = String::new();

        for report in reports {
            for diag in &report.diagnostics {
                output.push_str(&self.format_diagnostic(&report.uri, diag));
                output.push('\n');
            }
        }

        let diagnostics: Vec<&Diagnostic> =
            reports.iter().flat_map(|r| &r.diagnostics).collect();
        if !diagnostics.is_empty() {
            output.push_str(&self.format_summary(&diagnostics));
        }

        output
    }

    fn format_diagnostic(&self, uri: &str, diag: &Diagnostic) -> String {
        let mut lines = Vec::new();

        let severity_str = self.colorize_severity(&diag.severity);
        lines.push(format!(
            "{}[{}]: {}",
            severity_str,
            diag.code.as_str().dimmed(),
            diag.message
        ));
        lines.push(format!(
            "  {} {}",
            "-->".blue(),
            display_position(uri, diag.range.start)
        ));

        for related in &diag.related_information {
            lines.push(format!(
                "   {} {}: {}",
                "=".blue(),
                "related".green(),
                display_position(&related.uri, related.range.start)
            ));
        }

        lines.join("\n")
    }

    pub fn format_definitions(&self, links: &[LocationLink]) -> String {
        if links.is_empty() {
            return "No definition found.\n".to_string();
        }

        links
            .iter()
            .map(|link| {
                format!(
                    "{} {}\n",
                    "-->".blue(),
                    display_position(&link.target_uri, link.target_selection_range.start)
                )
            })
            .collect()
    }

    pub fn format_locations(&self, locations: &[Location]) -> String {
        if locations.is_empty() {
            return "Nothing to rename.\n".to_string();
        }

        let mut output: String = locations
            .iter()
            .map(|location| {
                format!(
                    "{} {}\n",
                    "-->".blue(),
                    display_position(&location.uri, location.range.start)
                )
            })
            .collect();

        let noun = if locations.len() == 1 { "location" } else { "locations" };
        output.push_str(&format!("\n{} {}\n", locations.len().to_string().bold(), noun));
        output
    }

    fn colorize_severity(&self, severity: &Severity) -> ColoredString {
        match severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Information => "info".blue().bold(),
            Severity::Hint => "hint".cyan().bold(),
        }
    }

    fn format_summary(&self, diagnostics: &[&Diagnostic]) -> String {
        let error_count = diagnostics
            .iter()
            .filter(|d| matches!(d.severity, Severity::Error))
            .count();
        let warning_count = diagnostics
            .iter()
            .filter(|d| matches!(d.severity, Severity::Warning))
            .count();

        let total = diagnostics.len();

        let errors_str = if error_count == 1 {
            format!("{} error", error_count)
        } else {
            format!("{} errors", error_count)
        };

        let warnings_str = if warning_count == 1 {
            format!("{} warning", warning_count)
        } else {
            format!("{} warnings", warning_count)
        };

        let problems_str = if total == 1 { "problem" } else { "problems" };

        format!(
            "\nFound {} {} ({}, {})\n",
            total.to_string().bold(),
            problems_str,
            errors_str.red(),
            warnings_str.yellow()
        )
    }
}

impl Default for PrettyFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn display_position(uri: &str, position: Position) -> String {
    format!("{}:{}:{}", uri, position.line + 1, position.character + 1)
}
