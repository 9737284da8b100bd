//! Check command - reports declaration diagnostics for a project

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use vbscope_core::{PublishDiagnostics, Severity};

use super::load_project;
use crate::output::json::JsonFormatter;
use crate::output::pretty::PrettyFormatter;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Directory or *.syntax.json stream to analyze
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format for diagnostics (pretty, json)
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Fail on warnings (exit code 1)
    #[arg(long)]
    pub fail_on_warnings: bool,

    /// Filter diagnostics by minimum severity level (error, warning, info, hint)
    #[arg(long, value_name = "LEVEL")]
    pub severity: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl CheckArgs {
    pub fn run(&self) -> Result<()> {
        self.configure_colors();
        let min_severity = self.parse_severity()?;

        let loaded = load_project(&self.path)?;
        for (file, message) in &loaded.failures {
            eprintln!("{} {}: {}", "error:".red().bold(), file.display(), message);
        }

        if loaded.total_files == 0 {
            println!("No syntax streams (*.syntax.json) found.");
            return Ok(());
        }

        let mut reports = Vec::new();
        for document in loaded.project.documents() {
            let mut report = loaded.project.diagnostics(&document.uri)?;
            report
                .diagnostics
                .retain(|d| d.severity.level() >= min_severity.level());
            reports.push(report);
        }

        let analyzed_path = self.path.to_string_lossy().to_string();
        match self.format.as_str() {
            "json" => println!(
                "{}",
                JsonFormatter::new().format(&reports, loaded.total_files, &analyzed_path)
            ),
            _ => print!("{}", PrettyFormatter::new().format(&reports)),
        }

        let (errors, warnings) = count_by_severity(&reports);
        let has_errors = errors > 0 || !loaded.failures.is_empty();
        let has_warnings = warnings > 0 && self.fail_on_warnings;

        if has_errors || has_warnings {
            process::exit(1);
        }

        Ok(())
    }

    fn parse_severity(&self) -> Result<Severity> {
        match self.severity.as_deref() {
            Some("error") => Ok(Severity::Error),
            Some("warning") => Ok(Severity::Warning),
            Some("info") | Some("information") => Ok(Severity::Information),
            Some("hint") | None => Ok(Severity::Hint),
            Some(other) => anyhow::bail!(
                "Invalid severity '{}'. Valid values: error, warning, info, hint",
                other
            ),
        }
    }

    fn configure_colors(&self) {
        let no_color_env = std::env::var("NO_COLOR").is_ok();
        if self.no_color || no_color_env {
            colored::control::set_override(false);
        }
    }
}

fn count_by_severity(reports: &[PublishDiagnostics]) -> (usize, usize) {
    let all = reports.iter().flat_map(|r| &r.diagnostics);
    let errors = all
        .clone()
        .filter(|d| matches!(d.severity, Severity::Error))
        .count();
    let warnings = all
        .filter(|d| matches!(d.severity, Severity::Warning))
        .count();
    (errors, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vbscope_core::{Diagnostic, TextRange};

    fn args(severity: Option<&str>) -> CheckArgs {
        CheckArgs {
            path: PathBuf::from("."),
            format: "pretty".to_string(),
            fail_on_warnings: false,
            severity: severity.map(str::to_string),
            no_color: true,
        }
    }

    #[test]
    fn severity_defaults_to_hint() {
        assert_eq!(args(None).parse_severity().unwrap(), Severity::Hint);
    }

    #[test]
    fn severity_accepts_info_alias() {
        assert_eq!(args(Some("info")).parse_severity().unwrap(), Severity::Information);
        assert_eq!(args(Some("error")).parse_severity().unwrap(), Severity::Error);
    }

    #[test]
    fn invalid_severity_is_rejected() {
        let error = args(Some("fatal")).parse_severity().unwrap_err();
        assert!(error.to_string().contains("Invalid severity 'fatal'"));
    }

    #[test]
    fn counts_errors_and_warnings() {
        let range = TextRange::from_coords(1, 0, 1, 3);
        let reports = vec![PublishDiagnostics {
            uri: "file:///project/Module1.bas".to_string(),
            version: 1,
            diagnostics: vec![
                Diagnostic::duplicate_declaration(range, "Foo"),
                Diagnostic::shadowed_declaration(range, "Foo"),
                Diagnostic::unused_declaration(range, "Foo"),
            ],
        }];

        assert_eq!(count_by_severity(&reports), (1, 1));
    }
}
