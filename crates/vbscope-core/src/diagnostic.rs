//! Diagnostic reporting for scope analysis results
//!
//! Diagnostics are attached to the syntax element that caused them and
//! published per file. Equality for de-duplication is structural: the same
//! code, message and range.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::syntax::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl Severity {
    pub fn level(&self) -> u8 {
        match self {
            Severity::Error => 4,
            Severity::Warning => 3,
            Severity::Information => 2,
            Severity::Hint => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
            Severity::Hint => "hint",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticTag {
    Unnecessary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    DuplicateDeclaration,
    ShadowedDeclaration,
    UnusedDeclaration,
    VariableNotDefined,
    SubOrFunctionNotDefined,
    AmbiguousName,
}

impl DiagnosticCode {
    pub const ALL: [DiagnosticCode; 6] = [
        DiagnosticCode::DuplicateDeclaration,
        DiagnosticCode::ShadowedDeclaration,
        DiagnosticCode::UnusedDeclaration,
        DiagnosticCode::VariableNotDefined,
        DiagnosticCode::SubOrFunctionNotDefined,
        DiagnosticCode::AmbiguousName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::DuplicateDeclaration => "duplicate-declaration",
            DiagnosticCode::ShadowedDeclaration => "shadowed-declaration",
            DiagnosticCode::UnusedDeclaration => "unused-declaration",
            DiagnosticCode::VariableNotDefined => "variable-not-defined",
            DiagnosticCode::SubOrFunctionNotDefined => "sub-or-function-not-defined",
            DiagnosticCode::AmbiguousName => "ambiguous-name",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_str() == id)
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedInformation {
    pub message: String,
    pub uri: String,
    pub range: TextRange,
}

impl RelatedInformation {
    pub fn new(uri: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: "Related Information".to_string(),
            uri: uri.into(),
            range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub range: TextRange,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<DiagnosticTag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<RelatedInformation>,
}

impl Diagnostic {
    pub fn new(
        code: DiagnosticCode,
        severity: Severity,
        message: impl Into<String>,
        range: TextRange,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            range,
            severity,
            tags: Vec::new(),
            related_information: Vec::new(),
        }
    }

    pub fn duplicate_declaration(range: TextRange, name: &str) -> Self {
        Self::new(
            DiagnosticCode::DuplicateDeclaration,
            Severity::Error,
            format!("Duplicate declaration in current scope: '{name}'."),
            range,
        )
    }

    pub fn shadowed_declaration(range: TextRange, name: &str) -> Self {
        Self::new(
            DiagnosticCode::ShadowedDeclaration,
            Severity::Warning,
            format!("Declaration of '{name}' shadows a declaration in an outer scope."),
            range,
        )
    }

    pub fn unused_declaration(range: TextRange, name: &str) -> Self {
        Self::new(
            DiagnosticCode::UnusedDeclaration,
            Severity::Hint,
            format!("{name} is declared but its value is never read."),
            range,
        )
        .with_tag(DiagnosticTag::Unnecessary)
    }

    pub fn sub_or_function_not_defined(range: TextRange, name: &str) -> Self {
        Self::new(
            DiagnosticCode::SubOrFunctionNotDefined,
            Severity::Error,
            format!("Sub or Function not defined: '{name}'."),
            range,
        )
    }

    pub fn variable_not_defined(range: TextRange, name: &str, severity: Severity) -> Self {
        Self::new(
            DiagnosticCode::VariableNotDefined,
            severity,
            format!("Variable not defined: '{name}'."),
            range,
        )
    }

    pub fn ambiguous_name(range: TextRange, name: &str) -> Self {
        Self::new(
            DiagnosticCode::AmbiguousName,
            Severity::Error,
            format!("Ambiguous name detected: '{name}'."),
            range,
        )
    }

    #[must_use]
    pub fn with_tag(mut self, tag: DiagnosticTag) -> Self {
        self.tags.push(tag);
        self
    }

    #[must_use]
    pub fn with_related(mut self, related: RelatedInformation) -> Self {
        self.related_information.push(related);
        self
    }

    /// Structural identity used for de-duplication.
    pub fn same_as(&self, other: &Diagnostic) -> bool {
        self.code == other.code && self.message == other.message && self.range == other.range
    }
}

/// Appends `diagnostic` unless a structurally equal one is already present.
pub fn push_unique(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) -> bool {
    if diagnostics.iter().any(|d| d.same_as(&diagnostic)) {
        return false;
    }
    diagnostics.push(diagnostic);
    true
}

/// Per-file diagnostic report handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishDiagnostics {
    pub uri: String,
    pub version: i32,
    pub diagnostics: Vec<Diagnostic>,
}
