//! vbscope core
//!
//! Cross-file semantic analysis for VBA projects: a scope graph built from
//! front-end syntax elements, name resolution between references and
//! declarations, declaration diagnostics and position queries.

pub mod config;
pub mod diagnostic;
pub mod project;
pub mod semantic;
pub mod syntax;

pub use config::{Config, load_config_or_default, load_config_or_default_with_warnings};
pub use diagnostic::{Diagnostic, DiagnosticCode, PublishDiagnostics, Severity};
pub use project::{Document, DocumentKind, Project, ProjectError};
pub use semantic::{GraphError, Location, LocationLink, ScopeGraph, ScopeId, ScopeKind};
pub use syntax::{Position, SyntaxElement, SyntaxTree, TextRange};
pub use tokio_util::sync::CancellationToken;
