//! Project controller
//!
//! A [`Project`] owns the scope graph, the loaded configuration and the set of
//! known documents. Every mutation goes through it, one call at a time; it is
//! the single writer of its graph.

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::diagnostic::{PublishDiagnostics, push_unique};
use crate::semantic::{
    GraphError, Location, LocationLink, ScopeEntry, ScopeGraph, ScopeId, ScopeKind,
};
use crate::syntax::{Position, SyntaxTree, TextRange};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Expected *.cls, *.bas, or *.frm but got '{0}'")]
    UnsupportedDocument(String),

    #[error("Parsing '{0}' was cancelled")]
    Cancelled(String),

    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentKind {
    Class,
    Module,
    Form,
}

impl DocumentKind {
    pub fn from_uri(uri: &str) -> Result<Self, ProjectError> {
        let extension = uri
            .rsplit('/')
            .next()
            .and_then(|file_name| file_name.rsplit_once('.'))
            .map(|(_, extension)| extension.to_ascii_lowercase());

        match extension.as_deref() {
            Some("cls") => Ok(DocumentKind::Class),
            Some("bas") => Ok(DocumentKind::Module),
            Some("frm") => Ok(DocumentKind::Form),
            _ => Err(ProjectError::UnsupportedDocument(uri.to_string())),
        }
    }

    /// Forms are registered like standard modules.
    pub fn scope_kind(self) -> ScopeKind {
        match self {
            DocumentKind::Class => ScopeKind::Class,
            DocumentKind::Module | DocumentKind::Form => ScopeKind::Module,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub uri: String,
    pub name: String,
    pub kind: DocumentKind,
    pub version: i32,
    pub line_count: usize,
    pub is_open: bool,
    pub is_busy: bool,
}

impl Document {
    pub fn new(uri: &str) -> Result<Self, ProjectError> {
        let kind = DocumentKind::from_uri(uri)?;
        let name = uri.rsplit('/').next().unwrap_or(uri).to_string();

        Ok(Self {
            uri: uri.to_string(),
            name,
            kind,
            version: 0,
            line_count: 0,
            is_open: true,
            is_busy: false,
        })
    }
}

pub struct Project {
    graph: ScopeGraph,
    config: Config,
    documents: IndexMap<String, Document>,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Project {
    pub fn new(config: Config) -> Self {
        Self {
            graph: ScopeGraph::new(),
            config,
            documents: IndexMap::new(),
        }
    }

    pub fn graph(&self) -> &ScopeGraph {
        &self.graph
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn document(&self, uri: &str) -> Option<&Document> {
        self.documents.get(uri)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Parses one file's element stream into the graph and rebuilds.
    ///
    /// Cancellation is honoured until the graph is first touched; a cancelled
    /// parse leaves the graph as it was.
    pub fn parse_document(
        &mut self,
        tree: SyntaxTree,
        cancel: &CancellationToken,
    ) -> Result<PublishDiagnostics, ProjectError> {
        let uri = tree.uri.clone();
        let is_new = !self.documents.contains_key(&uri);
        if is_new {
            self.documents.insert(uri.clone(), Document::new(&uri)?);
        }
        if let Some(document) = self.documents.get_mut(&uri) {
            document.version = tree.version;
            document.line_count = tree.line_count;
            document.is_busy = true;
        }

        let result = self.parse_and_build(&tree, cancel);

        if is_new && result.is_err() {
            // The graph rejected a file it never held.
            self.documents.shift_remove(&uri);
        } else if let Some(document) = self.documents.get_mut(&uri) {
            document.is_busy = false;
        }
        result?;

        self.diagnostics(&uri)
    }

    fn parse_and_build(
        &mut self,
        tree: &SyntaxTree,
        cancel: &CancellationToken,
    ) -> Result<(), ProjectError> {
        if cancel.is_cancelled() {
            return Err(ProjectError::Cancelled(tree.uri.clone()));
        }

        let max_lines = self.config.analysis.max_document_lines;
        if tree.line_count > max_lines {
            debug!(uri = %tree.uri, lines = tree.line_count, "Document oversize");
            warn!(uri = %tree.uri, max_lines, "Syntax parsing has been disabled for this document");
            return Ok(());
        }

        let kind = DocumentKind::from_uri(&tree.uri)?;
        let entries = lower(tree, kind, cancel)?;

        info!(uri = %tree.uri, elements = entries.len(), "Parsing document");
        self.graph.invalidate_module(&tree.uri)?;
        let module = self.register_entries(entries);

        let root = self.graph.root();
        let build_scope = if self.graph.get(root).dirty { root } else { module };
        self.graph.clean(root);
        self.graph.build(build_scope);
        self.graph.resolve_unused(build_scope);

        Ok(())
    }

    /// Registers entries in document order. A scope stays open while incoming
    /// elements fall inside its range; the module scope never closes.
    fn register_entries(&mut self, entries: Vec<ScopeEntry>) -> ScopeId {
        let root = self.graph.root();
        let mut open: Vec<(ScopeId, TextRange)> = Vec::new();

        for entry in entries {
            let range = entry.element.range;
            while open.len() > 1 && open.last().is_some_and(|(_, r)| !r.contains_range(&range)) {
                open.pop();
            }

            let current = open.last().map_or(root, |&(id, _)| id);
            let next = self.graph.register(entry, current);
            if next != current {
                open.push((next, range));
            }
        }

        open.first().map_or(root, |&(module, _)| module)
    }

    /// Diagnostics for one document, in registration order.
    pub fn diagnostics(&self, uri: &str) -> Result<PublishDiagnostics, ProjectError> {
        let document = self
            .documents
            .get(uri)
            .ok_or_else(|| ProjectError::UnknownDocument(uri.to_string()))?;

        let mut diagnostics = Vec::new();
        if document.is_open {
            let nodes = self
                .graph
                .nodes()
                .filter(|node| !node.invalidated && node.uri.as_deref() == Some(uri));
            for diagnostic in nodes.flat_map(|node| node.diagnostics()) {
                if self.config.is_disabled(diagnostic.code) {
                    continue;
                }
                let mut diagnostic = diagnostic.clone();
                if let Some(severity) = self.config.severity_override(diagnostic.code) {
                    diagnostic.severity = severity;
                }
                push_unique(&mut diagnostics, diagnostic);
            }
        }

        debug!(uri, count = diagnostics.len(), "Sending diagnostics");
        Ok(PublishDiagnostics {
            uri: uri.to_string(),
            version: document.version,
            diagnostics,
        })
    }

    pub fn open_document(&mut self, uri: &str) -> Result<&Document, ProjectError> {
        if !self.documents.contains_key(uri) {
            self.documents.insert(uri.to_string(), Document::new(uri)?);
        }
        let document = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| ProjectError::UnknownDocument(uri.to_string()))?;
        document.is_open = true;
        Ok(document)
    }

    pub fn close_document(&mut self, uri: &str) -> Result<(), ProjectError> {
        let document = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| ProjectError::UnknownDocument(uri.to_string()))?;
        document.is_open = false;
        Ok(())
    }

    /// Drops a document and everything it declared, then rebuilds.
    pub fn remove_document(&mut self, uri: &str) -> Result<Document, ProjectError> {
        if !self.documents.contains_key(uri) {
            return Err(ProjectError::UnknownDocument(uri.to_string()));
        }

        self.graph.invalidate_module(uri)?;
        let document = self
            .documents
            .shift_remove(uri)
            .ok_or_else(|| ProjectError::UnknownDocument(uri.to_string()))?;
        self.rebuild();
        Ok(document)
    }

    /// Full build from the project root.
    pub fn rebuild(&mut self) {
        let root = self.graph.root();
        self.graph.clean(root);
        self.graph.build(root);
        self.graph.resolve_unused(root);
    }

    pub fn rename(&self, uri: &str, position: Position) -> Result<Vec<Location>, ProjectError> {
        Ok(self.graph.rename_locations(uri, position)?)
    }

    pub fn go_to_definition(
        &self,
        uri: &str,
        position: Position,
    ) -> Result<Vec<LocationLink>, ProjectError> {
        Ok(self.graph.declaration_links(uri, position)?)
    }
}

/// Lowers the element stream. Nothing here touches the graph.
fn lower(
    tree: &SyntaxTree,
    kind: DocumentKind,
    cancel: &CancellationToken,
) -> Result<Vec<ScopeEntry>, ProjectError> {
    let mut entries = Vec::with_capacity(tree.elements.len() + 1);
    for element in &tree.elements {
        if cancel.is_cancelled() {
            return Err(ProjectError::Cancelled(tree.uri.clone()));
        }
        if let Some(entry) = ScopeEntry::from_element(element, &tree.uri) {
            entries.push(entry);
        }
    }

    // Without a module element the document gets an unnamed one, which the
    // graph invalidates on registration.
    if !entries.first().is_some_and(|entry| entry.kind.is_module()) {
        warn!(uri = %tree.uri, "Document has no module element");
        let everything = TextRange::from_coords(0, 0, u32::MAX, u32::MAX);
        entries.insert(
            0,
            ScopeEntry::new(kind.scope_kind(), everything).with_uri(tree.uri.as_str()),
        );
    }

    Ok(entries)
}
