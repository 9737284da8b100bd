//! Scope graph for declarations and references across a project
//!
//! Every declaration, reference and container is a [`ScopeNode`] stored in an
//! arena and addressed by [`ScopeId`]. Parent/child edges form the tree;
//! `link`/`backlinks` are plain handles kept alongside and repaired during the
//! build pass. Nodes are never removed from the arena, only pruned from their
//! parent's child maps once invalidated.

use std::fmt;

use id_arena::{Arena, Id};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::diagnostic::{Diagnostic, push_unique};
use crate::syntax::{Identifier, TextRange};

pub type ScopeId = Id<ScopeNode>;

pub const UNKNOWN_MODULE: &str = "Unknown Module";
pub const UNKNOWN_ELEMENT: &str = "Unknown Element";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    Project,
    Module,
    Class,
    Function,
    Subroutine,
    Property,
    Type,
    Variable,
    Parameter,
    Reference,
}

impl ScopeKind {
    /// Leaf kinds never open a body of their own.
    pub fn has_scope_body(self) -> bool {
        !matches!(
            self,
            ScopeKind::Variable | ScopeKind::Parameter | ScopeKind::Reference
        )
    }

    pub fn is_module(self) -> bool {
        matches!(self, ScopeKind::Module | ScopeKind::Class)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScopeKind::Project => "Project",
            ScopeKind::Module => "Module",
            ScopeKind::Class => "Class",
            ScopeKind::Function => "Function",
            ScopeKind::Subroutine => "Subroutine",
            ScopeKind::Property => "Property",
            ScopeKind::Type => "Type",
            ScopeKind::Variable => "Variable",
            ScopeKind::Parameter => "Parameter",
            ScopeKind::Reference => "Reference",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// How a reference is used or which accessors a declaration provides.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AssignmentKind: u8 {
        const GET = 1 << 0;
        const LET = 1 << 1;
        const SET = 1 << 2;
        const CALL = 1 << 3;
        const CONST = 1 << 4;
    }
}

impl Default for AssignmentKind {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for AssignmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        bitflags::parser::to_writer(self, f)
    }
}

/// Child map categories of a scope node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
    Types,
    Modules,
    Functions,
    Subroutines,
    Getters,
    Letters,
    Setters,
    Parameters,
    References,
    Implicit,
}

impl MapKind {
    pub const EXPLICIT: [MapKind; 4] = [
        MapKind::Types,
        MapKind::Modules,
        MapKind::Functions,
        MapKind::Subroutines,
    ];

    pub const ACCESSORS: [MapKind; 3] = [MapKind::Getters, MapKind::Letters, MapKind::Setters];

    /// Maps holding declarations, in lookup order.
    pub const DECLARATIONS: [MapKind; 7] = [
        MapKind::Types,
        MapKind::Modules,
        MapKind::Functions,
        MapKind::Subroutines,
        MapKind::Getters,
        MapKind::Letters,
        MapKind::Setters,
    ];

    /// Maps walked by the build pass and the position search.
    pub const TRAVERSED: [MapKind; 8] = [
        MapKind::Types,
        MapKind::Modules,
        MapKind::Functions,
        MapKind::Subroutines,
        MapKind::Getters,
        MapKind::Letters,
        MapKind::Setters,
        MapKind::References,
    ];

    pub const ALL: [MapKind; 10] = [
        MapKind::Types,
        MapKind::Modules,
        MapKind::Functions,
        MapKind::Subroutines,
        MapKind::Getters,
        MapKind::Letters,
        MapKind::Setters,
        MapKind::Parameters,
        MapKind::References,
        MapKind::Implicit,
    ];
}

pub type ChildMap = IndexMap<String, Vec<ScopeId>>;

#[derive(Debug, Clone, Default)]
pub struct ScopeMaps {
    types: ChildMap,
    modules: ChildMap,
    functions: ChildMap,
    subroutines: ChildMap,
    getters: ChildMap,
    letters: ChildMap,
    setters: ChildMap,
    parameters: ChildMap,
    references: ChildMap,
    implicit: ChildMap,
}

impl ScopeMaps {
    pub fn map(&self, kind: MapKind) -> &ChildMap {
        match kind {
            MapKind::Types => &self.types,
            MapKind::Modules => &self.modules,
            MapKind::Functions => &self.functions,
            MapKind::Subroutines => &self.subroutines,
            MapKind::Getters => &self.getters,
            MapKind::Letters => &self.letters,
            MapKind::Setters => &self.setters,
            MapKind::Parameters => &self.parameters,
            MapKind::References => &self.references,
            MapKind::Implicit => &self.implicit,
        }
    }

    pub fn map_mut(&mut self, kind: MapKind) -> &mut ChildMap {
        match kind {
            MapKind::Types => &mut self.types,
            MapKind::Modules => &mut self.modules,
            MapKind::Functions => &mut self.functions,
            MapKind::Subroutines => &mut self.subroutines,
            MapKind::Getters => &mut self.getters,
            MapKind::Letters => &mut self.letters,
            MapKind::Setters => &mut self.setters,
            MapKind::Parameters => &mut self.parameters,
            MapKind::References => &mut self.references,
            MapKind::Implicit => &mut self.implicit,
        }
    }

    pub fn insert(&mut self, kind: MapKind, name: &str, id: ScopeId) {
        self.map_mut(kind).entry(name.to_string()).or_default().push(id);
    }

    pub fn get(&self, kind: MapKind, name: &str) -> &[ScopeId] {
        self.map(kind).get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every id stored in the given maps, map by map in insertion order.
    pub fn ids<'a>(&'a self, kinds: &'a [MapKind]) -> impl Iterator<Item = ScopeId> + 'a {
        kinds
            .iter()
            .flat_map(|&kind| self.map(kind).values().flatten().copied())
    }

    /// Ids for `name` across the given maps.
    pub fn named<'a>(
        &'a self,
        kinds: &'a [MapKind],
        name: &'a str,
    ) -> impl Iterator<Item = ScopeId> + 'a {
        kinds
            .iter()
            .flat_map(move |&kind| self.get(kind, name).iter().copied())
    }

    /// Keeps entries accepted by `is_live`, removing names left without entries.
    pub fn retain(&mut self, mut is_live: impl FnMut(ScopeId) -> bool) {
        for kind in MapKind::ALL {
            let map = self.map_mut(kind);
            for ids in map.values_mut() {
                ids.retain(|&id| is_live(id));
            }
            map.retain(|_, ids| !ids.is_empty());
        }
    }
}

/// Snapshot of the syntax element that created a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    pub range: TextRange,
    pub identifier: Option<Identifier>,
    /// Present only when the element carries the diagnostic capability.
    pub diagnostics: Option<Vec<Diagnostic>>,
}

impl ElementInfo {
    pub fn new(range: TextRange) -> Self {
        Self {
            range,
            identifier: None,
            diagnostics: None,
        }
    }

    pub fn identifier_range(&self) -> Option<TextRange> {
        self.identifier.as_ref().map(|ident| ident.range)
    }
}

#[derive(Debug)]
pub struct ScopeNode {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub assignment: AssignmentKind,
    pub name: String,
    pub is_public: bool,
    pub element: Option<ElementInfo>,
    pub uri: Option<String>,
    pub parent: Option<ScopeId>,
    pub maps: ScopeMaps,
    pub link: Option<ScopeId>,
    pub backlinks: IndexSet<ScopeId>,
    pub option_explicit: bool,
    pub type_name: Option<String>,
    pub member_access: Vec<Identifier>,
    pub dirty: bool,
    pub invalidated: bool,
}

impl ScopeNode {
    pub fn identifier_range(&self) -> Option<TextRange> {
        self.element.as_ref().and_then(ElementInfo::identifier_range)
    }

    pub fn element_range(&self) -> Option<TextRange> {
        self.element.as_ref().map(|element| element.range)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.element
            .as_ref()
            .and_then(|element| element.diagnostics.as_deref())
            .unwrap_or(&[])
    }

    /// Pushes onto this node's sink, anchored wherever the caller chose.
    /// Returns false when the node has no sink or the diagnostic is a duplicate.
    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) -> bool {
        match self.element.as_mut().and_then(|e| e.diagnostics.as_mut()) {
            Some(sink) => push_unique(sink, diagnostic),
            None => false,
        }
    }

    pub(crate) fn clear_diagnostics(&mut self) {
        if let Some(sink) = self.element.as_mut().and_then(|e| e.diagnostics.as_mut()) {
            sink.clear();
        }
    }
}

pub struct ScopeGraph {
    arena: Arena<ScopeNode>,
    root: ScopeId,
}

impl Default for ScopeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeGraph {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc_with_id(|id| ScopeNode {
            id,
            kind: ScopeKind::Project,
            assignment: AssignmentKind::empty(),
            name: "Project".to_string(),
            is_public: true,
            element: None,
            uri: None,
            parent: None,
            maps: ScopeMaps::default(),
            link: None,
            backlinks: IndexSet::new(),
            option_explicit: false,
            type_name: None,
            member_access: Vec::new(),
            dirty: false,
            invalidated: false,
        });

        Self { arena, root }
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn get(&self, id: ScopeId) -> &ScopeNode {
        &self.arena[id]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut ScopeNode {
        &mut self.arena[id]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() <= 1
    }

    /// All nodes in allocation order, invalidated ones included.
    pub fn nodes(&self) -> impl Iterator<Item = &ScopeNode> {
        self.arena.iter().map(|(_, node)| node)
    }

    pub fn parent(&self, id: ScopeId) -> Option<&ScopeNode> {
        self.arena[id].parent.map(|p| &self.arena[p])
    }

    /// Children across the given maps, in map order.
    pub fn children<'a>(
        &'a self,
        id: ScopeId,
        kinds: &'a [MapKind],
    ) -> impl Iterator<Item = &'a ScopeNode> + 'a {
        self.arena[id].maps.ids(kinds).map(|c| &self.arena[c])
    }

    /// Distinct children across the given maps; accessor maps share entries.
    pub(crate) fn child_ids(&self, id: ScopeId, kinds: &[MapKind]) -> Vec<ScopeId> {
        self.arena[id]
            .maps
            .ids(kinds)
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Walks from `id` (inclusive) up to the project root.
    pub fn ancestors(&self, id: ScopeId) -> AncestorIter<'_> {
        AncestorIter {
            graph: self,
            current: Some(id),
        }
    }

    pub fn depth(&self, id: ScopeId) -> usize {
        self.ancestors(id).count() - 1
    }

    /// Enclosing module or class, `id` itself included.
    pub fn module_of(&self, id: ScopeId) -> Option<ScopeId> {
        self.ancestors(id)
            .find(|node| node.kind.is_module())
            .map(|node| node.id)
    }

    pub fn is_descendant_of(&self, id: ScopeId, ancestor: ScopeId) -> bool {
        self.ancestors(id).any(|node| node.id == ancestor)
    }

    pub(crate) fn alloc(&mut self, build: impl FnOnce(ScopeId) -> ScopeNode) -> ScopeId {
        self.arena.alloc_with_id(build)
    }
}

pub struct AncestorIter<'a> {
    graph: &'a ScopeGraph,
    current: Option<ScopeId>,
}

impl<'a> Iterator for AncestorIter<'a> {
    type Item = &'a ScopeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let current_id = self.current?;
        let node = &self.graph.arena[current_id];
        self.current = node.parent;
        Some(node)
    }
}
