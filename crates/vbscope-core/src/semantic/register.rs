//! Registration of lowered syntax elements into the scope graph

use indexmap::IndexSet;
use tracing::{debug, warn};

use super::scope::{
    AssignmentKind, ElementInfo, MapKind, ScopeGraph, ScopeId, ScopeKind, ScopeMaps, ScopeNode,
    UNKNOWN_ELEMENT, UNKNOWN_MODULE,
};
use crate::syntax::{Identifier, SyntaxElement, TextRange};

/// A syntax element lowered to what the graph needs from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeEntry {
    pub kind: ScopeKind,
    pub assignment: AssignmentKind,
    pub declared_public: Option<bool>,
    pub option_explicit: bool,
    pub type_name: Option<String>,
    pub member_access: Vec<Identifier>,
    pub element: ElementInfo,
    pub uri: Option<String>,
}

impl ScopeEntry {
    pub fn new(kind: ScopeKind, range: TextRange) -> Self {
        Self {
            kind,
            assignment: AssignmentKind::empty(),
            declared_public: None,
            option_explicit: false,
            type_name: None,
            member_access: Vec::new(),
            element: ElementInfo::new(range),
            uri: None,
        }
    }

    /// Lowers an element that takes part in scoping. Returns `None` otherwise.
    pub fn from_element(element: &SyntaxElement, uri: &str) -> Option<Self> {
        let scope = element.scope.as_ref()?;

        Some(Self {
            kind: scope.kind,
            assignment: scope.assignment,
            declared_public: scope.declared_public,
            option_explicit: scope.option_explicit,
            type_name: scope.type_name.clone(),
            member_access: scope.member_access.clone(),
            element: ElementInfo {
                range: element.range,
                identifier: element.identifier.clone(),
                diagnostics: element.has_diagnostics().then(Vec::new),
            },
            uri: Some(uri.to_string()),
        })
    }

    pub fn with_identifier(mut self, name: impl Into<String>, range: TextRange) -> Self {
        self.element.identifier = Some(Identifier::new(name, range));
        self
    }

    pub fn with_assignment(mut self, assignment: AssignmentKind) -> Self {
        self.assignment = assignment;
        self
    }

    pub fn with_visibility(mut self, is_public: bool) -> Self {
        self.declared_public = Some(is_public);
        self
    }

    pub fn with_option_explicit(mut self) -> Self {
        self.option_explicit = true;
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_member_access(mut self, segments: Vec<Identifier>) -> Self {
        self.member_access = segments;
        self
    }

    pub fn with_diagnostics(mut self) -> Self {
        self.element.diagnostics.get_or_insert_with(Vec::new);
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn name(&self) -> &str {
        match &self.element.identifier {
            Some(identifier) => &identifier.name,
            None if self.kind.is_module() => UNKNOWN_MODULE,
            None => UNKNOWN_ELEMENT,
        }
    }
}

/// Accessors a declaration provides when the front-end left them unset.
fn effective_assignment(kind: ScopeKind, assignment: AssignmentKind) -> AssignmentKind {
    match kind {
        ScopeKind::Variable | ScopeKind::Parameter if assignment == AssignmentKind::CONST => {
            AssignmentKind::GET | AssignmentKind::CONST
        }
        ScopeKind::Variable | ScopeKind::Parameter if assignment.is_empty() => {
            AssignmentKind::GET | AssignmentKind::LET | AssignmentKind::SET
        }
        ScopeKind::Property | ScopeKind::Reference if assignment.is_empty() => AssignmentKind::GET,
        _ => assignment,
    }
}

fn visibility(kind: ScopeKind, parent_kind: ScopeKind, declared_public: Option<bool>) -> bool {
    match (kind, parent_kind) {
        (ScopeKind::Reference, _) => false,
        (_, ScopeKind::Project) => true,
        (_, ScopeKind::Module | ScopeKind::Class) => {
            declared_public.unwrap_or(kind != ScopeKind::Variable)
        }
        _ => false,
    }
}

impl ScopeGraph {
    /// Registers `entry` under `current` and returns the new current scope.
    pub fn register(&mut self, entry: ScopeEntry, current: ScopeId) -> ScopeId {
        let name = entry.name().to_string();
        let ScopeEntry {
            kind,
            assignment,
            declared_public,
            option_explicit,
            type_name,
            member_access,
            element,
            uri,
        } = entry;

        let parent = self.get(current);
        let parent_kind = parent.kind;
        let is_public = visibility(kind, parent_kind, declared_public);
        let assignment = effective_assignment(kind, assignment);
        let uri = uri.or_else(|| parent.uri.clone());
        let option_explicit = option_explicit || parent.option_explicit;

        let mut invalidated = parent.invalidated;
        if kind.is_module() && name == UNKNOWN_MODULE {
            warn!(uri = uri.as_deref().unwrap_or_default(), "Module has no name, invalidating");
            invalidated = true;
        }

        let id = self.alloc(|id| ScopeNode {
            id,
            kind,
            assignment,
            name: name.clone(),
            is_public,
            element: Some(element),
            uri,
            parent: Some(current),
            maps: ScopeMaps::default(),
            link: None,
            backlinks: IndexSet::new(),
            option_explicit,
            type_name,
            member_access,
            dirty: true,
            invalidated,
        });

        let chain: Vec<ScopeId> = self.ancestors(current).map(|node| node.id).collect();
        for ancestor in chain {
            self.get_mut(ancestor).dirty = true;
        }

        debug!(
            visibility = if is_public { "public" } else { "private" },
            kind = %kind,
            assignment = %assignment,
            depth = self.depth(current),
            "Registering {name}"
        );

        if kind == ScopeKind::Reference {
            self.get_mut(current).maps.insert(MapKind::References, &name, id);
            return current;
        }

        // Public members of standard modules are visible unqualified project-wide.
        let root = self.root();
        if is_public && parent_kind == ScopeKind::Module {
            self.get_mut(root).maps.insert(MapKind::Implicit, &name, id);
        }

        let maps = &mut self.get_mut(current).maps;
        match kind {
            ScopeKind::Function => {
                maps.insert(MapKind::Functions, &name, id);
                id
            }
            ScopeKind::Subroutine => {
                maps.insert(MapKind::Subroutines, &name, id);
                id
            }
            ScopeKind::Type => {
                maps.insert(MapKind::Types, &name, id);
                id
            }
            ScopeKind::Property | ScopeKind::Variable | ScopeKind::Parameter => {
                if kind == ScopeKind::Parameter {
                    maps.insert(MapKind::Parameters, &name, id);
                }
                if assignment.contains(AssignmentKind::GET) {
                    maps.insert(MapKind::Getters, &name, id);
                }
                if assignment.contains(AssignmentKind::LET) {
                    maps.insert(MapKind::Letters, &name, id);
                }
                if assignment.contains(AssignmentKind::SET) {
                    maps.insert(MapKind::Setters, &name, id);
                }
                if kind == ScopeKind::Property {
                    id
                } else {
                    current
                }
            }
            ScopeKind::Module | ScopeKind::Class => {
                maps.insert(MapKind::Modules, &name, id);
                id
            }
            ScopeKind::Project | ScopeKind::Reference => id,
        }
    }
}
