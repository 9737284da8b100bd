//! Name resolution over the scope graph
//!
//! Lookups ascend from the requesting scope toward the project root. At each
//! level explicit declarations win; the level's implicit map is consulted
//! only when nothing explicit matched there.

use indexmap::IndexSet;
use tracing::trace;

use super::scope::{AssignmentKind, MapKind, ScopeGraph, ScopeId, ScopeKind};
use crate::diagnostic::{Diagnostic, RelatedInformation, Severity};
use crate::syntax::TextRange;

/// Outcome of resolving one reference node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Linked(ScopeId),
    Unresolved {
        name: String,
        range: Option<TextRange>,
        assignment: AssignmentKind,
    },
    Ambiguous {
        name: String,
        range: Option<TextRange>,
        candidates: Vec<ScopeId>,
    },
}

impl ScopeGraph {
    pub fn find_declarations(
        &self,
        name: &str,
        assignment: AssignmentKind,
        scope: ScopeId,
    ) -> Vec<ScopeId> {
        for node in self.ancestors(scope) {
            let mut kinds: Vec<MapKind> = MapKind::EXPLICIT.to_vec();
            if assignment.contains(AssignmentKind::GET) {
                kinds.push(MapKind::Getters);
            }
            if assignment.contains(AssignmentKind::SET) {
                kinds.push(MapKind::Setters);
            }
            if assignment.contains(AssignmentKind::LET) {
                kinds.push(MapKind::Letters);
            }

            let explicit = self.live(node.maps.named(&kinds, name));
            if !explicit.is_empty() {
                return explicit;
            }

            let implicit = self.live(node.maps.named(&[MapKind::Implicit], name));
            if !implicit.is_empty() {
                return implicit;
            }
        }

        Vec::new()
    }

    fn live(&self, ids: impl Iterator<Item = ScopeId>) -> Vec<ScopeId> {
        ids.filter(|&id| !self.get(id).invalidated)
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Resolves a reference without touching the graph.
    pub fn resolve(&self, reference: ScopeId) -> Resolution {
        let node = self.get(reference);

        if node.member_access.is_empty() {
            let range = node.identifier_range();
            let found = self.find_declarations(&node.name, node.assignment, reference);
            return match found.len() {
                0 => Resolution::Unresolved {
                    name: node.name.clone(),
                    range,
                    assignment: node.assignment,
                },
                1 => Resolution::Linked(found[0]),
                _ => Resolution::Ambiguous {
                    name: node.name.clone(),
                    range,
                    candidates: found,
                },
            };
        }

        let last = node.member_access.len() - 1;
        let mut search = reference;
        for (i, segment) in node.member_access.iter().enumerate() {
            // Only the terminal segment carries the reference's own usage.
            let assignment = if i < last {
                AssignmentKind::GET
            } else {
                node.assignment
            };

            let mut found = self.find_declarations(&segment.name, assignment, search);
            if found.is_empty() && i > 0 {
                found = self.find_in_declared_type(&segment.name, assignment, search);
            }

            match found.len() {
                0 => {
                    return Resolution::Unresolved {
                        name: segment.name.clone(),
                        range: Some(segment.range),
                        assignment,
                    };
                }
                1 => search = found[0],
                _ => {
                    return Resolution::Ambiguous {
                        name: segment.name.clone(),
                        range: Some(segment.range),
                        candidates: found,
                    };
                }
            }
        }

        Resolution::Linked(search)
    }

    /// Retries a member lookup against the `As` type of `owner`.
    fn find_in_declared_type(
        &self,
        member: &str,
        assignment: AssignmentKind,
        owner: ScopeId,
    ) -> Vec<ScopeId> {
        let Some(type_name) = self.get(owner).type_name.as_deref() else {
            return Vec::new();
        };

        self.find_declarations(type_name, assignment, self.root())
            .first()
            .map(|&declared| self.find_declarations(member, assignment, declared))
            .unwrap_or_default()
    }

    pub(crate) fn link(&mut self, reference: ScopeId, declaration: ScopeId) {
        self.get_mut(reference).link = Some(declaration);
        self.get_mut(declaration).backlinks.insert(reference);
    }

    pub(crate) fn unlink(&mut self, reference: ScopeId) {
        if let Some(previous) = self.get_mut(reference).link.take() {
            self.get_mut(previous).backlinks.shift_remove(&reference);
        }
    }

    /// Re-resolves a reference, replacing its link or reporting why it failed.
    pub(crate) fn resolve_links(&mut self, reference: ScopeId) {
        debug_assert_eq!(self.get(reference).kind, ScopeKind::Reference);
        self.unlink(reference);

        match self.resolve(reference) {
            Resolution::Linked(declaration) => self.link(reference, declaration),
            Resolution::Unresolved {
                name,
                range,
                assignment,
            } => {
                let Some(range) = range else {
                    trace!(name = %name, "Unresolved reference has no range, skipping diagnostic");
                    return;
                };
                let node = self.get(reference);
                let diagnostic = if assignment.contains(AssignmentKind::CALL) {
                    Diagnostic::sub_or_function_not_defined(range, &name)
                } else {
                    let severity = if node.option_explicit {
                        Severity::Error
                    } else {
                        Severity::Hint
                    };
                    Diagnostic::variable_not_defined(range, &name, severity)
                };
                self.get_mut(reference).push_diagnostic(diagnostic);
            }
            Resolution::Ambiguous {
                name,
                range,
                candidates,
            } => {
                let Some(range) = range else {
                    trace!(name = %name, "Ambiguous reference has no range, skipping diagnostic");
                    return;
                };
                let diagnostic = self.with_related(Diagnostic::ambiguous_name(range, &name), &candidates);
                self.get_mut(reference).push_diagnostic(diagnostic);
            }
        }
    }

    /// Adds one related-information entry per item that has a location.
    pub(crate) fn with_related(&self, mut diagnostic: Diagnostic, items: &[ScopeId]) -> Diagnostic {
        for &item in items {
            let node = self.get(item);
            if let (Some(uri), Some(range)) = (node.uri.as_deref(), node.element_range()) {
                diagnostic = diagnostic.with_related(RelatedInformation::new(uri, range));
            }
        }
        diagnostic
    }
}
