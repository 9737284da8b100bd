//! Declaration checks run during and after the build pass

use indexmap::{IndexMap, IndexSet};

use super::scope::{MapKind, ScopeGraph, ScopeId, ScopeKind};
use crate::diagnostic::Diagnostic;

impl ScopeGraph {
    /// Flags clashing declarations among the children of `scope`.
    ///
    /// Types, modules, functions and subroutines share one namespace. Each
    /// accessor map is its own namespace that also clashes with that shared
    /// one, so a getter and a letter of one property coexist but a property
    /// and a function of the same name do not.
    pub(crate) fn check_duplicates(&mut self, scope: ScopeId) {
        let maps = &self.get(scope).maps;

        let mut flat: IndexMap<&str, Vec<ScopeId>> = IndexMap::new();
        for kind in MapKind::EXPLICIT {
            for (name, ids) in maps.map(kind) {
                flat.entry(name.as_str()).or_default().extend(ids);
            }
        }

        let mut flagged: Vec<(ScopeId, String)> = Vec::new();
        let mut diagnosed: IndexSet<&str> = IndexSet::new();
        for (&name, ids) in &flat {
            if ids.len() > 1 {
                flagged.extend(ids.iter().map(|&id| (id, name.to_string())));
                diagnosed.insert(name);
            }
        }

        for kind in MapKind::ACCESSORS {
            for (name, ids) in maps.map(kind) {
                let clashing = flat.get(name.as_str()).map(Vec::as_slice).unwrap_or(&[]);
                if ids.len() + clashing.len() <= 1 {
                    continue;
                }

                flagged.extend(ids.iter().map(|&id| (id, name.clone())));
                if !clashing.is_empty() && diagnosed.insert(name.as_str()) {
                    flagged.extend(clashing.iter().map(|&id| (id, name.clone())));
                }
            }
        }

        for (id, name) in flagged {
            let Some(range) = self.get(id).identifier_range() else {
                continue;
            };
            self.get_mut(id)
                .push_diagnostic(Diagnostic::duplicate_declaration(range, &name));
        }
    }

    /// Flags a declaration hiding an accessible one from an outer scope.
    pub(crate) fn check_shadows(&mut self, id: ScopeId) {
        // The project and its modules have no grandparent to look into.
        let Some(outer) = self.ancestors(id).nth(2).map(|node| node.id) else {
            return;
        };

        let node = self.get(id);
        let shadowing: Vec<ScopeId> = self
            .accessible_scopes(&node.name, outer)
            .into_iter()
            .filter(|&item| item != id && self.get(item).parent != node.parent)
            .collect();

        if shadowing.is_empty() {
            return;
        }
        let Some(range) = node.identifier_range() else {
            return;
        };

        let diagnostic =
            self.with_related(Diagnostic::shadowed_declaration(range, &node.name), &shadowing);
        self.get_mut(id).push_diagnostic(diagnostic);
    }

    /// Declarations named `name` visible from `scope` and everything above it.
    ///
    /// Private declarations count at each level walked. At project level the
    /// public members of every module count as well.
    pub fn accessible_scopes(&self, name: &str, scope: ScopeId) -> Vec<ScopeId> {
        let mut results = IndexSet::new();

        for node in self.ancestors(scope) {
            for item in node.maps.named(&MapKind::DECLARATIONS, name) {
                let item_node = self.get(item);
                if !item_node.is_public && !item_node.invalidated {
                    results.insert(item);
                }
            }

            if node.kind == ScopeKind::Project {
                for module in node.maps.ids(&[MapKind::Modules]) {
                    for item in self.get(module).maps.named(&MapKind::DECLARATIONS, name) {
                        let item_node = self.get(item);
                        if item_node.is_public && !item_node.invalidated {
                            results.insert(item);
                        }
                    }
                }
            }
        }

        results.into_iter().collect()
    }

    /// Flags private declarations that nothing links to, from `id` down.
    pub fn resolve_unused(&mut self, id: ScopeId) {
        let node = self.get(id);
        if node.invalidated {
            return;
        }
        let kind = node.kind;

        let is_used = matches!(
            kind,
            ScopeKind::Project | ScopeKind::Module | ScopeKind::Class | ScopeKind::Reference
        ) || node.is_public
            || !node.backlinks.is_empty();

        let unused = node
            .element
            .as_ref()
            .and_then(|element| element.identifier.as_ref())
            .filter(|_| !is_used)
            .map(|identifier| Diagnostic::unused_declaration(identifier.range, &identifier.name));
        if let Some(diagnostic) = unused {
            self.get_mut(id).push_diagnostic(diagnostic);
        }

        if !kind.has_scope_body() {
            return;
        }

        for child in self.child_ids(id, &MapKind::DECLARATIONS) {
            self.resolve_unused(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;
    use crate::semantic::{AssignmentKind, ScopeEntry};
    use crate::syntax::TextRange;

    fn named(kind: ScopeKind, name: &str, line: u32) -> ScopeEntry {
        let range = TextRange::from_coords(line, 4, line, 4 + name.len() as u32);
        ScopeEntry::new(kind, range)
            .with_identifier(name, range)
            .with_diagnostics()
    }

    fn module(graph: &mut ScopeGraph, name: &str) -> ScopeId {
        let root = graph.root();
        graph.register(
            named(ScopeKind::Module, name, 0).with_uri(format!("file:///project/{name}.bas")),
            root,
        )
    }

    fn codes(graph: &ScopeGraph, id: ScopeId) -> Vec<DiagnosticCode> {
        graph.get(id).diagnostics().iter().map(|d| d.code).collect()
    }

    #[test]
    fn same_named_procedures_are_duplicates() {
        let mut graph = ScopeGraph::new();
        let m1 = module(&mut graph, "Module1");
        let first = graph.register(named(ScopeKind::Subroutine, "Foo", 1), m1);
        let second = graph.register(named(ScopeKind::Function, "Foo", 4), m1);
        let other = graph.register(named(ScopeKind::Subroutine, "Bar", 7), m1);

        graph.check_duplicates(m1);

        assert_eq!(codes(&graph, first), vec![DiagnosticCode::DuplicateDeclaration]);
        assert_eq!(codes(&graph, second), vec![DiagnosticCode::DuplicateDeclaration]);
        assert!(codes(&graph, other).is_empty());
        assert_eq!(
            graph.get(first).diagnostics()[0].range,
            TextRange::from_coords(1, 4, 1, 7)
        );
    }

    #[test]
    fn property_accessors_do_not_clash_with_each_other() {
        let mut graph = ScopeGraph::new();
        let m1 = module(&mut graph, "Module1");
        let getter = graph.register(
            named(ScopeKind::Property, "Name", 1).with_assignment(AssignmentKind::GET),
            m1,
        );
        let letter = graph.register(
            named(ScopeKind::Property, "Name", 4).with_assignment(AssignmentKind::LET),
            m1,
        );

        graph.check_duplicates(m1);

        assert!(codes(&graph, getter).is_empty());
        assert!(codes(&graph, letter).is_empty());
    }

    #[test]
    fn property_clashes_with_function_of_same_name() {
        let mut graph = ScopeGraph::new();
        let m1 = module(&mut graph, "Module1");
        let getter = graph.register(
            named(ScopeKind::Property, "Name", 1).with_assignment(AssignmentKind::GET),
            m1,
        );
        let letter = graph.register(
            named(ScopeKind::Property, "Name", 4).with_assignment(AssignmentKind::LET),
            m1,
        );
        let function = graph.register(named(ScopeKind::Function, "Name", 7), m1);

        graph.check_duplicates(m1);

        assert_eq!(codes(&graph, getter), vec![DiagnosticCode::DuplicateDeclaration]);
        assert_eq!(codes(&graph, letter), vec![DiagnosticCode::DuplicateDeclaration]);
        assert_eq!(codes(&graph, function), vec![DiagnosticCode::DuplicateDeclaration]);
    }

    #[test]
    fn repeated_variables_are_flagged_once_each() {
        let mut graph = ScopeGraph::new();
        let m1 = module(&mut graph, "Module1");
        let sub = graph.register(named(ScopeKind::Subroutine, "Foo", 1), m1);
        graph.register(named(ScopeKind::Parameter, "x", 1), sub);
        graph.register(named(ScopeKind::Variable, "x", 2), sub);

        graph.check_duplicates(sub);

        let xs = graph.get(sub).maps.get(MapKind::Getters, "x").to_vec();
        assert_eq!(xs.len(), 2);
        for x in xs {
            assert_eq!(codes(&graph, x), vec![DiagnosticCode::DuplicateDeclaration]);
        }
    }

    #[test]
    fn local_variable_shadows_module_variable() {
        let mut graph = ScopeGraph::new();
        let m1 = module(&mut graph, "Module1");
        graph.register(named(ScopeKind::Variable, "count", 1), m1);
        let sub = graph.register(named(ScopeKind::Subroutine, "Foo", 3), m1);
        graph.register(named(ScopeKind::Variable, "count", 4), sub);
        let local = graph.get(sub).maps.get(MapKind::Getters, "count")[0];

        graph.check_shadows(local);

        let diagnostics = graph.get(local).diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::ShadowedDeclaration);
        assert_eq!(diagnostics[0].related_information.len(), 1);
    }

    #[test]
    fn local_variable_shadows_public_member_of_other_module() {
        let mut graph = ScopeGraph::new();
        let m1 = module(&mut graph, "Module1");
        let m2 = module(&mut graph, "Module2");
        graph.register(named(ScopeKind::Function, "Total", 1), m1);
        let sub = graph.register(named(ScopeKind::Subroutine, "Foo", 1), m2);
        graph.register(named(ScopeKind::Variable, "Total", 2), sub);
        let local = graph.get(sub).maps.get(MapKind::Getters, "Total")[0];

        graph.check_shadows(local);

        assert_eq!(codes(&graph, local), vec![DiagnosticCode::ShadowedDeclaration]);
    }

    #[test]
    fn public_procedures_in_other_modules_shadow_each_other() {
        let mut graph = ScopeGraph::new();
        let m1 = module(&mut graph, "Module1");
        let m2 = module(&mut graph, "Module2");
        let first = graph.register(named(ScopeKind::Subroutine, "Foo", 1), m1);
        let second = graph.register(named(ScopeKind::Subroutine, "Foo", 1), m2);

        graph.check_shadows(first);

        let diagnostics = graph.get(first).diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::ShadowedDeclaration);
        assert_eq!(diagnostics[0].related_information.len(), 1);
        assert_eq!(
            diagnostics[0].related_information[0].range,
            graph.get(second).element_range().unwrap()
        );
    }

    #[test]
    fn modules_are_never_shadow_checked() {
        let mut graph = ScopeGraph::new();
        let m1 = module(&mut graph, "Module1");
        module(&mut graph, "Module2");
        graph.register(named(ScopeKind::Subroutine, "Module1", 1), m1);

        graph.check_shadows(m1);

        assert!(codes(&graph, m1).is_empty());
    }

    #[test]
    fn accessible_scopes_hide_private_members_of_other_modules() {
        let mut graph = ScopeGraph::new();
        let m1 = module(&mut graph, "Module1");
        let m2 = module(&mut graph, "Module2");
        graph.register(named(ScopeKind::Variable, "x", 1), m1);
        let private_x = graph.get(m1).maps.get(MapKind::Getters, "x")[0];
        graph.register(named(ScopeKind::Variable, "x", 1).with_visibility(true), m2);
        let public_x = graph.get(m2).maps.get(MapKind::Getters, "x")[0];

        let from_m1 = graph.accessible_scopes("x", m1);
        let from_root = graph.accessible_scopes("x", graph.root());

        assert_eq!(from_m1, vec![private_x, public_x]);
        assert_eq!(from_root, vec![public_x]);
    }

    #[test]
    fn unused_private_declarations_are_flagged() {
        let mut graph = ScopeGraph::new();
        let m1 = module(&mut graph, "Module1");
        let sub = graph.register(named(ScopeKind::Subroutine, "Foo", 1), m1);
        let private_sub = graph.register(
            named(ScopeKind::Subroutine, "Helper", 3).with_visibility(false),
            m1,
        );
        graph.register(named(ScopeKind::Variable, "x", 2), sub);
        let x = graph.get(sub).maps.get(MapKind::Getters, "x")[0];

        graph.resolve_unused(graph.root());

        assert!(codes(&graph, m1).is_empty());
        assert!(codes(&graph, sub).is_empty());
        assert_eq!(codes(&graph, private_sub), vec![DiagnosticCode::UnusedDeclaration]);
        assert_eq!(codes(&graph, x), vec![DiagnosticCode::UnusedDeclaration]);
    }

    #[test]
    fn backlinked_declarations_are_used() {
        let mut graph = ScopeGraph::new();
        let m1 = module(&mut graph, "Module1");
        let sub = graph.register(named(ScopeKind::Subroutine, "Foo", 1), m1);
        graph.register(named(ScopeKind::Variable, "x", 2), sub);
        graph.register(
            named(ScopeKind::Reference, "x", 3).with_assignment(AssignmentKind::GET),
            sub,
        );
        let x = graph.get(sub).maps.get(MapKind::Getters, "x")[0];
        let reference = graph.get(sub).maps.get(MapKind::References, "x")[0];
        graph.resolve_links(reference);

        graph.resolve_unused(graph.root());

        assert!(codes(&graph, x).is_empty());
    }
}
