//! Position queries for rename and go-to-definition

use indexmap::IndexSet;
use serde::Serialize;
use tracing::warn;

use super::GraphError;
use super::scope::{MapKind, ScopeGraph, ScopeId, ScopeKind, ScopeNode};
use crate::syntax::{Position, TextRange};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub uri: String,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationLink {
    pub target_uri: String,
    pub target_range: TextRange,
    pub target_selection_range: TextRange,
    pub origin_selection_range: Option<TextRange>,
}

/// Range that names the node in source. Dotted references are named by
/// their last segment.
fn name_range(node: &ScopeNode) -> Option<TextRange> {
    node.member_access
        .last()
        .map(|segment| segment.range)
        .or_else(|| node.identifier_range())
}

impl ScopeGraph {
    /// Nodes whose identifier contains `position`, searched below `roots`.
    ///
    /// A node whose identifier misses but whose element range contains the
    /// position is searched in turn.
    pub fn items_at_position(&self, position: Position, roots: &[ScopeId]) -> Vec<ScopeId> {
        let mut results = IndexSet::new();
        let mut visited: IndexSet<ScopeId> = roots.iter().copied().collect();
        let mut stack = roots.to_vec();

        while let Some(scope) = stack.pop() {
            for item in self.get(scope).maps.ids(&MapKind::TRAVERSED) {
                let node = self.get(item);
                if node.invalidated {
                    continue;
                }

                let in_identifier = node
                    .identifier_range()
                    .is_some_and(|range| range.contains(position));
                let in_element = node
                    .element_range()
                    .is_some_and(|range| range.contains(position));

                if in_identifier {
                    results.insert(item);
                } else if in_element && visited.insert(item) {
                    stack.push(item);
                }
            }
        }

        results.into_iter().collect()
    }

    /// Every node that must be renamed together with the one at `position`.
    pub fn rename_items(&self, uri: &str, position: Position) -> Result<Vec<ScopeId>, GraphError> {
        let Some(module) = self.find_module_by_uri(uri)? else {
            return Ok(Vec::new());
        };

        let at_position = self.items_at_position(position, &[module]);
        if at_position.is_empty() {
            warn!(uri, line = position.line, character = position.character, "Nothing to rename");
            return Ok(Vec::new());
        }

        let mut declarations: IndexSet<ScopeId> = IndexSet::new();
        for item in at_position {
            let declaration = self.get(item).link.unwrap_or(item);
            declarations.extend(self.property_accessors(declaration));
        }

        let mut items = Vec::new();
        let mut seen: IndexSet<(Option<&str>, Option<TextRange>)> = IndexSet::new();
        for declaration in declarations {
            let node = self.get(declaration);
            for id in std::iter::once(declaration).chain(node.backlinks.iter().copied()) {
                let candidate = self.get(id);
                if seen.insert((candidate.uri.as_deref(), name_range(candidate))) {
                    items.push(id);
                }
            }
        }

        Ok(items)
    }

    pub fn rename_locations(
        &self,
        uri: &str,
        position: Position,
    ) -> Result<Vec<Location>, GraphError> {
        Ok(self
            .rename_items(uri, position)?
            .into_iter()
            .filter_map(|id| {
                let node = self.get(id);
                Some(Location {
                    uri: node.uri.clone()?,
                    range: name_range(node)?,
                })
            })
            .collect())
    }

    /// Declaration locations for the linked references at `position`.
    pub fn declaration_links(
        &self,
        uri: &str,
        position: Position,
    ) -> Result<Vec<LocationLink>, GraphError> {
        let Some(module) = self.find_module_by_uri(uri)? else {
            return Ok(Vec::new());
        };

        Ok(self
            .items_at_position(position, &[module])
            .into_iter()
            .filter_map(|id| self.location_link(id))
            .collect())
    }

    pub fn location_link(&self, id: ScopeId) -> Option<LocationLink> {
        let node = self.get(id);
        let target = self.get(node.link?);

        Some(LocationLink {
            target_uri: target.uri.clone()?,
            target_range: target.element_range()?,
            target_selection_range: target.identifier_range()?,
            origin_selection_range: node.element_range(),
        })
    }

    /// A property expands to every accessor sharing its name; anything else
    /// stands alone.
    fn property_accessors(&self, id: ScopeId) -> Vec<ScopeId> {
        let node = self.get(id);
        let Some(parent) = node.parent.filter(|_| node.kind == ScopeKind::Property) else {
            return vec![id];
        };

        let maps = &self.get(parent).maps;
        let accessors: Vec<ScopeId> = maps.named(&MapKind::ACCESSORS, &node.name).collect();
        if accessors.is_empty() {
            vec![id]
        } else {
            accessors
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{AssignmentKind, ScopeEntry};
    use crate::syntax::Identifier;

    const URI: &str = "file:///project/Module1.bas";

    fn at(kind: ScopeKind, name: &str, element: TextRange, identifier: TextRange) -> ScopeEntry {
        ScopeEntry::new(kind, element)
            .with_identifier(name, identifier)
            .with_diagnostics()
    }

    fn line(line: u32, start: u32, end: u32) -> TextRange {
        TextRange::from_coords(line, start, line, end)
    }

    /// Module1:
    /// 0  Attribute VB_Name = "Module1"
    /// 1  Public Sub Foo()
    /// 2      Dim x
    /// 3      x = 1
    /// 4      Debug.Print x
    /// 5  End Sub
    /// 6  Public Sub Bar()
    /// 7      Foo
    /// 8  End Sub
    fn sample() -> (ScopeGraph, ScopeId, ScopeId) {
        let mut graph = ScopeGraph::new();
        let root = graph.root();
        let module = graph.register(
            at(ScopeKind::Module, "Module1", TextRange::from_coords(0, 0, 9, 0), line(0, 20, 27))
                .with_uri(URI),
            root,
        );
        let foo = graph.register(
            at(ScopeKind::Subroutine, "Foo", TextRange::from_coords(1, 0, 5, 7), line(1, 11, 14)),
            module,
        );
        graph.register(at(ScopeKind::Variable, "x", line(2, 4, 9), line(2, 8, 9)), foo);
        graph.register(
            at(ScopeKind::Reference, "x", line(3, 4, 5), line(3, 4, 5))
                .with_assignment(AssignmentKind::LET),
            foo,
        );
        graph.register(
            at(ScopeKind::Reference, "x", line(4, 16, 17), line(4, 16, 17))
                .with_assignment(AssignmentKind::GET),
            foo,
        );
        let bar = graph.register(
            at(ScopeKind::Subroutine, "Bar", TextRange::from_coords(6, 0, 8, 7), line(6, 11, 14)),
            module,
        );
        graph.register(
            at(ScopeKind::Reference, "Foo", line(7, 4, 7), line(7, 4, 7))
                .with_assignment(AssignmentKind::CALL),
            bar,
        );
        graph.build(root);

        (graph, module, foo)
    }

    #[test]
    fn finds_identifier_under_position() {
        let (graph, module, foo) = sample();

        assert_eq!(graph.items_at_position(Position::new(1, 12), &[module]), vec![foo]);
        assert!(graph.items_at_position(Position::new(1, 2), &[module]).is_empty());
    }

    #[test]
    fn finds_nested_identifier() {
        let (graph, module, foo) = sample();

        let found = graph.items_at_position(Position::new(2, 8), &[module]);

        assert_eq!(found.len(), 1);
        assert_eq!(graph.get(found[0]).kind, ScopeKind::Variable);
        assert_eq!(graph.get(found[0]).parent, Some(foo));
    }

    #[test]
    fn rename_from_reference_collects_declaration_and_usages() {
        let (graph, _, _) = sample();

        let locations = graph.rename_locations(URI, Position::new(4, 16)).unwrap();

        let ranges: Vec<TextRange> = locations.iter().map(|l| l.range).collect();
        assert_eq!(ranges, vec![line(2, 8, 9), line(3, 4, 5), line(4, 16, 17)]);
        assert!(locations.iter().all(|l| l.uri == URI));
    }

    #[test]
    fn rename_from_declaration_collects_call_sites() {
        let (graph, _, _) = sample();

        let locations = graph.rename_locations(URI, Position::new(1, 13)).unwrap();

        let ranges: Vec<TextRange> = locations.iter().map(|l| l.range).collect();
        assert_eq!(ranges, vec![line(1, 11, 14), line(7, 4, 7)]);
    }

    #[test]
    fn rename_at_empty_position_is_empty() {
        let (graph, _, _) = sample();

        assert!(graph.rename_locations(URI, Position::new(5, 0)).unwrap().is_empty());
        assert!(graph
            .rename_locations("file:///project/Other.bas", Position::new(1, 12))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn rename_property_includes_every_accessor() {
        let mut graph = ScopeGraph::new();
        let root = graph.root();
        let class = graph.register(
            at(ScopeKind::Class, "Widget", TextRange::from_coords(0, 0, 20, 0), line(0, 0, 6))
                .with_uri("file:///project/Widget.cls"),
            root,
        );
        graph.register(
            at(ScopeKind::Property, "Size", TextRange::from_coords(1, 0, 3, 12), line(1, 20, 24))
                .with_assignment(AssignmentKind::GET),
            class,
        );
        graph.register(
            at(ScopeKind::Property, "Size", TextRange::from_coords(4, 0, 6, 12), line(4, 20, 24))
                .with_assignment(AssignmentKind::LET),
            class,
        );
        graph.build(root);

        let locations = graph
            .rename_locations("file:///project/Widget.cls", Position::new(1, 21))
            .unwrap();

        let ranges: Vec<TextRange> = locations.iter().map(|l| l.range).collect();
        assert_eq!(ranges, vec![line(1, 20, 24), line(4, 20, 24)]);
    }

    #[test]
    fn rename_dotted_reference_uses_last_segment() {
        let mut graph = ScopeGraph::new();
        let root = graph.root();
        let m1 = graph.register(
            at(ScopeKind::Module, "Module1", TextRange::from_coords(0, 0, 5, 0), line(0, 20, 27))
                .with_uri(URI),
            root,
        );
        graph.register(
            at(ScopeKind::Subroutine, "Foo", TextRange::from_coords(1, 0, 2, 7), line(1, 11, 14)),
            m1,
        );
        let m2 = graph.register(
            at(ScopeKind::Module, "Module2", TextRange::from_coords(0, 0, 5, 0), line(0, 20, 27))
                .with_uri("file:///project/Module2.bas"),
            root,
        );
        graph.register(
            at(ScopeKind::Reference, "Module1.Foo", line(3, 4, 15), line(3, 4, 15))
                .with_assignment(AssignmentKind::CALL)
                .with_member_access(vec![
                    Identifier::new("Module1", line(3, 4, 11)),
                    Identifier::new("Foo", line(3, 12, 15)),
                ]),
            m2,
        );
        graph.build(root);

        let locations = graph.rename_locations(URI, Position::new(1, 12)).unwrap();

        assert_eq!(
            locations,
            vec![
                Location { uri: URI.to_string(), range: line(1, 11, 14) },
                Location {
                    uri: "file:///project/Module2.bas".to_string(),
                    range: line(3, 12, 15)
                },
            ]
        );
    }

    #[test]
    fn definition_links_reference_to_declaration() {
        let (graph, _, _) = sample();

        let links = graph.declaration_links(URI, Position::new(7, 5)).unwrap();

        assert_eq!(
            links,
            vec![LocationLink {
                target_uri: URI.to_string(),
                target_range: TextRange::from_coords(1, 0, 5, 7),
                target_selection_range: line(1, 11, 14),
                origin_selection_range: Some(line(7, 4, 7)),
            }]
        );
    }

    #[test]
    fn definition_on_declaration_is_empty() {
        let (graph, _, _) = sample();

        assert!(graph.declaration_links(URI, Position::new(1, 12)).unwrap().is_empty());
    }
}
