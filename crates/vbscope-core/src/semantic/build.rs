//! Build pass: prune, resolve, check

use std::mem;

use tracing::debug;

use super::scope::{MapKind, ScopeGraph, ScopeId, ScopeKind};

impl ScopeGraph {
    /// Rebuilds everything from `id` down.
    ///
    /// Diagnostics previously produced for the subtree are dropped first so
    /// repeated builds yield the same set.
    pub fn build(&mut self, id: ScopeId) {
        debug!(scope = %self.get(id).name, "Building scope graph");
        self.clear_subtree_diagnostics(id);
        self.build_node(id);
    }

    fn build_node(&mut self, id: ScopeId) {
        self.clean(id);

        if self.get(id).invalidated {
            return;
        }

        if self.get(id).kind == ScopeKind::Reference {
            self.resolve_links(id);
        } else {
            self.check_duplicates(id);
            self.check_shadows(id);
        }

        for child in self.child_ids(id, &MapKind::TRAVERSED) {
            self.build_node(child);
        }

        self.get_mut(id).dirty = false;
    }

    /// Prunes invalidated children of `id` and repairs links that pointed at them.
    pub fn clean(&mut self, id: ScopeId) {
        let mut maps = mem::take(&mut self.get_mut(id).maps);
        maps.retain(|child| !self.get(child).invalidated);

        let children: Vec<ScopeId> = maps.ids(&MapKind::ALL).collect();
        self.get_mut(id).maps = maps;

        for child in children {
            let stale_link = self
                .get(child)
                .link
                .filter(|&target| self.get(target).invalidated);
            if stale_link.is_some() {
                self.get_mut(child).link = None;
            }

            let stale: Vec<ScopeId> = self
                .get(child)
                .backlinks
                .iter()
                .copied()
                .filter(|&reference| self.get(reference).invalidated)
                .collect();
            let backlinks = &mut self.get_mut(child).backlinks;
            for reference in stale {
                backlinks.shift_remove(&reference);
            }
        }
    }

    fn clear_subtree_diagnostics(&mut self, id: ScopeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            self.get_mut(current).clear_diagnostics();
            stack.extend(self.child_ids(current, &MapKind::TRAVERSED));
        }
    }
}
