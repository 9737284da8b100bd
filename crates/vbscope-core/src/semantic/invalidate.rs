//! Marking edited modules stale ahead of the next build

use tracing::{debug, error};

use super::GraphError;
use super::scope::{MapKind, ScopeGraph, ScopeId};

/// Module key for a document uri: the file name without its last extension.
pub fn module_key_from_uri(uri: &str) -> Option<&str> {
    let file_name = uri.rsplit('/').next()?;
    let (stem, _extension) = file_name.rsplit_once('.')?;
    (!stem.is_empty()).then_some(stem)
}

impl ScopeGraph {
    /// Finds the live module registered for `uri`.
    ///
    /// Modules are filed under the name the front-end reports, which may
    /// differ from the file name, so ownership is decided by uri. The file
    /// name key only detects clashes: another live module from a different
    /// uri with the same file name is reported rather than guessed at.
    pub fn find_module_by_uri(&self, uri: &str) -> Result<Option<ScopeId>, GraphError> {
        let Some(name) = module_key_from_uri(uri) else {
            error!(uri, "Bad URI or name");
            return Err(GraphError::BadUri(uri.to_string()));
        };

        let (owned, others): (Vec<ScopeId>, Vec<ScopeId>) = self
            .get(self.root())
            .maps
            .ids(&[MapKind::Modules])
            .filter(|&id| !self.get(id).invalidated)
            .partition(|&id| {
                let node = self.get(id);
                match node.uri.as_deref() {
                    Some(module_uri) => module_uri == uri,
                    None => node.name == name,
                }
            });
        let clashing = others
            .iter()
            .filter(|&&id| self.get(id).uri.as_deref().and_then(module_key_from_uri) == Some(name))
            .count();

        match (owned.as_slice(), clashing) {
            ([], 0) => {
                debug!(module = name, "No such module");
                Ok(None)
            }
            ([module], 0) => Ok(Some(*module)),
            _ => {
                let count = owned.len().max(1) + clashing;
                error!(module = name, count, "Module name ambiguity");
                Err(GraphError::AmbiguousModule {
                    name: name.to_string(),
                    count,
                })
            }
        }
    }

    /// Flags the module for `uri` and everything below it. Returns whether a
    /// module was found.
    pub fn invalidate_module(&mut self, uri: &str) -> Result<bool, GraphError> {
        match self.find_module_by_uri(uri)? {
            Some(module) => {
                debug!(uri, "Invalidating module");
                self.invalidate(module);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn invalidate(&mut self, id: ScopeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            self.get_mut(current).invalidated = true;
            stack.extend(self.child_ids(current, &MapKind::TRAVERSED));
        }
    }
}
