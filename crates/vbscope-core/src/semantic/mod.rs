//! Semantic analysis module
//!
//! Provides the project scope graph, name resolution, declaration checks,
//! invalidation of edited modules and position queries.

pub mod build;
pub mod checks;
pub mod invalidate;
pub mod query;
pub mod register;
pub mod resolve;
pub mod scope;

use thiserror::Error;

pub use query::{Location, LocationLink};
pub use register::ScopeEntry;
pub use resolve::Resolution;
pub use scope::{
    AncestorIter, AssignmentKind, ChildMap, ElementInfo, MapKind, ScopeGraph, ScopeId, ScopeKind,
    ScopeMaps, ScopeNode, UNKNOWN_ELEMENT, UNKNOWN_MODULE,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Bad URI or name: {0}")]
    BadUri(String),

    #[error("Module name ambiguity: {count} modules named '{name}'")]
    AmbiguousModule { name: String, count: usize },
}
