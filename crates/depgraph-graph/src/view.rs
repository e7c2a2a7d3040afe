//! Read-only contracts shared by persisted graphs, changesets, and
//! composite views.
//!
//! [`ReferenceIndex`] is the query half of a reverse dependency index. The
//! mutable half lives in [`crate::index::BackDependencyIndex`]; composite and
//! filtered views only implement this trait, so they cannot be written to.

use std::collections::BTreeSet;

use depgraph_core::{Node, OriginId, SymbolId};

use crate::error::GraphError;
use crate::index::DEPENDING_NODES;

/// Query side of a named reverse dependency index.
pub trait ReferenceIndex: Send + Sync {
    /// Kind discriminator. Composed indices must share it.
    fn name(&self) -> &str;

    /// Every identifier that has at least one dependent.
    fn keys(&self) -> Result<BTreeSet<SymbolId>, GraphError>;

    /// Identifiers of records depending on `id`.
    fn dependencies(&self, id: &SymbolId) -> Result<BTreeSet<SymbolId>, GraphError>;
}

impl<T: ReferenceIndex + ?Sized> ReferenceIndex for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn keys(&self) -> Result<BTreeSet<SymbolId>, GraphError> {
        (**self).keys()
    }

    fn dependencies(&self, id: &SymbolId) -> Result<BTreeSet<SymbolId>, GraphError> {
        (**self).dependencies(id)
    }
}

impl<T: ReferenceIndex + ?Sized> ReferenceIndex for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn keys(&self) -> Result<BTreeSet<SymbolId>, GraphError> {
        (**self).keys()
    }

    fn dependencies(&self, id: &SymbolId) -> Result<BTreeSet<SymbolId>, GraphError> {
        (**self).dependencies(id)
    }
}

/// Read access to an origin <-> record association plus its indices.
pub trait GraphView<N: Node> {
    /// Names of every registered index, in registration order.
    fn index_names(&self) -> Vec<String>;

    fn index(&self, name: &str) -> Option<Box<dyn ReferenceIndex + '_>>;

    /// Dependents of `id` through the default `depending-nodes` index.
    fn depending_nodes(&self, id: &SymbolId) -> Result<BTreeSet<SymbolId>, GraphError> {
        match self.index(DEPENDING_NODES) {
            Some(index) => index.dependencies(id),
            None => Err(GraphError::MissingIndex(DEPENDING_NODES.to_string())),
        }
    }

    /// Origins that produced a record with identifier `id`.
    fn sources(&self, id: &SymbolId) -> Result<BTreeSet<OriginId>, GraphError>;

    fn registered_nodes(&self) -> Result<BTreeSet<SymbolId>, GraphError>;

    fn origins(&self) -> Result<BTreeSet<OriginId>, GraphError>;

    /// Records produced by `origin`.
    fn nodes(&self, origin: &OriginId) -> Result<Vec<N>, GraphError>;

    fn nodes_of_kind(&self, origin: &OriginId, kind: &str) -> Result<Vec<N>, GraphError> {
        Ok(self
            .nodes(origin)?
            .into_iter()
            .filter(|n| n.kind() == kind)
            .collect())
    }
}
