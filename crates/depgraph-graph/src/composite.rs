//! Read-only union and filter views.
//!
//! [`CompositeIndex`] merges same-named indices, [`FilteredIndex`] narrows
//! one index through a predicate, and [`CompositeGraph`] merges whole
//! graphs for multi-unit builds. None of them implement
//! [`BackDependencyIndex`](crate::index::BackDependencyIndex), so writes
//! through a view do not compile.

use std::collections::{BTreeSet, HashSet};

use depgraph_core::{Node, OriginId, SymbolId};

use crate::error::GraphError;
use crate::view::{GraphView, ReferenceIndex};

/// Deduplicated union of same-named indices.
pub struct CompositeIndex<'a> {
    name: String,
    parts: Vec<Box<dyn ReferenceIndex + 'a>>,
}

impl<'a> CompositeIndex<'a> {
    /// Fails when `parts` is empty or the parts have different names.
    pub fn new(parts: Vec<Box<dyn ReferenceIndex + 'a>>) -> Result<Self, GraphError> {
        let name = parts
            .first()
            .ok_or(GraphError::EmptyComposite)?
            .name()
            .to_string();
        if let Some(odd) = parts.iter().find(|p| p.name() != name) {
            return Err(GraphError::IndexKindMismatch {
                expected: name,
                found: odd.name().to_string(),
            });
        }
        Ok(CompositeIndex { name, parts })
    }
}

impl ReferenceIndex for CompositeIndex<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self) -> Result<BTreeSet<SymbolId>, GraphError> {
        let mut keys = BTreeSet::new();
        for part in &self.parts {
            keys.extend(part.keys()?);
        }
        Ok(keys)
    }

    fn dependencies(&self, id: &SymbolId) -> Result<BTreeSet<SymbolId>, GraphError> {
        let mut deps = BTreeSet::new();
        for part in &self.parts {
            deps.extend(part.dependencies(id)?);
        }
        Ok(deps)
    }
}

type Predicate<'a> = dyn Fn(&SymbolId) -> bool + Send + Sync + 'a;

/// One index seen through a predicate over dependent identifiers.
pub struct FilteredIndex<'a> {
    delegate: Box<dyn ReferenceIndex + 'a>,
    predicate: Box<Predicate<'a>>,
}

impl<'a> FilteredIndex<'a> {
    pub fn new(
        delegate: Box<dyn ReferenceIndex + 'a>,
        predicate: impl Fn(&SymbolId) -> bool + Send + Sync + 'a,
    ) -> Self {
        FilteredIndex {
            delegate,
            predicate: Box::new(predicate),
        }
    }
}

impl ReferenceIndex for FilteredIndex<'_> {
    fn name(&self) -> &str {
        self.delegate.name()
    }

    fn keys(&self) -> Result<BTreeSet<SymbolId>, GraphError> {
        self.delegate.keys()
    }

    fn dependencies(&self, id: &SymbolId) -> Result<BTreeSet<SymbolId>, GraphError> {
        Ok(self
            .delegate
            .dependencies(id)?
            .into_iter()
            .filter(|dep| (self.predicate)(dep))
            .collect())
    }
}

/// Union of several graphs with identical index layouts.
pub struct CompositeGraph<'a, N: Node> {
    parts: Vec<&'a dyn GraphView<N>>,
}

impl<'a, N: Node> CompositeGraph<'a, N> {
    pub fn new(parts: Vec<&'a dyn GraphView<N>>) -> Result<Self, GraphError> {
        let first = parts.first().ok_or(GraphError::EmptyComposite)?;
        let expected: BTreeSet<String> = first.index_names().into_iter().collect();
        for part in &parts[1..] {
            let names: BTreeSet<String> = part.index_names().into_iter().collect();
            if let Some(found) = names.symmetric_difference(&expected).next() {
                return Err(GraphError::IndexKindMismatch {
                    expected: expected.iter().cloned().collect::<Vec<_>>().join(","),
                    found: found.clone(),
                });
            }
        }
        Ok(CompositeGraph { parts })
    }
}

impl<N: Node> GraphView<N> for CompositeGraph<'_, N> {
    fn index_names(&self) -> Vec<String> {
        self.parts[0].index_names()
    }

    fn index(&self, name: &str) -> Option<Box<dyn ReferenceIndex + '_>> {
        let parts = self
            .parts
            .iter()
            .map(|part| part.index(name))
            .collect::<Option<Vec<_>>>()?;
        CompositeIndex::new(parts)
            .ok()
            .map(|index| Box::new(index) as Box<dyn ReferenceIndex + '_>)
    }

    fn sources(&self, id: &SymbolId) -> Result<BTreeSet<OriginId>, GraphError> {
        let mut sources = BTreeSet::new();
        for part in &self.parts {
            sources.extend(part.sources(id)?);
        }
        Ok(sources)
    }

    fn registered_nodes(&self) -> Result<BTreeSet<SymbolId>, GraphError> {
        let mut nodes = BTreeSet::new();
        for part in &self.parts {
            nodes.extend(part.registered_nodes()?);
        }
        Ok(nodes)
    }

    fn origins(&self) -> Result<BTreeSet<OriginId>, GraphError> {
        let mut origins = BTreeSet::new();
        for part in &self.parts {
            origins.extend(part.origins()?);
        }
        Ok(origins)
    }

    /// Records of `origin` across all parts. The first part listing an
    /// identifier wins.
    fn nodes(&self, origin: &OriginId) -> Result<Vec<N>, GraphError> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for part in &self.parts {
            for node in part.nodes(origin)? {
                if seen.insert(node.id().clone()) {
                    nodes.push(node);
                }
            }
        }
        Ok(nodes)
    }
}
