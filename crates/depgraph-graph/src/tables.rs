//! The map layout shared by persisted graphs and changesets.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use depgraph_core::{Codec, Node, OriginId, SymbolId};
use depgraph_storage::{MapFactory, PersistentMultiMap};

use crate::error::GraphError;
use crate::index::{DependencyIndex, IndexSpec};
use crate::view::ReferenceIndex;

pub(crate) struct Tables<N> {
    pub(crate) indices: Vec<DependencyIndex<N>>,
    pub(crate) node_to_origins: PersistentMultiMap<SymbolId, OriginId>,
    pub(crate) origin_to_nodes: PersistentMultiMap<OriginId, N>,
}

impl<N: Node> Tables<N> {
    pub(crate) fn open(
        factory: &MapFactory,
        node_codec: Arc<dyn Codec<N>>,
        specs: &[IndexSpec<N>],
    ) -> Result<Self, GraphError> {
        let mut seen = HashSet::new();
        for spec in specs {
            if !seen.insert(spec.name()) {
                return Err(GraphError::DuplicateIndex(spec.name().to_string()));
            }
        }
        Ok(Tables {
            indices: specs
                .iter()
                .map(|spec| DependencyIndex::new(spec.clone(), factory))
                .collect(),
            node_to_origins: factory.multi_map(
                "node-to-origins",
                Arc::new(SymbolId::codec()),
                Arc::new(OriginId::codec()),
            ),
            origin_to_nodes: factory.multi_map(
                "origin-to-nodes",
                Arc::new(OriginId::codec()),
                node_codec,
            ),
        })
    }

    pub(crate) fn index_names(&self) -> Vec<String> {
        self.indices.iter().map(|i| i.name().to_string()).collect()
    }

    pub(crate) fn index(&self, name: &str) -> Option<&DependencyIndex<N>> {
        self.indices.iter().find(|i| i.name() == name)
    }

    pub(crate) fn sources(&self, id: &SymbolId) -> Result<BTreeSet<OriginId>, GraphError> {
        Ok(self.node_to_origins.get(id)?.into_iter().collect())
    }

    pub(crate) fn registered_nodes(&self) -> Result<BTreeSet<SymbolId>, GraphError> {
        Ok(self.node_to_origins.keys()?.into_iter().collect())
    }

    pub(crate) fn origins(&self) -> Result<BTreeSet<OriginId>, GraphError> {
        Ok(self.origin_to_nodes.keys()?.into_iter().collect())
    }

    /// Records of `origin`, ordered by identifier.
    pub(crate) fn nodes(&self, origin: &OriginId) -> Result<Vec<N>, GraphError> {
        let mut nodes = self.origin_to_nodes.get(origin)?;
        nodes.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(nodes)
    }
}
