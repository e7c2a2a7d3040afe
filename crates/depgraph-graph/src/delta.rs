//! The changeset overlay for one compilation round.
//!
//! A [`Delta`] has the same map layout and named indices as the graph it
//! was created from, backed by an [`InMemoryStore`]. Deleted origins count
//! as part of the round's input.

use std::collections::BTreeSet;
use std::sync::Arc;

use depgraph_core::{Codec, Node, OriginId, SymbolId};
use depgraph_storage::{InMemoryStore, MapFactory};

use crate::error::GraphError;
use crate::index::{BackDependencyIndex, IndexSpec};
use crate::tables::Tables;
use crate::view::{GraphView, ReferenceIndex};

/// Records produced or deleted by one round.
pub struct Delta<N> {
    base_origins: BTreeSet<OriginId>,
    deleted_origins: BTreeSet<OriginId>,
    pub(crate) tables: Tables<N>,
}

impl<N: Node> Delta<N> {
    /// Creates an empty changeset. `compiled` are the origins recompiled
    /// this round, `deleted` the origins removed outright.
    pub fn new(
        node_codec: Arc<dyn Codec<N>>,
        specs: &[IndexSpec<N>],
        compiled: impl IntoIterator<Item = OriginId>,
        deleted: impl IntoIterator<Item = OriginId>,
    ) -> Result<Self, GraphError> {
        let factory = MapFactory::new(Arc::new(InMemoryStore::new()));
        let tables = Tables::open(&factory, node_codec, specs)?;
        let deleted_origins: BTreeSet<OriginId> = deleted.into_iter().collect();
        let mut base_origins: BTreeSet<OriginId> = compiled.into_iter().collect();
        base_origins.extend(deleted_origins.iter().cloned());
        Ok(Delta {
            base_origins,
            deleted_origins,
            tables,
        })
    }

    /// Records `node` as produced by `origins` this round.
    pub fn associate(&mut self, node: N, origins: &[OriginId]) -> Result<(), GraphError> {
        for index in &mut self.tables.indices {
            index.index_node(&node)?;
        }
        for origin in origins {
            self.tables.node_to_origins.append_value(node.id(), origin)?;
            self.tables.origin_to_nodes.append_value(origin, &node)?;
            self.base_origins.insert(origin.clone());
        }
        Ok(())
    }

    /// Compiled plus deleted origins.
    pub fn base_origins(&self) -> &BTreeSet<OriginId> {
        &self.base_origins
    }

    pub fn deleted_origins(&self) -> &BTreeSet<OriginId> {
        &self.deleted_origins
    }

    pub fn is_compiled(&self, origin: &OriginId) -> bool {
        self.base_origins.contains(origin)
    }

    pub fn is_deleted_origin(&self, origin: &OriginId) -> bool {
        self.deleted_origins.contains(origin)
    }

    /// Every record produced this round, ordered by origin then identifier.
    pub fn all_nodes(&self) -> Result<Vec<N>, GraphError> {
        let mut nodes = Vec::new();
        for origin in &self.base_origins {
            nodes.extend(self.tables.nodes(origin)?);
        }
        Ok(nodes)
    }
}

impl<N: Node> GraphView<N> for Delta<N> {
    fn index_names(&self) -> Vec<String> {
        self.tables.index_names()
    }

    fn index(&self, name: &str) -> Option<Box<dyn ReferenceIndex + '_>> {
        self.tables
            .index(name)
            .map(|i| Box::new(i) as Box<dyn ReferenceIndex + '_>)
    }

    fn sources(&self, id: &SymbolId) -> Result<BTreeSet<OriginId>, GraphError> {
        self.tables.sources(id)
    }

    fn registered_nodes(&self) -> Result<BTreeSet<SymbolId>, GraphError> {
        self.tables.registered_nodes()
    }

    fn origins(&self) -> Result<BTreeSet<OriginId>, GraphError> {
        self.tables.origins()
    }

    fn nodes(&self, origin: &OriginId) -> Result<Vec<N>, GraphError> {
        self.tables.nodes(origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgraph_core::codec::JsonCodec;
    use depgraph_core::{Symbol, Usage};

    fn delta(compiled: &[&str], deleted: &[&str]) -> Delta<Symbol> {
        Delta::new(
            Arc::new(JsonCodec::<Symbol>::new()),
            &[IndexSpec::depending_nodes()],
            compiled.iter().map(|o| OriginId::from(*o)),
            deleted.iter().map(|o| OriginId::from(*o)),
        )
        .unwrap()
    }

    #[test]
    fn deleted_origins_are_part_of_the_round() {
        let d = delta(&["A"], &["B"]);
        assert!(d.is_compiled(&OriginId::from("A")));
        assert!(d.is_compiled(&OriginId::from("B")));
        assert!(d.is_deleted_origin(&OriginId::from("B")));
        assert!(!d.is_deleted_origin(&OriginId::from("A")));
    }

    #[test]
    fn associate_indexes_and_registers_records() {
        let mut d = delta(&[], &[]);
        let b = Symbol::new("2", "class", "class B").with_usage(Usage::of("1"));
        d.associate(b.clone(), &[OriginId::from("B")]).unwrap();

        assert!(d.is_compiled(&OriginId::from("B")));
        assert_eq!(d.nodes(&OriginId::from("B")).unwrap(), vec![b]);
        assert_eq!(
            d.depending_nodes(&SymbolId::from("1")).unwrap(),
            [SymbolId::from("2")].into_iter().collect()
        );
        assert_eq!(
            d.sources(&SymbolId::from("2")).unwrap(),
            [OriginId::from("B")].into_iter().collect()
        );
    }

    #[test]
    fn duplicate_index_names_are_rejected() {
        let result = Delta::new(
            Arc::new(JsonCodec::<Symbol>::new()),
            &[IndexSpec::depending_nodes(), IndexSpec::depending_nodes()],
            Vec::new(),
            Vec::new(),
        );
        assert!(matches!(result, Err(GraphError::DuplicateIndex(_))));
    }
}
