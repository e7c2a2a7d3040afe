//! The persisted dependency graph and its integrate transaction.
//!
//! [`Graph`] associates origins with the records they produced and keeps a
//! set of named reverse indices over those records. All writes go through
//! an [`Integration`], which wraps one backend transaction: either every
//! change of a round lands, or none does.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use depgraph_core::{Codec, Node, OriginId, SymbolId};
use depgraph_storage::{MapFactory, MapStore};

use crate::composite::FilteredIndex;
use crate::delta::Delta;
use crate::error::GraphError;
use crate::index::{BackDependencyIndex, IndexSpec};
use crate::tables::Tables;
use crate::view::{GraphView, ReferenceIndex};

/// A round outcome that can be merged into a [`Graph`].
pub trait Integrable<N: Node> {
    /// False when nothing from this round may be merged.
    fn is_integrable(&self) -> bool {
        true
    }

    fn delta(&self) -> &Delta<N>;

    /// Records that no longer exist after this round.
    fn deleted_nodes(&self) -> &[N];

    /// Origins whose compilation failed. Their previous records are kept.
    fn is_failed(&self, origin: &OriginId) -> bool;
}

/// A bare changeset integrates as-is, with no failed origins.
impl<N: Node> Integrable<N> for Delta<N> {
    fn delta(&self) -> &Delta<N> {
        self
    }

    fn deleted_nodes(&self) -> &[N] {
        &[]
    }

    fn is_failed(&self, _origin: &OriginId) -> bool {
        false
    }
}

/// The persisted origin <-> record association plus its reverse indices.
pub struct Graph<N> {
    store: Arc<dyn MapStore>,
    node_codec: Arc<dyn Codec<N>>,
    specs: Vec<IndexSpec<N>>,
    tables: Tables<N>,
}

impl<N: Node> Graph<N> {
    /// Opens a graph over `store`. The `depending-nodes` index is always
    /// registered first; `extra_specs` add further indices.
    pub fn open(
        store: Arc<dyn MapStore>,
        node_codec: Arc<dyn Codec<N>>,
        extra_specs: Vec<IndexSpec<N>>,
    ) -> Result<Self, GraphError> {
        let mut specs = vec![IndexSpec::depending_nodes()];
        specs.extend(extra_specs);
        let factory = MapFactory::new(Arc::clone(&store));
        let tables = Tables::open(&factory, Arc::clone(&node_codec), &specs)?;
        tracing::debug!(indices = specs.len(), "opened dependency graph");
        Ok(Graph {
            store,
            node_codec,
            specs,
            tables,
        })
    }

    pub fn store(&self) -> &Arc<dyn MapStore> {
        &self.store
    }

    pub fn specs(&self) -> &[IndexSpec<N>] {
        &self.specs
    }

    /// Creates an empty changeset with this graph's index layout.
    pub fn create_delta(
        &self,
        compiled: impl IntoIterator<Item = OriginId>,
        deleted: impl IntoIterator<Item = OriginId>,
    ) -> Result<Delta<N>, GraphError> {
        Delta::new(Arc::clone(&self.node_codec), &self.specs, compiled, deleted)
    }

    /// Starts the single write transaction of a round.
    pub fn begin_integrate(&mut self) -> Result<Integration<'_, N>, GraphError> {
        self.store.begin()?;
        Ok(Integration {
            graph: self,
            committed: false,
        })
    }

    /// Merges `outcome` in one transaction.
    pub fn integrate(&mut self, outcome: &dyn Integrable<N>) -> Result<(), GraphError> {
        let mut tx = self.begin_integrate()?;
        tx.apply(outcome)?;
        tx.commit()
    }
}

impl<N: Node> GraphView<N> for Graph<N> {
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

/// True when an origin outside the round, or a failed one, still holds `id`.
fn survives_round<N: Node>(
    tables: &Tables<N>,
    outcome: &dyn Integrable<N>,
    id: &SymbolId,
) -> Result<bool, GraphError> {
    let delta = outcome.delta();
    Ok(tables
        .sources(id)?
        .iter()
        .any(|origin| !delta.is_compiled(origin) || outcome.is_failed(origin)))
}

/// An open integrate transaction. Dropping it without [`commit`] rolls
/// every write back.
///
/// [`commit`]: Integration::commit
pub struct Integration<'g, N: Node> {
    graph: &'g mut Graph<N>,
    committed: bool,
}

impl<N: Node> Integration<'_, N> {
    /// Writes one round's outcome into the graph.
    pub fn apply(&mut self, outcome: &dyn Integrable<N>) -> Result<(), GraphError> {
        if !outcome.is_integrable() {
            return Err(GraphError::NotIntegrable);
        }
        let delta = outcome.delta();
        let tables = &mut self.graph.tables;

        // Edges of a record only go away when no origin keeps producing it.
        let mut stale = Vec::new();
        for origin in delta.base_origins() {
            if outcome.is_failed(origin) {
                continue;
            }
            for node in tables.origin_to_nodes.get(origin)? {
                if !survives_round(tables, outcome, node.id())? {
                    stale.push(node);
                }
            }
        }
        let mut deleted = Vec::new();
        for node in outcome.deleted_nodes() {
            if !survives_round(tables, outcome, node.id())? {
                deleted.push(node.clone());
            }
        }

        // Partial records of failed origins are not registered, so their
        // edges stay out of the indices too.
        let mut failed_only = HashSet::new();
        for id in delta.registered_nodes()? {
            if delta.sources(&id)?.iter().all(|o| outcome.is_failed(o)) {
                failed_only.insert(id);
            }
        }

        for index in &mut tables.indices {
            let name = index.name().to_string();
            let delta_index = delta
                .tables
                .index(&name)
                .ok_or(GraphError::MissingIndex(name))?;
            let produced = FilteredIndex::new(Box::new(delta_index), |id: &SymbolId| {
                !failed_only.contains(id)
            });
            index.integrate(&deleted, &stale, &produced)?;
        }

        for origin in delta.deleted_origins() {
            if outcome.is_failed(origin) {
                continue;
            }
            for node in tables.origin_to_nodes.get(origin)? {
                tables.node_to_origins.remove_value(node.id(), origin)?;
            }
            tables.origin_to_nodes.remove(origin)?;
        }

        for origin in delta.base_origins() {
            if delta.is_deleted_origin(origin) || outcome.is_failed(origin) {
                continue;
            }
            let past = tables.origin_to_nodes.get(origin)?;
            let now = delta.tables.origin_to_nodes.get(origin)?;
            let now_ids: HashSet<&SymbolId> = now.iter().map(|n| n.id()).collect();
            for node in past.iter().filter(|n| !now_ids.contains(n.id())) {
                tables.node_to_origins.remove_value(node.id(), origin)?;
            }
            for node in &now {
                tables.node_to_origins.append_value(node.id(), origin)?;
            }
            if now.is_empty() {
                tables.origin_to_nodes.remove(origin)?;
            } else {
                tables.origin_to_nodes.put(origin, &now)?;
            }
        }

        tracing::debug!(
            origins = delta.base_origins().len(),
            deleted = deleted.len(),
            "applied changeset"
        );
        Ok(())
    }

    pub fn commit(mut self) -> Result<(), GraphError> {
        self.graph.store.commit()?;
        self.committed = true;
        Ok(())
    }
}

impl<N: Node> Drop for Integration<'_, N> {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(err) = self.graph.store.rollback() {
                tracing::warn!(error = %err, "failed to roll back integrate transaction");
            } else {
                tracing::debug!("rolled back integrate transaction");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgraph_core::codec::JsonCodec;
    use depgraph_core::{Symbol, Usage};
    use depgraph_storage::{InMemoryStore, SqliteStore};

    fn open(store: Arc<dyn MapStore>) -> Graph<Symbol> {
        Graph::open(store, Arc::new(JsonCodec::<Symbol>::new()), Vec::new()).unwrap()
    }

    fn ids(names: &[&str]) -> BTreeSet<SymbolId> {
        names.iter().map(|n| SymbolId::from(*n)).collect()
    }

    fn origins(names: &[&str]) -> BTreeSet<OriginId> {
        names.iter().map(|n| OriginId::from(*n)).collect()
    }

    /// Origin "A" holds record 1, origin "B" holds record 2 using 1.
    fn seeded(store: Arc<dyn MapStore>) -> Graph<Symbol> {
        let mut graph = open(store);
        let mut delta = graph.create_delta(Vec::new(), Vec::new()).unwrap();
        delta
            .associate(Symbol::new("1", "class", "class a"), &[OriginId::from("A")])
            .unwrap();
        delta
            .associate(
                Symbol::new("2", "class", "class b").with_usage(Usage::of("1")),
                &[OriginId::from("B")],
            )
            .unwrap();
        graph.integrate(&delta).unwrap();
        graph
    }

    #[derive(Debug, PartialEq)]
    struct Snapshot {
        nodes: BTreeSet<SymbolId>,
        origins: BTreeSet<OriginId>,
        dependents: Vec<(SymbolId, BTreeSet<SymbolId>)>,
    }

    fn snapshot(graph: &Graph<Symbol>) -> Snapshot {
        let nodes = graph.registered_nodes().unwrap();
        let dependents = nodes
            .iter()
            .map(|id| (id.clone(), graph.depending_nodes(id).unwrap()))
            .collect();
        Snapshot {
            nodes,
            origins: graph.origins().unwrap(),
            dependents,
        }
    }

    #[test]
    fn integrate_registers_records_and_edges() {
        let graph = seeded(Arc::new(InMemoryStore::new()));
        assert_eq!(graph.registered_nodes().unwrap(), ids(&["1", "2"]));
        assert_eq!(graph.origins().unwrap(), origins(&["A", "B"]));
        assert_eq!(graph.depending_nodes(&SymbolId::from("1")).unwrap(), ids(&["2"]));
        assert_eq!(graph.sources(&SymbolId::from("2")).unwrap(), origins(&["B"]));
        assert_eq!(graph.index_names(), vec!["depending-nodes".to_string()]);
    }

    #[test]
    fn empty_changeset_leaves_graph_unchanged() {
        let mut graph = seeded(Arc::new(InMemoryStore::new()));
        let before = snapshot(&graph);
        let delta = graph.create_delta(Vec::new(), Vec::new()).unwrap();
        graph.integrate(&delta).unwrap();
        assert_eq!(snapshot(&graph), before);
    }

    #[test]
    fn recompiled_origin_replaces_its_records() {
        let mut graph = seeded(Arc::new(InMemoryStore::new()));
        let mut delta = graph.create_delta([OriginId::from("B")], Vec::new()).unwrap();
        delta
            .associate(
                Symbol::new("3", "class", "class c").with_usage(Usage::of("1")),
                &[OriginId::from("B")],
            )
            .unwrap();
        graph.integrate(&delta).unwrap();

        assert_eq!(graph.registered_nodes().unwrap(), ids(&["1", "3"]));
        assert_eq!(graph.depending_nodes(&SymbolId::from("1")).unwrap(), ids(&["3"]));
        let b_nodes = graph.nodes(&OriginId::from("B")).unwrap();
        assert_eq!(b_nodes.len(), 1);
        assert_eq!(b_nodes[0].id, SymbolId::from("3"));
    }

    #[test]
    fn deleting_an_origin_keeps_dangling_dependents() {
        let mut graph = seeded(Arc::new(InMemoryStore::new()));
        let delta = graph.create_delta(Vec::new(), [OriginId::from("A")]).unwrap();
        graph.integrate(&delta).unwrap();

        assert_eq!(graph.origins().unwrap(), origins(&["B"]));
        assert_eq!(graph.registered_nodes().unwrap(), ids(&["2"]));
        assert_eq!(graph.depending_nodes(&SymbolId::from("1")).unwrap(), ids(&["2"]));
    }

    #[test]
    fn record_shared_by_two_origins_survives_until_last_origin_drops_it() {
        let mut graph = open(Arc::new(InMemoryStore::new()));
        let shared = Symbol::new("S", "module", "mod s");
        let mut delta = graph.create_delta(Vec::new(), Vec::new()).unwrap();
        delta
            .associate(shared, &[OriginId::from("X"), OriginId::from("Y")])
            .unwrap();
        graph.integrate(&delta).unwrap();

        let delta = graph.create_delta(Vec::new(), [OriginId::from("X")]).unwrap();
        graph.integrate(&delta).unwrap();
        assert_eq!(graph.sources(&SymbolId::from("S")).unwrap(), origins(&["Y"]));

        let delta = graph.create_delta(Vec::new(), [OriginId::from("Y")]).unwrap();
        graph.integrate(&delta).unwrap();
        assert!(graph.registered_nodes().unwrap().is_empty());
    }

    #[test]
    fn shared_record_keeps_its_edges_while_any_origin_holds_it() {
        let mut graph = open(Arc::new(InMemoryStore::new()));
        let mut delta = graph.create_delta(Vec::new(), Vec::new()).unwrap();
        delta
            .associate(Symbol::new("T", "class", "class t"), &[OriginId::from("TO")])
            .unwrap();
        delta
            .associate(
                Symbol::new("S", "module", "mod s").with_usage(Usage::of("T")),
                &[OriginId::from("X"), OriginId::from("Y")],
            )
            .unwrap();
        graph.integrate(&delta).unwrap();

        // X recompiles and no longer produces S.
        let delta = graph.create_delta([OriginId::from("X")], Vec::new()).unwrap();
        graph.integrate(&delta).unwrap();
        assert_eq!(graph.sources(&SymbolId::from("S")).unwrap(), origins(&["Y"]));
        assert_eq!(graph.depending_nodes(&SymbolId::from("T")).unwrap(), ids(&["S"]));

        let delta = graph.create_delta(Vec::new(), [OriginId::from("Y")]).unwrap();
        graph.integrate(&delta).unwrap();
        assert_eq!(graph.registered_nodes().unwrap(), ids(&["T"]));
        assert!(graph.depending_nodes(&SymbolId::from("T")).unwrap().is_empty());
    }

    struct WithFailures {
        delta: Delta<Symbol>,
        failed: BTreeSet<OriginId>,
    }

    impl Integrable<Symbol> for WithFailures {
        fn delta(&self) -> &Delta<Symbol> {
            &self.delta
        }

        fn deleted_nodes(&self) -> &[Symbol] {
            &[]
        }

        fn is_failed(&self, origin: &OriginId) -> bool {
            self.failed.contains(origin)
        }
    }

    #[test]
    fn partial_records_of_failed_origins_stay_out_of_indices() {
        let mut graph = seeded(Arc::new(InMemoryStore::new()));
        let mut delta = graph.create_delta([OriginId::from("B")], Vec::new()).unwrap();
        delta
            .associate(
                Symbol::new("2", "class", "class b").with_usage(Usage::of("X")),
                &[OriginId::from("B")],
            )
            .unwrap();
        let outcome = WithFailures {
            delta,
            failed: origins(&["B"]),
        };
        graph.integrate(&outcome).unwrap();

        let kept = graph.nodes(&OriginId::from("B")).unwrap();
        assert_eq!(kept[0].usages[0], Usage::of("1"));
        assert_eq!(graph.depending_nodes(&SymbolId::from("1")).unwrap(), ids(&["2"]));
        assert!(graph.depending_nodes(&SymbolId::from("X")).unwrap().is_empty());
    }

    #[test]
    fn dropped_integration_rolls_back() {
        let mut graph = seeded(Arc::new(InMemoryStore::new()));
        let before = snapshot(&graph);
        let delta = graph.create_delta(Vec::new(), [OriginId::from("A")]).unwrap();
        {
            let mut tx = graph.begin_integrate().unwrap();
            tx.apply(&delta).unwrap();
        }
        assert_eq!(snapshot(&graph), before);
        assert!(!graph.store().in_transaction());
    }

    #[test]
    fn sqlite_graph_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        {
            seeded(Arc::new(SqliteStore::open(path.to_str().unwrap()).unwrap()));
        }
        let graph = open(Arc::new(SqliteStore::open(path.to_str().unwrap()).unwrap()));
        assert_eq!(graph.registered_nodes().unwrap(), ids(&["1", "2"]));
        assert_eq!(graph.depending_nodes(&SymbolId::from("1")).unwrap(), ids(&["2"]));
    }

    #[test]
    fn extra_index_cannot_shadow_the_default() {
        let result = Graph::<Symbol>::open(
            Arc::new(InMemoryStore::new()),
            Arc::new(JsonCodec::<Symbol>::new()),
            vec![IndexSpec::depending_nodes()],
        );
        assert!(matches!(result, Err(GraphError::DuplicateIndex(_))));
    }
}
