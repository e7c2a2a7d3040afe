//! Persisted reverse dependency indices.
//!
//! An [`IndexSpec`] names an index and says which identifiers a record is
//! filed under. [`DependencyIndex`] stores `key -> {dependent ids}` in a
//! [`PersistentMultiMap`] and implements both the query contract
//! ([`ReferenceIndex`]) and the mutation contract ([`BackDependencyIndex`]).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use depgraph_core::{sorted_diff, Node, SymbolId};
use depgraph_storage::{MapFactory, PersistentMultiMap};

use crate::error::GraphError;
use crate::view::ReferenceIndex;

/// Name of the index every graph registers: usage target -> users.
pub const DEPENDING_NODES: &str = "depending-nodes";

type KeyExtractor<N> = dyn Fn(&N) -> Vec<SymbolId> + Send + Sync;

/// Definition of a named reverse index.
pub struct IndexSpec<N> {
    name: String,
    keys: Arc<KeyExtractor<N>>,
}

impl<N> Clone for IndexSpec<N> {
    fn clone(&self) -> Self {
        IndexSpec {
            name: self.name.clone(),
            keys: Arc::clone(&self.keys),
        }
    }
}

impl<N: Node> IndexSpec<N> {
    /// `keys` returns the identifiers a record is filed under; the record's
    /// own identifier becomes a dependent of each of them.
    pub fn new(
        name: impl Into<String>,
        keys: impl Fn(&N) -> Vec<SymbolId> + Send + Sync + 'static,
    ) -> Self {
        IndexSpec {
            name: name.into(),
            keys: Arc::new(keys),
        }
    }

    /// The default index, keyed by usage targets. Self references are not
    /// indexed.
    pub fn depending_nodes() -> Self {
        IndexSpec::new(DEPENDING_NODES, |node: &N| {
            let mut targets: Vec<SymbolId> = node
                .usages()
                .iter()
                .map(|u| u.target().clone())
                .filter(|t| t != node.id())
                .collect();
            targets.sort();
            targets.dedup();
            targets
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys_of(&self, node: &N) -> Vec<SymbolId> {
        (self.keys)(node)
    }
}

/// Mutation side of a reverse dependency index.
///
/// Only persisted and changeset indices implement this; derived views do not.
pub trait BackDependencyIndex<N: Node>: ReferenceIndex {
    /// Registers the edges of one record.
    fn index_node(&mut self, node: &N) -> Result<(), GraphError>;

    /// Applies one round's edge changes.
    ///
    /// Edges contributed by `deleted` and by the previous versions in
    /// `updated` are dropped, then the edges of `delta` (the same-named index
    /// of the changeset) are merged in. Keys of deleted records stay, so
    /// dependents that still reference them remain discoverable.
    fn integrate(
        &mut self,
        deleted: &[N],
        updated: &[N],
        delta: &dyn ReferenceIndex,
    ) -> Result<(), GraphError>;
}

/// A reverse index stored in a named persistent multi-map.
pub struct DependencyIndex<N> {
    spec: IndexSpec<N>,
    map: PersistentMultiMap<SymbolId, SymbolId>,
}

impl<N: Node> DependencyIndex<N> {
    pub fn new(spec: IndexSpec<N>, factory: &MapFactory) -> Self {
        let map = factory.multi_map(
            &format!("index:{}", spec.name()),
            Arc::new(SymbolId::codec()),
            Arc::new(SymbolId::codec()),
        );
        DependencyIndex { spec, map }
    }

    pub fn spec(&self) -> &IndexSpec<N> {
        &self.spec
    }
}

impl<N: Node> ReferenceIndex for DependencyIndex<N> {
    fn name(&self) -> &str {
        self.spec.name()
    }

    fn keys(&self) -> Result<BTreeSet<SymbolId>, GraphError> {
        Ok(self.map.keys()?.into_iter().collect())
    }

    fn dependencies(&self, id: &SymbolId) -> Result<BTreeSet<SymbolId>, GraphError> {
        Ok(self.map.get(id)?.into_iter().collect())
    }
}

impl<N: Node> BackDependencyIndex<N> for DependencyIndex<N> {
    fn index_node(&mut self, node: &N) -> Result<(), GraphError> {
        for key in self.spec.keys_of(node) {
            self.map.append_value(&key, node.id())?;
        }
        Ok(())
    }

    fn integrate(
        &mut self,
        deleted: &[N],
        updated: &[N],
        delta: &dyn ReferenceIndex,
    ) -> Result<(), GraphError> {
        let mut to_remove: BTreeMap<SymbolId, BTreeSet<SymbolId>> = BTreeMap::new();
        for node in deleted.iter().chain(updated) {
            for key in self.spec.keys_of(node) {
                to_remove.entry(key).or_default().insert(node.id().clone());
            }
        }

        let codec = SymbolId::codec();
        for key in delta.keys()? {
            let stale = to_remove.remove(&key).unwrap_or_default();
            let mut desired: BTreeSet<SymbolId> = self
                .map
                .get(&key)?
                .into_iter()
                .filter(|id| !stale.contains(id))
                .collect();
            desired.extend(delta.dependencies(&key)?);
            let desired: Vec<SymbolId> = desired.into_iter().collect();
            self.map
                .update(&key, &desired, |past, now| sorted_diff(&codec, past, now))?;
        }

        for (key, stale) in to_remove {
            let stale: Vec<SymbolId> = stale.into_iter().collect();
            self.map.remove_values(&key, &stale)?;
        }

        tracing::debug!(index = self.spec.name(), "integrated index delta");
        Ok(())
    }
}
