//! Reader/writer discipline for a long-lived graph.
//!
//! Readers hold a read guard for as long as they query, so they observe the
//! graph either entirely before or entirely after an integrate. Integrate
//! takes the write guard for the whole transaction.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use depgraph_core::Node;

use crate::error::GraphError;
use crate::graph::{Graph, Integrable};

/// A cloneable handle to one graph shared across rounds and threads.
pub struct SharedGraph<N> {
    inner: Arc<RwLock<Graph<N>>>,
}

impl<N> Clone for SharedGraph<N> {
    fn clone(&self) -> Self {
        SharedGraph {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<N: Node> SharedGraph<N> {
    pub fn new(graph: Graph<N>) -> Self {
        SharedGraph {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, Graph<N>>, GraphError> {
        self.inner.read().map_err(|_| GraphError::LockPoisoned)
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Graph<N>>, GraphError> {
        self.inner.write().map_err(|_| GraphError::LockPoisoned)
    }

    /// Integrates `outcome` while holding the write lock.
    pub fn integrate(&self, outcome: &dyn Integrable<N>) -> Result<(), GraphError> {
        self.write()?.integrate(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::thread;

    use depgraph_core::codec::JsonCodec;
    use depgraph_core::{OriginId, Symbol, SymbolId, Usage};
    use depgraph_storage::InMemoryStore;

    use crate::view::GraphView;

    #[test]
    fn readers_see_whole_rounds() {
        let graph = Graph::<Symbol>::open(
            Arc::new(InMemoryStore::new()),
            Arc::new(JsonCodec::<Symbol>::new()),
            Vec::new(),
        )
        .unwrap();
        let shared = SharedGraph::new(graph);

        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for round in 0..20 {
                    let origin = OriginId::new(format!("o{round}"));
                    let mut delta = shared
                        .read()
                        .unwrap()
                        .create_delta([origin.clone()], Vec::new())
                        .unwrap();
                    let user = Symbol::new(format!("u{round}"), "class", "")
                        .with_usage(Usage::of("root"));
                    let root_copy = Symbol::new(format!("r{round}"), "class", "");
                    delta.associate(user, &[origin.clone()]).unwrap();
                    delta.associate(root_copy, &[origin]).unwrap();
                    shared.integrate(&delta).unwrap();
                }
            })
        };

        for _ in 0..50 {
            let guard = shared.read().unwrap();
            let nodes: BTreeSet<SymbolId> = guard.registered_nodes().unwrap();
            let users = guard.depending_nodes(&SymbolId::from("root")).unwrap();
            // every round adds one user and one root copy together
            assert_eq!(nodes.len(), users.len() * 2);
        }
        writer.join().unwrap();
        assert_eq!(shared.read().unwrap().origins().unwrap().len(), 20);
    }
}
