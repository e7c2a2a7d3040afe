//! JSON changeset files accepted by `depgraph apply`.
//!
//! ```json
//! {
//!   "compiled": ["src/a.rs"],
//!   "deleted": ["src/old.rs"],
//!   "failed": [],
//!   "records": [
//!     { "origin": "src/a.rs", "symbol": { "id": "a::A", "kind": "struct", "signature": "struct A" } }
//!   ]
//! }
//! ```
//!
//! Origins named by a record are compiled implicitly.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use depgraph_core::{OriginId, Symbol};
use depgraph_differentiate::DifferentiateParams;
use depgraph_graph::{Delta, Graph, GraphError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Changeset {
    pub compiled: Vec<OriginId>,
    pub deleted: Vec<OriginId>,
    pub failed: BTreeSet<OriginId>,
    pub records: Vec<ChangesetRecord>,
    pub params: Option<DifferentiateParams>,
}

#[derive(Debug, Deserialize)]
pub struct ChangesetRecord {
    pub origin: OriginId,
    pub symbol: Symbol,
}

#[derive(Debug, Error)]
pub enum ChangesetError {
    #[error("cannot read changeset: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid changeset: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Changeset {
    pub fn load(path: &Path) -> Result<Self, ChangesetError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Builds the round's delta against `graph`'s index layout.
    pub fn to_delta(&self, graph: &Graph<Symbol>) -> Result<Delta<Symbol>, GraphError> {
        let mut delta = graph.create_delta(self.compiled.clone(), self.deleted.clone())?;
        for record in &self.records {
            delta.associate(record.symbol.clone(), std::slice::from_ref(&record.origin))?;
        }
        Ok(delta)
    }
}
