//! Error types for depgraph-graph.

use depgraph_storage::StorageError;
use thiserror::Error;

/// Errors produced by graph queries, composition, and integration.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The underlying map store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Indices of different kinds were composed together.
    #[error("cannot compose index '{found}' with index '{expected}'")]
    IndexKindMismatch { expected: String, found: String },

    /// Two index definitions share a name.
    #[error("duplicate index name: {0}")]
    DuplicateIndex(String),

    /// A composite view was built from nothing.
    #[error("a composite view needs at least one part")]
    EmptyComposite,

    /// The graph has no index with the requested name.
    #[error("no index named '{0}'")]
    MissingIndex(String),

    /// An outcome flagged as not integrable was offered to integrate.
    #[error("differentiation outcome is not integrable")]
    NotIntegrable,

    #[error("graph lock poisoned")]
    LockPoisoned,
}
