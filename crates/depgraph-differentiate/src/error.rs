//! Error types for depgraph-differentiate.
//!
//! Both variants are fatal to the round. A round that cannot reason about a
//! change is not an error; it yields a non-incremental
//! [`DifferentiateResult`](crate::DifferentiateResult).

use depgraph_graph::GraphError;
use thiserror::Error;

/// Raised by a rule's `differentiate` call.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("{0}")]
    Failed(String),
}

/// Aborts a differentiation round.
#[derive(Debug, Error)]
pub enum DifferentiateError {
    /// Reading the graph or changeset failed.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("rule '{rule}' failed: {source}")]
    RuleFailed {
        rule: String,
        #[source]
        source: RuleError,
    },
}
