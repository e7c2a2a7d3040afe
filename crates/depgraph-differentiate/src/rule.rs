//! The pluggable differentiation rule contract.

use depgraph_core::Node;

use crate::context::DifferentiateContext;
use crate::error::RuleError;

/// A language-specific unit deciding what a change affects.
///
/// Rules are registered on a [`Differentiator`](crate::Differentiator) in
/// the order they should run.
pub trait DifferentiateRule<N: Node>: Send + Sync {
    fn name(&self) -> &str;

    /// Inspects one iteration's records and queues affect requests on `ctx`.
    ///
    /// Returns `Ok(false)` when the change cannot be reasoned about
    /// incrementally. An `Err` aborts the whole round.
    fn differentiate(
        &self,
        ctx: &mut DifferentiateContext<'_, N>,
        before: &[N],
        after: &[N],
        with_errors: &[N],
    ) -> Result<bool, RuleError>;

    /// Called for every record about to be affected; returning false makes
    /// the round non-incremental.
    fn is_incremental(&self, _ctx: &DifferentiateContext<'_, N>, _affected: &N) -> bool {
        true
    }
}
