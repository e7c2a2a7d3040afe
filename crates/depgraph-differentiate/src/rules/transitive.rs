use std::marker::PhantomData;

use depgraph_core::{Node, Usage};

use crate::context::DifferentiateContext;
use crate::error::RuleError;
use crate::rule::DifferentiateRule;

/// Every recompiled record affects all of its users.
///
/// Models languages with textual inclusion, where any change to a unit
/// reaches everything that includes it.
pub struct TransitiveRule<N> {
    _marker: PhantomData<fn(&N)>,
}

impl<N> TransitiveRule<N> {
    pub fn new() -> Self {
        TransitiveRule {
            _marker: PhantomData,
        }
    }
}

impl<N> Default for TransitiveRule<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Node> DifferentiateRule<N> for TransitiveRule<N> {
    fn name(&self) -> &str {
        "transitive"
    }

    fn differentiate(
        &self,
        ctx: &mut DifferentiateContext<'_, N>,
        before: &[N],
        after: &[N],
        _with_errors: &[N],
    ) -> Result<bool, RuleError> {
        for node in before.iter().chain(after) {
            ctx.affect_usage(Usage::of(node.id().clone()));
        }
        Ok(true)
    }
}
