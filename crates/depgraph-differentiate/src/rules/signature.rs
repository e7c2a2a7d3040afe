use depgraph_core::{deep_diff, Symbol, Usage};

use crate::context::DifferentiateContext;
use crate::error::RuleError;
use crate::rule::DifferentiateRule;

/// Invalidation by externally visible shape for [`Symbol`] records.
///
/// - a removed symbol affects every usage of it
/// - an added symbol affects usages of its identifier, which resolves
///   previously dangling references
/// - a changed signature or generated flag affects every usage
/// - a changed kind cannot be handled incrementally
///
/// Generated symbols veto incremental builds when they become affected.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignatureRule;

impl DifferentiateRule<Symbol> for SignatureRule {
    fn name(&self) -> &str {
        "signature"
    }

    fn differentiate(
        &self,
        ctx: &mut DifferentiateContext<'_, Symbol>,
        before: &[Symbol],
        after: &[Symbol],
        _with_errors: &[Symbol],
    ) -> Result<bool, RuleError> {
        let diff = deep_diff(before, after);

        for change in &diff.changed {
            if change.diff.kind_changed {
                ctx.sink().debug_lazy(&|| {
                    format!(
                        "{} changed kind {} -> {}",
                        change.now.id, change.past.kind, change.now.kind
                    )
                });
                return Ok(false);
            }
            if change.diff.signature_changed || change.diff.generated_changed {
                ctx.affect_usage(Usage::of(change.now.id.clone()));
            }
        }
        for removed in &diff.removed {
            ctx.affect_usage(Usage::of(removed.id.clone()));
        }
        for added in &diff.added {
            ctx.affect_usage(Usage::of(added.id.clone()));
        }
        Ok(true)
    }

    fn is_incremental(&self, ctx: &DifferentiateContext<'_, Symbol>, affected: &Symbol) -> bool {
        if affected.generated {
            ctx.sink()
                .debug_lazy(&|| format!("generated symbol {} is affected", affected.id));
            return false;
        }
        true
    }
}
