//! The fixpoint differentiation engine.
//!
//! Iteration 0 hands every rule the past records of the round's origins
//! (`before`), the changeset's records (`after`), and the past records of
//! failed origins. Rules queue affect requests; the engine resolves them
//! against the graph's reverse index into origins. Each newly affected
//! origin will be recompiled, so its prior records become both `before` and
//! `after` of the next iteration, which lets rules propagate effects through
//! them. The loop ends when an iteration affects nothing new.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use depgraph_core::{Node, OriginId, SymbolId};
use depgraph_graph::{Delta, GraphError, GraphView};

use crate::context::{DifferentiateContext, Pending};
use crate::error::DifferentiateError;
use crate::params::DifferentiateParams;
use crate::result::DifferentiateResult;
use crate::rule::DifferentiateRule;
use crate::sink::{DiagnosticSink, TracingSink, TARGET};

type AffectionFilter = dyn Fn(&OriginId) -> bool + Send + Sync;

/// Why a round stopped being incremental.
enum Escalation {
    RuleGaveUp(String),
    Vetoed { rule: String, node: SymbolId },
    IterationLimit(usize),
}

/// Computes which additional origins a changeset forces to recompile.
pub struct Differentiator<N: Node> {
    rules: Vec<Box<dyn DifferentiateRule<N>>>,
    params: DifferentiateParams,
    sink: Arc<dyn DiagnosticSink>,
    affection_filter: Option<Arc<AffectionFilter>>,
}

impl<N: Node> Differentiator<N> {
    pub fn new(params: DifferentiateParams) -> Self {
        Differentiator {
            rules: Vec::new(),
            params,
            sink: Arc::new(TracingSink),
            affection_filter: None,
        }
    }

    /// Rules run in registration order.
    pub fn with_rule(mut self, rule: impl DifferentiateRule<N> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Origins rejected by `filter` are never reported as affected.
    pub fn with_affection_filter(
        mut self,
        filter: impl Fn(&OriginId) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.affection_filter = Some(Arc::new(filter));
        self
    }

    pub fn params(&self) -> &DifferentiateParams {
        &self.params
    }

    /// Runs one round.
    ///
    /// `graph` is only read. `failed` lists origins whose compilation
    /// failed; they always end up affected and their records are kept.
    pub fn differentiate(
        &self,
        graph: &dyn GraphView<N>,
        delta: Delta<N>,
        failed: &BTreeSet<OriginId>,
    ) -> Result<DifferentiateResult<N>, DifferentiateError> {
        let session = self.params.session_name.as_str();
        let span = tracing::debug_span!(target: TARGET, "differentiate", session);
        let _entered = span.enter();

        let mut before = Vec::new();
        let mut with_errors = Vec::new();
        for origin in delta.base_origins() {
            let records = graph.nodes(origin)?;
            if failed.contains(origin) {
                with_errors.extend(records);
            } else {
                before.extend(records);
            }
        }
        let after = delta.all_nodes()?;

        let deleted_nodes = self.deleted_nodes(graph, &delta, failed, &before, &after)?;
        let deleted_ids: HashSet<SymbolId> = deleted_nodes.iter().map(|n| n.id().clone()).collect();

        let mut ctx = DifferentiateContext::new(
            &self.params,
            graph,
            &delta,
            self.sink.as_ref(),
            deleted_ids,
            failed,
        );

        let escalation = if self.params.calculate_affected {
            self.fixpoint(&mut ctx, before, after, with_errors)?
        } else {
            None
        };

        let mut affected = ctx.into_affected();
        affected.extend(failed.iter().cloned());

        let incremental = escalation.is_none();
        if let Some(reason) = escalation {
            let reason = match reason {
                Escalation::RuleGaveUp(rule) => format!("rule '{rule}' cannot handle the change"),
                Escalation::Vetoed { rule, node } => {
                    format!("rule '{rule}' vetoed incremental build for {node}")
                }
                Escalation::IterationLimit(max) => format!("no fixpoint after {max} iterations"),
            };
            tracing::info!(target: TARGET, session, %reason, "falling back to full rebuild");
            self.sink.debug(&reason);
        }

        Ok(DifferentiateResult {
            session_name: self.params.session_name.clone(),
            delta,
            deleted_nodes,
            affected_origins: affected,
            failed_origins: failed.clone(),
            incremental,
            integrable: incremental || self.params.integrate_non_incremental,
        })
    }

    /// Past records with no surviving version anywhere after the round.
    fn deleted_nodes(
        &self,
        graph: &dyn GraphView<N>,
        delta: &Delta<N>,
        failed: &BTreeSet<OriginId>,
        before: &[N],
        after: &[N],
    ) -> Result<Vec<N>, GraphError> {
        let after_ids: HashSet<&SymbolId> = after.iter().map(|n| n.id()).collect();
        let mut seen = HashSet::new();
        let mut deleted = Vec::new();
        for node in before {
            if after_ids.contains(node.id()) || !seen.insert(node.id().clone()) {
                continue;
            }
            let survives_elsewhere = graph
                .sources(node.id())?
                .iter()
                .any(|origin| !delta.is_compiled(origin) || failed.contains(origin));
            if !survives_elsewhere {
                deleted.push(node.clone());
            }
        }
        Ok(deleted)
    }

    fn fixpoint(
        &self,
        ctx: &mut DifferentiateContext<'_, N>,
        mut before: Vec<N>,
        mut after: Vec<N>,
        mut with_errors: Vec<N>,
    ) -> Result<Option<Escalation>, DifferentiateError> {
        let mut iteration = 0;
        loop {
            if let Some(max) = self.params.max_iterations {
                if iteration >= max {
                    return Ok(Some(Escalation::IterationLimit(max)));
                }
            }
            iteration += 1;

            for rule in &self.rules {
                let proceed = rule
                    .differentiate(ctx, &before, &after, &with_errors)
                    .map_err(|source| DifferentiateError::RuleFailed {
                        rule: rule.name().to_string(),
                        source,
                    })?;
                if !proceed {
                    return Ok(Some(Escalation::RuleGaveUp(rule.name().to_string())));
                }
            }

            let newly_affected = match self.resolve(ctx)? {
                Ok(origins) => origins,
                Err(escalation) => return Ok(Some(escalation)),
            };
            if newly_affected.is_empty() {
                tracing::debug!(target: TARGET, iteration, "reached fixpoint");
                return Ok(None);
            }

            let graph = ctx.graph();
            let mut next = Vec::new();
            for origin in &newly_affected {
                next.extend(graph.nodes(origin)?);
            }
            tracing::debug!(
                target: TARGET,
                iteration,
                affected = newly_affected.len(),
                "propagating through newly affected origins"
            );
            before = next.clone();
            after = next;
            with_errors.clear();
        }
    }

    /// Turns queued affect requests into newly affected origins.
    ///
    /// The inner `Err` carries an `is_incremental` veto.
    fn resolve(
        &self,
        ctx: &mut DifferentiateContext<'_, N>,
    ) -> Result<Result<Vec<OriginId>, Escalation>, GraphError> {
        let mut newly_affected = Vec::new();
        for request in ctx.take_pending() {
            for (origin, matched) in self.candidates(ctx, &request)? {
                if ctx.is_affected(&origin) || ctx.is_compiled(&origin) || !self.accepts(&origin) {
                    continue;
                }
                for node in &matched {
                    for rule in &self.rules {
                        if !rule.is_incremental(ctx, node) {
                            return Ok(Err(Escalation::Vetoed {
                                rule: rule.name().to_string(),
                                node: node.id().clone(),
                            }));
                        }
                    }
                }
                ctx.sink()
                    .debug_lazy(&|| format!("affected origin {origin}"));
                if ctx.mark_affected(origin.clone()) {
                    newly_affected.push(origin);
                }
            }
        }
        Ok(Ok(newly_affected))
    }

    fn accepts(&self, origin: &OriginId) -> bool {
        self.affection_filter
            .as_ref()
            .map_or(true, |filter| filter(origin))
    }

    /// Origins holding a record matched by `request`, with the matched
    /// records. Origins come out in identifier order.
    fn candidates(
        &self,
        ctx: &DifferentiateContext<'_, N>,
        request: &Pending<N>,
    ) -> Result<Vec<(OriginId, Vec<N>)>, GraphError> {
        let graph = ctx.graph();
        let (ids, matches): (BTreeSet<SymbolId>, Box<dyn Fn(&N) -> bool + '_>) = match request {
            Pending::Usage { usage, constraint } => (
                graph.depending_nodes(usage.target())?,
                Box::new(move |node: &N| {
                    node.usages().iter().any(|u| usage.covers(u))
                        && constraint.as_ref().map_or(true, |c| c(node))
                }),
            ),
            Pending::Query { target, query } => (
                graph.depending_nodes(target)?,
                Box::new(move |node: &N| {
                    node.usages()
                        .iter()
                        .any(|u| u.target() == target && query(node, u))
                }),
            ),
            Pending::Scope { scope, query } => (
                scope.clone(),
                Box::new(move |node: &N| node.usages().iter().any(|u| query(node, u))),
            ),
            Pending::Origin(origin) => {
                return Ok(vec![(origin.clone(), graph.nodes(origin)?)]);
            }
        };

        let mut origins = BTreeSet::new();
        for id in &ids {
            origins.extend(graph.sources(id)?);
        }
        let mut candidates = Vec::new();
        for origin in origins {
            let matched: Vec<N> = graph
                .nodes(&origin)?
                .into_iter()
                .filter(|node| ids.contains(node.id()) && matches(node))
                .collect();
            if !matched.is_empty() {
                candidates.push((origin, matched));
            }
        }
        Ok(candidates)
    }
}
