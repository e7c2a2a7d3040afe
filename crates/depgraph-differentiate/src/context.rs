//! The per-round state rules read from and write to.
//!
//! Rules never touch the affected set directly. The affect operations queue
//! requests which the engine resolves against the graph after every rule
//! of an iteration has run.

use std::collections::{BTreeSet, HashSet};

use depgraph_core::{Node, OriginId, SymbolId, Usage};
use depgraph_graph::{Delta, GraphView};

use crate::params::DifferentiateParams;
use crate::sink::DiagnosticSink;

pub(crate) type Constraint<N> = Box<dyn Fn(&N) -> bool>;
pub(crate) type UsageQuery<N> = Box<dyn Fn(&N, &Usage) -> bool>;

/// One queued affect request.
pub(crate) enum Pending<N> {
    /// Dependents whose record carries a usage covered by `usage`.
    Usage {
        usage: Usage,
        constraint: Option<Constraint<N>>,
    },
    /// Dependents of `target` with a usage of it matching `query`.
    Query { target: SymbolId, query: UsageQuery<N> },
    /// Records with an identifier in `scope` and any usage matching `query`.
    Scope {
        scope: BTreeSet<SymbolId>,
        query: UsageQuery<N>,
    },
    /// Every record of one origin.
    Origin(OriginId),
}

/// Read accessors and affect operations for one differentiation round.
pub struct DifferentiateContext<'a, N: Node> {
    params: &'a DifferentiateParams,
    graph: &'a dyn GraphView<N>,
    delta: &'a Delta<N>,
    sink: &'a dyn DiagnosticSink,
    deleted: HashSet<SymbolId>,
    failed: &'a BTreeSet<OriginId>,
    affected: BTreeSet<OriginId>,
    processed: HashSet<Usage>,
    pending: Vec<Pending<N>>,
}

impl<'a, N: Node> DifferentiateContext<'a, N> {
    pub(crate) fn new(
        params: &'a DifferentiateParams,
        graph: &'a dyn GraphView<N>,
        delta: &'a Delta<N>,
        sink: &'a dyn DiagnosticSink,
        deleted: HashSet<SymbolId>,
        failed: &'a BTreeSet<OriginId>,
    ) -> Self {
        DifferentiateContext {
            params,
            graph,
            delta,
            sink,
            deleted,
            failed,
            affected: BTreeSet::new(),
            processed: HashSet::new(),
            pending: Vec::new(),
        }
    }

    // -------------------------------------------------------------------
    // Read accessors
    // -------------------------------------------------------------------

    pub fn params(&self) -> &DifferentiateParams {
        self.params
    }

    /// The persisted graph as it was before this round.
    pub fn graph(&self) -> &dyn GraphView<N> {
        self.graph
    }

    /// The changeset of this round.
    pub fn delta(&self) -> &Delta<N> {
        self.delta
    }

    pub fn sink(&self) -> &dyn DiagnosticSink {
        self.sink
    }

    /// True if `origin` was part of this round's input.
    pub fn is_compiled(&self, origin: &OriginId) -> bool {
        self.delta.is_compiled(origin)
    }

    /// True if no record with identifier `id` exists after this round.
    pub fn is_deleted(&self, id: &SymbolId) -> bool {
        self.deleted.contains(id)
    }

    pub fn is_failed(&self, origin: &OriginId) -> bool {
        self.failed.contains(origin)
    }

    pub fn is_affected(&self, origin: &OriginId) -> bool {
        self.affected.contains(origin)
    }

    /// Origins affected so far, not counting failed origins.
    pub fn affected_origins(&self) -> &BTreeSet<OriginId> {
        &self.affected
    }

    // -------------------------------------------------------------------
    // Affect operations
    // -------------------------------------------------------------------

    /// Recompiles every dependent whose record carries `usage` (or, for a
    /// bare usage, any usage of the same target). Repeats are no-ops.
    pub fn affect_usage(&mut self, usage: Usage) {
        if self.processed.insert(usage.clone()) {
            self.sink.debug_lazy(&|| format!("affect usage {usage}"));
            self.pending.push(Pending::Usage {
                usage,
                constraint: None,
            });
        }
    }

    /// Like [`affect_usage`](Self::affect_usage), restricted to dependents
    /// whose record satisfies `constraint`.
    pub fn affect_usage_if(&mut self, usage: Usage, constraint: impl Fn(&N) -> bool + 'static) {
        self.sink
            .debug_lazy(&|| format!("affect usage {usage} (constrained)"));
        self.pending.push(Pending::Usage {
            usage,
            constraint: Some(Box::new(constraint)),
        });
    }

    /// Recompiles dependents of `target` holding a usage of it that matches
    /// `query`.
    pub fn affect_usage_query(
        &mut self,
        target: SymbolId,
        query: impl Fn(&N, &Usage) -> bool + 'static,
    ) {
        self.sink
            .debug_lazy(&|| format!("affect usages of {target} by query"));
        self.pending.push(Pending::Query {
            target,
            query: Box::new(query),
        });
    }

    /// Searches only records whose identifier is in `scope` for a usage
    /// matching `query`.
    pub fn affect_usages_in_scope(
        &mut self,
        scope: impl IntoIterator<Item = SymbolId>,
        query: impl Fn(&N, &Usage) -> bool + 'static,
    ) {
        let scope: BTreeSet<SymbolId> = scope.into_iter().collect();
        self.sink
            .debug_lazy(&|| format!("affect usages in a scope of {} records", scope.len()));
        self.pending.push(Pending::Scope {
            scope,
            query: Box::new(query),
        });
    }

    /// Recompiles a whole origin.
    pub fn affect_origin(&mut self, origin: OriginId) {
        self.sink.debug_lazy(&|| format!("affect origin {origin}"));
        self.pending.push(Pending::Origin(origin));
    }

    // -------------------------------------------------------------------
    // Engine side
    // -------------------------------------------------------------------

    pub(crate) fn take_pending(&mut self) -> Vec<Pending<N>> {
        std::mem::take(&mut self.pending)
    }

    /// Returns false if `origin` was already affected.
    pub(crate) fn mark_affected(&mut self, origin: OriginId) -> bool {
        self.affected.insert(origin)
    }

    pub(crate) fn into_affected(self) -> BTreeSet<OriginId> {
        self.affected
    }
}
