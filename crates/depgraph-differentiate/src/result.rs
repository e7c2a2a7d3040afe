//! The round outcome and the orchestrator's build decision.

use std::collections::BTreeSet;

use serde::Serialize;

use depgraph_core::{Node, OriginId, SymbolId};
use depgraph_graph::{Delta, Integrable};

/// The outcome of one differentiation round.
pub struct DifferentiateResult<N: Node> {
    pub(crate) session_name: String,
    pub(crate) delta: Delta<N>,
    pub(crate) deleted_nodes: Vec<N>,
    pub(crate) affected_origins: BTreeSet<OriginId>,
    pub(crate) failed_origins: BTreeSet<OriginId>,
    pub(crate) incremental: bool,
    pub(crate) integrable: bool,
}

impl<N: Node> DifferentiateResult<N> {
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn delta(&self) -> &Delta<N> {
        &self.delta
    }

    pub fn deleted_nodes(&self) -> &[N] {
        &self.deleted_nodes
    }

    /// Origins to add to this round's compile set. Includes failed origins.
    pub fn affected_origins(&self) -> &BTreeSet<OriginId> {
        &self.affected_origins
    }

    pub fn failed_origins(&self) -> &BTreeSet<OriginId> {
        &self.failed_origins
    }

    /// False means the affected set cannot be trusted.
    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    pub fn is_integrable(&self) -> bool {
        self.integrable
    }

    pub fn build_plan(&self) -> BuildPlan {
        plan_build(self)
    }

    pub fn summary(&self) -> OutcomeSummary {
        OutcomeSummary {
            session: self.session_name.clone(),
            incremental: self.incremental,
            integrable: self.integrable,
            affected_origins: self.affected_origins.iter().cloned().collect(),
            failed_origins: self.failed_origins.iter().cloned().collect(),
            deleted_nodes: self.deleted_nodes.iter().map(|n| n.id().clone()).collect(),
            plan: self.build_plan(),
        }
    }
}

impl<N: Node> Integrable<N> for DifferentiateResult<N> {
    fn is_integrable(&self) -> bool {
        self.integrable
    }

    fn delta(&self) -> &Delta<N> {
        &self.delta
    }

    fn deleted_nodes(&self) -> &[N] {
        &self.deleted_nodes
    }

    fn is_failed(&self, origin: &OriginId) -> bool {
        self.failed_origins.contains(origin)
    }
}

/// What the orchestrator does next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum BuildPlan {
    /// Recompile these origins on top of the ones already compiled.
    Incremental { recompile: BTreeSet<OriginId> },
    FullRebuild,
}

/// Never trusts the affected set of a non-incremental outcome.
pub fn plan_build<N: Node>(outcome: &DifferentiateResult<N>) -> BuildPlan {
    if outcome.incremental {
        BuildPlan::Incremental {
            recompile: outcome.affected_origins.clone(),
        }
    } else {
        BuildPlan::FullRebuild
    }
}

/// Serializable view of an outcome.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSummary {
    pub session: String,
    pub incremental: bool,
    pub integrable: bool,
    pub affected_origins: Vec<OriginId>,
    pub failed_origins: Vec<OriginId>,
    pub deleted_nodes: Vec<SymbolId>,
    pub plan: BuildPlan,
}
