//! Change propagation for incremental builds.
//!
//! Given the persisted graph (the state before a round), the round's
//! changeset, and the origins whose compilation failed, the
//! [`Differentiator`] computes which further origins must be recompiled.
//! Language knowledge lives in [`DifferentiateRule`]s; the engine owns the
//! fixpoint loop, deduplication, and the affection filter.
//!
//! The outcome is either incremental (its affected set can be trusted) or
//! not, in which case [`plan_build`] answers [`BuildPlan::FullRebuild`].
//! Rule failures are errors and never produce an outcome.
//!
//! # Modules
//!
//! - [`params`]: round parameters
//! - [`context`]: the state rules read and the affect operations
//! - [`rule`]: the rule contract
//! - [`engine`]: the fixpoint loop
//! - [`result`]: outcome, build plan, serializable summary
//! - [`rules`]: reference rules
//! - [`sink`]: diagnostic sinks
//! - [`error`]: [`DifferentiateError`] and [`RuleError`]

pub mod context;
pub mod engine;
pub mod error;
pub mod params;
pub mod result;
pub mod rule;
pub mod rules;
pub mod sink;

pub use context::DifferentiateContext;
pub use engine::Differentiator;
pub use error::{DifferentiateError, RuleError};
pub use params::DifferentiateParams;
pub use result::{plan_build, BuildPlan, DifferentiateResult, OutcomeSummary};
pub use rule::DifferentiateRule;
pub use rules::{SignatureRule, TransitiveRule};
pub use sink::{CompositeSink, DiagnosticSink, MemorySink, NullSink, TracingSink};
