//! Per-round parameters and policy flags.

use serde::{Deserialize, Serialize};

/// Parameters of one differentiation round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferentiateParams {
    /// Label used in diagnostics and the outcome summary.
    pub session_name: String,
    /// When false the round only computes deletions; no rule runs and the
    /// affected set holds failed origins only.
    pub calculate_affected: bool,
    /// Whether a non-incremental outcome may still be integrated.
    pub integrate_non_incremental: bool,
    /// Hard cap on fixpoint iterations. Running out is non-incremental.
    pub max_iterations: Option<usize>,
}

impl Default for DifferentiateParams {
    fn default() -> Self {
        DifferentiateParams {
            session_name: "build".to_string(),
            calculate_affected: true,
            integrate_non_incremental: false,
            max_iterations: None,
        }
    }
}

impl DifferentiateParams {
    pub fn new(session_name: impl Into<String>) -> Self {
        DifferentiateParams {
            session_name: session_name.into(),
            ..Default::default()
        }
    }

    pub fn with_calculate_affected(mut self, enabled: bool) -> Self {
        self.calculate_affected = enabled;
        self
    }

    pub fn with_integrate_non_incremental(mut self, enabled: bool) -> Self {
        self.integrate_non_incremental = enabled;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }
}
