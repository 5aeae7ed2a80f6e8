use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::core::CellKey;

/// Solve passes of the multilateration estimator, used to tag singular-matrix failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStage {
    /// Stage 1 linear WLS with the correlated-noise weighting
    LinearPass,
    /// Stage 2 WLS re-weighted by stage-1 ranges
    ReweightedPass,
    /// Covariance of the stage-2 solution
    Covariance,
    /// Inversion of the stage-3 weighting matrix
    QuadraticWeighting,
    /// Stage 3 squared-offset WLS
    QuadraticPass,
}

impl fmt::Display for SolveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolveStage::LinearPass => "linear pass",
            SolveStage::ReweightedPass => "re-weighted pass",
            SolveStage::Covariance => "covariance",
            SolveStage::QuadraticWeighting => "quadratic weighting",
            SolveStage::QuadraticPass => "quadratic pass",
        };
        f.write_str(name)
    }
}

/// Reasons a cell group produces no estimate.
///
/// All of them are local to one group: the batch continues with the next group.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    #[error("singular matrix in {stage}")]
    SingularMatrix { stage: SolveStage },

    #[error("insufficient points: {available} available, {required} required")]
    InsufficientPoints { available: usize, required: usize },

    #[error("degenerate timing: {distinct_offsets} distinct time offset(s)")]
    DegenerateTiming { distinct_offsets: usize },
}

impl EstimationError {
    /// Short stable label used when tallying failures
    pub fn kind(&self) -> &'static str {
        match self {
            EstimationError::SingularMatrix { .. } => "SingularMatrix",
            EstimationError::InsufficientPoints { .. } => "InsufficientPoints",
            EstimationError::DegenerateTiming { .. } => "DegenerateTiming",
        }
    }
}

/// Per-file record of groups that were skipped and why
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureReport {
    failures: Vec<(CellKey, EstimationError)>,
}

impl FailureReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: CellKey, error: EstimationError) {
        self.failures.push((key, error));
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[(CellKey, EstimationError)] {
        &self.failures
    }

    /// Failure counts by error kind, in name order
    pub fn counts_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (_, error) in &self.failures {
            *counts.entry(error.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn merge(&mut self, other: FailureReport) {
        self.failures.extend(other.failures);
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "no skipped groups");
        }
        let summary: Vec<String> = self
            .counts_by_kind()
            .into_iter()
            .map(|(kind, count)| format!("{}={}", kind, count))
            .collect();
        write!(f, "{} skipped group(s): {}", self.failures.len(), summary.join(", "))
    }
}
