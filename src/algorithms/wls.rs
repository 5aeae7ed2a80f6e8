//! Generic weighted least squares solve
//!
//! `z = (Gᵀ W⁻¹ G)⁻¹ Gᵀ W⁻¹ h`

use nalgebra::{DMatrix, DVector};

use crate::validation::error::{EstimationError, SolveStage};

/// Invert a square matrix, treating non-finite results as singular
pub fn invert(matrix: &DMatrix<f64>, stage: SolveStage) -> Result<DMatrix<f64>, EstimationError> {
    match matrix.clone().try_inverse() {
        Some(inverse) if inverse.iter().all(|v| v.is_finite()) => Ok(inverse),
        _ => Err(EstimationError::SingularMatrix { stage }),
    }
}

/// Solve the weighted normal equations for design `g`, weighting `w` and observations `h`.
///
/// Fails with `SingularMatrix` tagged with `stage` when either `w` or `Gᵀ W⁻¹ G`
/// cannot be inverted.
pub fn weighted_least_squares(
    g: &DMatrix<f64>,
    w: &DMatrix<f64>,
    h: &DVector<f64>,
    stage: SolveStage,
) -> Result<DVector<f64>, EstimationError> {
    let w_inv = invert(w, stage)?;
    let gt_w_inv = g.transpose() * w_inv;
    let normal = &gt_w_inv * g;
    let cov_z = invert(&normal, stage)?;

    let z = cov_z * (gt_w_inv * h);
    if z.iter().all(|v| v.is_finite()) {
        Ok(z)
    } else {
        Err(EstimationError::SingularMatrix { stage })
    }
}
