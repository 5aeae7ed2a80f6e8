//! Three-pass weighted least squares multilateration from time differences of arrival
//!
//! The first measurement point is the common reference: every row of the linear
//! system relates point `i` to point 0. The passes are
//! 1. a linear WLS with correlated-noise weighting `Q`,
//! 2. the same system re-weighted by the stage-1 ranges (`W = B Q B`),
//! 3. a quadratic refinement exploiting `r0² = x² + y²` with weights propagated
//!    from the stage-2 covariance.

use nalgebra::{DMatrix, DVector, Vector2};

use super::wls::{invert, weighted_least_squares};
use crate::validation::error::{EstimationError, SolveStage};

/// Estimated transmitter location in local meters and its range to the reference point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TswlsSolution {
    pub position: Vector2<f64>,
    pub range: f64,
}

pub struct TswlsEstimator {
    /// Propagation speed (m/s)
    pub speed_of_light: f64,
    /// Fewest points accepted
    pub min_points: usize,
}

impl TswlsEstimator {
    pub fn new(speed_of_light: f64, min_points: usize) -> Self {
        Self {
            speed_of_light,
            min_points,
        }
    }

    /// Estimate the transmitter location from local anchor coordinates and time
    /// offsets in seconds. `anchors[0]` is the reference point.
    pub fn estimate(&self, anchors: &[Vector2<f64>], offsets: &[f64]) -> Result<TswlsSolution, EstimationError> {
        let n = anchors.len().min(offsets.len());
        let required = self.min_points.max(4);
        if n < required {
            return Err(EstimationError::InsufficientPoints { available: n, required });
        }
        let distinct_offsets = count_distinct(&offsets[..n]);
        if distinct_offsets < 2 {
            return Err(EstimationError::DegenerateTiming { distinct_offsets });
        }

        let anchors = &anchors[..n];
        let offsets = &offsets[..n];
        let (ga, h) = self.linear_system(anchors, offsets);
        let q = correlated_noise(n - 1);

        // Stage 1
        let z1 = weighted_least_squares(&ga, &q, &h, SolveStage::LinearPass)?;
        let stage1 = Vector2::new(z1[0], z1[1]);

        // Stage 2
        let b = DMatrix::from_diagonal(&DVector::from_iterator(
            n - 1,
            anchors[1..].iter().map(|a| (stage1 - a).norm()),
        ));
        let w2 = &b * &q * &b;
        let z2 = weighted_least_squares(&ga, &w2, &h, SolveStage::ReweightedPass)?;

        // Stage 3
        let cov_z2 = invert(&(ga.transpose() * &w2 * &ga), SolveStage::Covariance)?;
        let reference = anchors[0];
        let dx = z2[0] - reference.x;
        let dy = z2[1] - reference.y;
        let r0 = z2[2];

        let gp = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let hp = DVector::from_vec(vec![dx * dx, dy * dy, r0 * r0]);
        let bp = DMatrix::from_diagonal(&DVector::from_vec(vec![dx, dy, r0]));
        let wp_inv = &bp * cov_z2 * &bp * 4.0;
        let wp = invert(&wp_inv, SolveStage::QuadraticWeighting)?;
        let zp = weighted_least_squares(&gp, &wp, &hp, SolveStage::QuadraticPass)?;

        let position = if zp[0] >= 0.0 && zp[1] >= 0.0 {
            Vector2::new(
                reference.x + zp[0].sqrt().copysign(dx),
                reference.y + zp[1].sqrt().copysign(dy),
            )
        } else {
            Vector2::new(z2[0], z2[1])
        };

        Ok(TswlsSolution {
            position,
            range: position.norm(),
        })
    }

    /// Build `G_a` and `h` relating every point to the reference point
    fn linear_system(&self, anchors: &[Vector2<f64>], offsets: &[f64]) -> (DMatrix<f64>, DVector<f64>) {
        let rows = anchors.len() - 1;
        let reference = anchors[0];
        let k0 = reference.norm_squared();

        let mut ga = DMatrix::zeros(rows, 3);
        let mut h = DVector::zeros(rows);
        for i in 0..rows {
            let anchor = anchors[i + 1];
            let r_i0 = self.speed_of_light * (offsets[i + 1] - offsets[0]);
            ga[(i, 0)] = anchor.x - reference.x;
            ga[(i, 1)] = anchor.y - reference.y;
            ga[(i, 2)] = r_i0;
            h[i] = 0.5 * (anchor.norm_squared() - k0 - r_i0 * r_i0);
        }
        (ga, h)
    }
}

/// Noise covariance of differences taken against one shared reference: 1 on the
/// diagonal, 0.5 elsewhere
fn correlated_noise(size: usize) -> DMatrix<f64> {
    DMatrix::from_fn(size, size, |i, j| if i == j { 1.0 } else { 0.5 })
}

fn count_distinct(values: &[f64]) -> usize {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup();
    sorted.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SPEED_OF_LIGHT;

    fn synthesize(anchors: &[Vector2<f64>], transmitter: Vector2<f64>) -> Vec<f64> {
        anchors
            .iter()
            .map(|a| (transmitter - a).norm() / SPEED_OF_LIGHT)
            .collect()
    }

    fn survey_anchors() -> Vec<Vector2<f64>> {
        vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(500.0, 0.0),
            Vector2::new(0.0, 500.0),
            Vector2::new(500.0, 500.0),
            Vector2::new(250.0, -300.0),
            Vector2::new(-200.0, 250.0),
        ]
    }

    #[test]
    fn test_recovers_transmitter_from_exact_offsets() {
        let estimator = TswlsEstimator::new(SPEED_OF_LIGHT, 4);
        let anchors = survey_anchors();

        for transmitter in [Vector2::new(300.0, 200.0), Vector2::new(-150.0, 420.0)] {
            let offsets = synthesize(&anchors, transmitter);
            let solution = estimator.estimate(&anchors, &offsets).unwrap();
            let error = (solution.position - transmitter).norm();
            assert!(error < 0.5, "Position error too large: {} meters", error);
            assert!((solution.range - solution.position.norm()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_translated_anchors_shift_estimate() {
        let estimator = TswlsEstimator::new(SPEED_OF_LIGHT, 4);
        let shift = Vector2::new(1000.0, 1000.0);
        let transmitter = Vector2::new(-300.0, 200.0);

        let anchors = survey_anchors();
        let at_origin = estimator.estimate(&anchors, &synthesize(&anchors, transmitter)).unwrap();

        let shifted: Vec<Vector2<f64>> = anchors.iter().map(|a| a + shift).collect();
        let offsets = synthesize(&shifted, transmitter + shift);
        let translated = estimator.estimate(&shifted, &offsets).unwrap();

        let expected = Vector2::new(700.0, 1200.0);
        let error = (translated.position - expected).norm();
        assert!(error < 0.5, "Shifted estimate {:?} is {} meters off", translated.position, error);
        assert!((translated.position - shift - at_origin.position).norm() < 1e-3);
    }

    #[test]
    fn test_square_drive_converges_near_hull() {
        let estimator = TswlsEstimator::new(3e8, 4);
        let anchors = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(100.0, 0.0),
            Vector2::new(0.0, 100.0),
            Vector2::new(100.0, 100.0),
        ];
        let offsets = vec![0.0, 3.3e-7, 3.3e-7, 4.7e-7];

        let solution = estimator.estimate(&anchors, &offsets).unwrap();
        assert!(solution.position.x.is_finite() && solution.position.y.is_finite());
        assert!(solution.position.x.abs() < 50.0, "x = {}", solution.position.x);
        assert!(solution.position.y.abs() < 50.0, "y = {}", solution.position.y);
        // Symmetric geometry gives a symmetric estimate
        assert!((solution.position.x - solution.position.y).abs() < 1e-6);
    }

    #[test]
    fn test_deterministic() {
        let estimator = TswlsEstimator::new(SPEED_OF_LIGHT, 4);
        let anchors = survey_anchors();
        let mut offsets = synthesize(&anchors, Vector2::new(120.0, -80.0));
        offsets[3] += 2e-8;

        let first = estimator.estimate(&anchors, &offsets).unwrap();
        let second = estimator.estimate(&anchors, &offsets).unwrap();
        assert_eq!(first.position.x.to_bits(), second.position.x.to_bits());
        assert_eq!(first.position.y.to_bits(), second.position.y.to_bits());
    }

    #[test]
    fn test_too_few_points() {
        let estimator = TswlsEstimator::new(SPEED_OF_LIGHT, 4);
        let anchors = survey_anchors()[..3].to_vec();
        let offsets = vec![0.0, 1e-7, 2e-7];

        let result = estimator.estimate(&anchors, &offsets);
        assert_eq!(
            result,
            Err(EstimationError::InsufficientPoints { available: 3, required: 4 })
        );
    }

    #[test]
    fn test_identical_offsets_rejected() {
        let estimator = TswlsEstimator::new(SPEED_OF_LIGHT, 4);
        let anchors = survey_anchors();
        let offsets = vec![1e-6; anchors.len()];

        let result = estimator.estimate(&anchors, &offsets);
        assert_eq!(result, Err(EstimationError::DegenerateTiming { distinct_offsets: 1 }));
    }

    #[test]
    fn test_collinear_anchors_are_singular() {
        let estimator = TswlsEstimator::new(SPEED_OF_LIGHT, 4);
        let anchors: Vec<Vector2<f64>> = (0..5).map(|i| Vector2::new(100.0 * i as f64, 0.0)).collect();
        let offsets: Vec<f64> = (0..5).map(|i| i as f64 * 1e-7).collect();

        let result = estimator.estimate(&anchors, &offsets);
        assert!(matches!(result, Err(EstimationError::SingularMatrix { .. })));
    }
}
