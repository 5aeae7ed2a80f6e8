//! Greedy grid refinement of a multilateration estimate

use std::collections::HashMap;

use nalgebra::Vector2;

/// Neighbour visiting order: up, down, left, right (row offset, column offset)
const NEIGHBOURS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Refined location and the residual it was accepted at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRefinement {
    pub position: Vector2<f64>,
    pub range: f64,
    pub ame: f64,
}

/// Walks a square grid centred on the initial estimate towards lower
/// absolute mean error. Stops at the first discrete local minimum.
pub struct GridSearchRefiner {
    pub speed_of_light: f64,
    /// Half-width of the grid (m)
    pub range: f64,
    /// Grid spacing (m)
    pub step: f64,
}

impl GridSearchRefiner {
    pub fn new(speed_of_light: f64, range: f64, step: f64) -> Self {
        Self {
            speed_of_light,
            range,
            step,
        }
    }

    /// Mean absolute mismatch between geometric range differences at `candidate`
    /// and the range differences implied by the time offsets
    pub fn absolute_mean_error(&self, anchors: &[Vector2<f64>], offsets: &[f64], candidate: &Vector2<f64>) -> f64 {
        let n = anchors.len().min(offsets.len());
        if n < 2 {
            return 0.0;
        }
        let d0 = (anchors[0] - candidate).norm();
        let total: f64 = (1..n)
            .map(|i| {
                let di = (anchors[i] - candidate).norm();
                let tdoa_range = (offsets[i] - offsets[0]) * self.speed_of_light;
                (di - d0 - tdoa_range).abs()
            })
            .sum();
        total / (n - 1) as f64
    }

    fn half_cells(&self) -> usize {
        if self.step > 0.0 && self.range > 0.0 {
            (self.range / self.step).ceil() as usize
        } else {
            0
        }
    }

    /// Greedy descent over a `(2M+1)²` grid centred on `initial`, `M = ceil(range / step)`.
    /// Cells are scored on first visit, so work scales with the walk rather than the grid.
    pub fn refine(&self, anchors: &[Vector2<f64>], offsets: &[f64], initial: Vector2<f64>) -> GridRefinement {
        let m = self.half_cells();
        let size = m.saturating_mul(2).saturating_add(1);

        // Row index runs along y, column along x
        let mut scores: HashMap<(usize, usize), f64> = HashMap::new();
        let mut score = |row: usize, col: usize| -> f64 {
            *scores.entry((row, col)).or_insert_with(|| {
                let candidate = self.cell_position(initial, m, row, col);
                self.absolute_mean_error(anchors, offsets, &candidate)
            })
        };

        let (mut row, mut col) = (m, m);
        let mut current = score(row, col);
        loop {
            let mut best = (row, col);
            let mut best_value = current;
            for (dr, dc) in NEIGHBOURS {
                let (Some(r), Some(c)) = (row.checked_add_signed(dr), col.checked_add_signed(dc)) else {
                    continue;
                };
                if r >= size || c >= size {
                    continue;
                }
                let value = score(r, c);
                if value < best_value {
                    best_value = value;
                    best = (r, c);
                }
            }
            if best == (row, col) {
                break;
            }
            (row, col) = best;
            current = best_value;
        }

        let position = self.cell_position(initial, m, row, col);
        GridRefinement {
            position,
            range: position.norm(),
            ame: current,
        }
    }

    fn cell_position(&self, centre: Vector2<f64>, m: usize, row: usize, col: usize) -> Vector2<f64> {
        let dx = (col as f64 - m as f64) * self.step;
        let dy = (row as f64 - m as f64) * self.step;
        Vector2::new(centre.x + dx, centre.y + dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SPEED_OF_LIGHT;

    fn anchors() -> Vec<Vector2<f64>> {
        vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(800.0, 0.0),
            Vector2::new(0.0, 800.0),
            Vector2::new(800.0, 800.0),
            Vector2::new(400.0, -500.0),
        ]
    }

    fn offsets_for(anchors: &[Vector2<f64>], transmitter: Vector2<f64>) -> Vec<f64> {
        anchors.iter().map(|a| (transmitter - a).norm() / SPEED_OF_LIGHT).collect()
    }

    #[test]
    fn test_ame_zero_at_true_location() {
        let refiner = GridSearchRefiner::new(SPEED_OF_LIGHT, 600.0, 100.0);
        let anchors = anchors();
        let transmitter = Vector2::new(350.0, 420.0);
        let offsets = offsets_for(&anchors, transmitter);

        let ame = refiner.absolute_mean_error(&anchors, &offsets, &transmitter);
        assert!(ame < 1e-6, "AME at truth = {}", ame);
        assert!(refiner.absolute_mean_error(&anchors, &offsets, &Vector2::new(0.0, 0.0)) > 1.0);
    }

    #[test]
    fn test_refinement_never_worsens() {
        let refiner = GridSearchRefiner::new(SPEED_OF_LIGHT, 600.0, 100.0);
        let anchors = anchors();
        let offsets = offsets_for(&anchors, Vector2::new(350.0, 420.0));

        for initial in [
            Vector2::new(0.0, 0.0),
            Vector2::new(900.0, -200.0),
            Vector2::new(340.0, 430.0),
            Vector2::new(-1500.0, 2000.0),
        ] {
            let before = refiner.absolute_mean_error(&anchors, &offsets, &initial);
            let refined = refiner.refine(&anchors, &offsets, initial);
            assert!(refined.ame <= before, "AME rose from {} to {}", before, refined.ame);
            assert_eq!(
                refined.ame,
                refiner.absolute_mean_error(&anchors, &offsets, &refined.position)
            );
            assert!((refined.range - refined.position.norm()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_walk_moves_towards_truth() {
        let refiner = GridSearchRefiner::new(SPEED_OF_LIGHT, 600.0, 100.0);
        let anchors = anchors();
        let transmitter = Vector2::new(400.0, 400.0);
        let offsets = offsets_for(&anchors, transmitter);

        let refined = refiner.refine(&anchors, &offsets, Vector2::new(200.0, 400.0));
        assert_eq!(refined.position, transmitter);
        assert!(refined.ame < 1e-6);
    }

    #[test]
    fn test_exact_estimate_stays_put() {
        let refiner = GridSearchRefiner::new(SPEED_OF_LIGHT, 600.0, 100.0);
        let anchors = anchors();
        let transmitter = Vector2::new(350.0, 420.0);
        let offsets = offsets_for(&anchors, transmitter);

        let refined = refiner.refine(&anchors, &offsets, transmitter);
        assert_eq!(refined.position, transmitter);
    }

    #[test]
    fn test_fine_step_scores_only_visited_cells() {
        // 12 million cells per side; a dense grid would not fit in memory
        let refiner = GridSearchRefiner::new(SPEED_OF_LIGHT, 600.0, 1e-4);
        let anchors = anchors();
        let transmitter = Vector2::new(350.0, 420.0);
        let offsets = offsets_for(&anchors, transmitter);
        let initial = transmitter + Vector2::new(0.01, -0.01);

        let before = refiner.absolute_mean_error(&anchors, &offsets, &initial);
        let refined = refiner.refine(&anchors, &offsets, initial);
        assert!(refined.ame <= before, "AME rose from {} to {}", before, refined.ame);
        assert!((refined.position - initial).norm() < 1.0);
    }

    #[test]
    fn test_zero_range_returns_initial() {
        let refiner = GridSearchRefiner::new(SPEED_OF_LIGHT, 0.0, 100.0);
        let anchors = anchors();
        let offsets = offsets_for(&anchors, Vector2::new(350.0, 420.0));
        let initial = Vector2::new(10.0, 20.0);

        let refined = refiner.refine(&anchors, &offsets, initial);
        assert_eq!(refined.position, initial);
    }
}
