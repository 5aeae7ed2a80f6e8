//! High/Low confidence labelling of sector estimates

use crate::core::{Confidence, Technology};
use crate::utils::config::ConfidenceConfig;

/// Labels an estimate `Low` only when it is both sparse and weak
#[derive(Debug, Clone)]
pub struct ConfidenceClassifier {
    thresholds: ConfidenceConfig,
}

impl ConfidenceClassifier {
    pub fn new(thresholds: ConfidenceConfig) -> Self {
        Self { thresholds }
    }

    /// `signal` is the representative CINR, or Ec/Io for Ec/Io-based technologies
    pub fn classify(&self, num_points: usize, signal: f64, technology: Technology) -> Confidence {
        let (min_points, min_signal) = if technology.is_ecio_based() {
            (self.thresholds.ecio_min_points, self.thresholds.ecio_min_db)
        } else {
            (self.thresholds.cinr_min_points, self.thresholds.cinr_min_db)
        };

        if num_points < min_points && signal < min_signal {
            Confidence::Low
        } else {
            Confidence::High
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ConfidenceClassifier {
        ConfidenceClassifier::new(ConfidenceConfig::default())
    }

    #[test]
    fn test_low_requires_both_conditions() {
        let c = classifier();
        assert_eq!(c.classify(5, 3.0, Technology::Lte), Confidence::Low);
        // Enough points
        assert_eq!(c.classify(8, 3.0, Technology::Lte), Confidence::High);
        // Strong signal
        assert_eq!(c.classify(5, 12.0, Technology::Nr), Confidence::High);
    }

    #[test]
    fn test_ecio_thresholds_for_wcdma() {
        let c = classifier();
        // -11 dB is weak CINR but acceptable Ec/Io
        assert_eq!(c.classify(5, -9.0, Technology::Wcdma), Confidence::High);
        assert_eq!(c.classify(5, -11.0, Technology::Wcdma), Confidence::Low);
        assert_eq!(c.classify(5, -9.0, Technology::Lte), Confidence::Low);
    }
}
