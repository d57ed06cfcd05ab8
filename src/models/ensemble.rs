use serde::{Deserialize, Serialize};

use crate::config::constants::ensemble::{WEIGHT_CURRENT, WEIGHT_HISTORICAL, WEIGHT_MODEL};

/// Fixed blend of the three multiplier signals. Weights sum to 1.0, so the
/// blend never leaves the range spanned by its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    pub model: f64,
    pub historical: f64,
    pub current: f64,
}

pub const ENSEMBLE_WEIGHTS: EnsembleWeights = EnsembleWeights {
    model: WEIGHT_MODEL,
    historical: WEIGHT_HISTORICAL,
    current: WEIGHT_CURRENT,
};

impl Default for EnsembleWeights {
    fn default() -> Self {
        ENSEMBLE_WEIGHTS
    }
}

impl EnsembleWeights {
    pub fn total(&self) -> f64 {
        self.model + self.historical + self.current
    }

    pub fn blend(&self, model: f64, historical: f64, current: f64) -> f64 {
        self.model * model + self.historical * historical + self.current * current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        assert!((ENSEMBLE_WEIGHTS.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn equal_inputs_pass_through() {
        for v in [0.5, 1.0, 1.37, 3.0] {
            assert!((ENSEMBLE_WEIGHTS.blend(v, v, v) - v).abs() < 1e-12);
        }
    }

    #[test]
    fn blend_is_weighted_sum() {
        let out = ENSEMBLE_WEIGHTS.blend(1.0, 2.0, 3.0);
        assert!((out - (0.5 + 0.6 + 0.6)).abs() < 1e-12);
    }
}
