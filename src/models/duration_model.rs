use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{FEATURE_NAMES, FeatureVector};
use crate::config::FEATURE_COUNT;
use crate::config::constants::model::{
    LEARNING_RATE, MAX_DEPTH, MAX_MULTIPLIER, MIN_MULTIPLIER, MIN_SAMPLES_LEAF,
    MIN_SAMPLES_SPLIT, MIN_TRAINING_SAMPLES, N_ESTIMATORS, NEUTRAL_MULTIPLIER,
};
use crate::models::boosting::{BoostingParams, GradientBoostedTrees, TreeParams};
use crate::models::scaler::StandardScaler;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("feature width mismatch: model expects {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("non-finite value in model input or output")]
    NonFinite,
    #[error("trained parameters are inconsistent (corrupt tree or scaler)")]
    Corrupt,
}

pub const DEFAULT_BOOSTING: BoostingParams = BoostingParams {
    n_estimators: N_ESTIMATORS,
    learning_rate: LEARNING_RATE,
    tree: TreeParams {
        max_depth: MAX_DEPTH,
        min_samples_split: MIN_SAMPLES_SPLIT,
        min_samples_leaf: MIN_SAMPLES_LEAF,
    },
};

/// Predicts a duration multiplier (realized / base duration) from a feature vector.
///
/// Normalisation and regression parameters are fitted together and travel as one
/// value, so a persisted model always restores a matching scaler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationModel {
    trained: Option<TrainedParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TrainedParams {
    scaler: StandardScaler,
    booster: GradientBoostedTrees,
    importances: Vec<f64>,
}

impl TrainedParams {
    fn is_consistent(&self) -> bool {
        self.scaler.dims() == self.booster.n_features()
            && self.importances.len() == self.booster.n_features()
            && self.booster.is_consistent()
    }
}

impl DurationModel {
    pub fn untrained() -> Self {
        Self::default()
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    /// Train on `features[i] -> targets[i]`.
    /// Fewer than `MIN_TRAINING_SAMPLES` usable rows leaves the model unchanged.
    pub fn fit(&mut self, features: &[FeatureVector], targets: &[f64]) {
        if features.len() != targets.len() {
            log::warn!(
                "Refusing to fit: {} feature rows vs {} targets",
                features.len(),
                targets.len()
            );
            return;
        }
        if features.len() < MIN_TRAINING_SAMPLES {
            return;
        }

        let scaler = StandardScaler::fit(features);
        let rows: Vec<Vec<f64>> = features
            .iter()
            .filter_map(|f| scaler.transform(f.as_slice()).ok())
            .collect();

        let (booster, importances) = GradientBoostedTrees::fit(&rows, targets, &DEFAULT_BOOSTING);

        self.trained = Some(TrainedParams {
            scaler,
            booster,
            importances,
        });
    }

    /// Structural check for parameters restored from storage. Untrained is always consistent.
    pub fn is_consistent(&self) -> bool {
        self.trained.as_ref().is_none_or(|params| {
            params.booster.n_features() == FEATURE_COUNT && params.is_consistent()
        })
    }

    /// Multiplier clamped to [0.5, 3.0]; 1.0 while untrained.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let Some(params) = &self.trained else {
            return Ok(NEUTRAL_MULTIPLIER);
        };

        if !features.is_finite() {
            return Err(ModelError::NonFinite);
        }
        if params.booster.n_features() != FEATURE_COUNT {
            return Err(ModelError::ShapeMismatch {
                expected: FEATURE_COUNT,
                actual: params.booster.n_features(),
            });
        }
        if !params.is_consistent() {
            return Err(ModelError::Corrupt);
        }

        let scaled = params.scaler.transform(features.as_slice())?;
        let prediction = params.booster.predict(&scaled);
        if !prediction.is_finite() {
            return Err(ModelError::NonFinite);
        }

        Ok(prediction.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER))
    }

    /// Importance per named feature. Interpretability only; empty while untrained.
    pub fn feature_importance(&self) -> BTreeMap<&'static str, f64> {
        match &self.trained {
            Some(params) => FEATURE_NAMES
                .iter()
                .copied()
                .zip(params.importances.iter().copied())
                .collect(),
            None => BTreeMap::new(),
        }
    }
}
