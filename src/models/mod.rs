mod boosting;
mod duration_model;
mod ensemble;
mod scaler;
mod snapshot;

pub use boosting::{BoostingParams, GradientBoostedTrees, RegressionTree, TreeParams};
pub use duration_model::{DEFAULT_BOOSTING, DurationModel, ModelError};
pub use ensemble::{ENSEMBLE_WEIGHTS, EnsembleWeights};
pub use scaler::StandardScaler;
pub use snapshot::{PredictorSnapshot, multiplier_base, route_baselines};

#[cfg(test)]
pub(crate) use snapshot::rewire_splits;
