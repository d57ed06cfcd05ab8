mod advisor;
mod confidence;
mod predictor;
mod state;

pub use advisor::CommuteAdvisor;
pub use confidence::ConfidenceCache;
pub use predictor::{DurationEstimate, MultiplierSource, TrafficPredictor, TrainingOutcome};
pub use state::ModelHandle;
