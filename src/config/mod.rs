//! Configuration module for the route prediction core.

mod debug;
mod persistence;
mod prediction;

// Public
pub mod constants;

// Re-export commonly used items
pub use constants::FEATURE_COUNT;
pub use debug::DF;
pub use persistence::PERSISTENCE;
pub use prediction::{
    DEFAULT_HISTORICAL_DATA_DAYS, DEFAULT_PREDICTION_HORIZON_MINUTES,
    DEFAULT_REROUTE_THRESHOLD_MINUTES, PredictionConfig,
};
