//! Runtime configuration supplied by the host process.

use serde::{Deserialize, Serialize};

use crate::config::PERSISTENCE;

pub const DEFAULT_REROUTE_THRESHOLD_MINUTES: f64 = 2.0;
pub const DEFAULT_PREDICTION_HORIZON_MINUTES: u32 = 30;
pub const DEFAULT_HISTORICAL_DATA_DAYS: u32 = 90;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Alert if an alternate saves at least this much time
    pub reroute_threshold_minutes: f64,
    /// How far ahead predictions look
    pub prediction_horizon_minutes: u32,
    /// Only history started within this many days is used for training and analysis
    pub historical_data_days: u32,
    /// Where the trained model blob lives
    pub model_path: String,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            reroute_threshold_minutes: DEFAULT_REROUTE_THRESHOLD_MINUTES,
            prediction_horizon_minutes: DEFAULT_PREDICTION_HORIZON_MINUTES,
            historical_data_days: DEFAULT_HISTORICAL_DATA_DAYS,
            model_path: PERSISTENCE.model.path.to_string(),
        }
    }
}

impl PredictionConfig {
    pub const ENV_REROUTE_THRESHOLD: &'static str = "REROUTE_THRESHOLD_MINUTES";
    pub const ENV_HORIZON: &'static str = "PREDICTION_HORIZON_MINUTES";
    pub const ENV_HISTORY_DAYS: &'static str = "HISTORICAL_DATA_DAYS";
    pub const ENV_MODEL_PATH: &'static str = "MODEL_PATH";

    /// Defaults overlaid with any of the recognised environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, Self::ENV_REROUTE_THRESHOLD) {
            config.reroute_threshold_minutes = v;
        }
        if let Some(v) = parse_var(&lookup, Self::ENV_HORIZON) {
            config.prediction_horizon_minutes = v;
        }
        if let Some(v) = parse_var(&lookup, Self::ENV_HISTORY_DAYS) {
            config.historical_data_days = v;
        }
        if let Some(path) = lookup(Self::ENV_MODEL_PATH) {
            config.model_path = path;
        }

        config
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring unparseable {}={:?}, keeping default", key, raw);
            None
        }
    }
}
