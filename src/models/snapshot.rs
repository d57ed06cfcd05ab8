use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::constants::model::NEUTRAL_MULTIPLIER;
use crate::domain::{RouteCandidate, TripRecord};
use crate::models::DurationModel;

/// Everything one training run produces. Replaced as a whole, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictorSnapshot {
    pub model: DurationModel,
    /// Average realized multiplier per route id.
    pub route_baselines: HashMap<String, f64>,
}

impl PredictorSnapshot {
    pub fn new(model: DurationModel, route_baselines: HashMap<String, f64>) -> Self {
        Self {
            model,
            route_baselines,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_trained()
    }

    /// False when restored parameters could not be evaluated safely.
    pub fn is_consistent(&self) -> bool {
        self.model.is_consistent() && self.route_baselines.values().all(|m| m.is_finite())
    }

    /// Historical multiplier for a route; neutral when the route has no history.
    pub fn historical_multiplier(&self, route_id: &str) -> f64 {
        self.route_baselines
            .get(route_id)
            .copied()
            .unwrap_or(NEUTRAL_MULTIPLIER)
    }
}

/// Denominator of a realized multiplier. Sub-minute or missing base durations count as one minute.
pub fn multiplier_base(route: &RouteCandidate) -> f64 {
    route.duration_minutes.max(1.0)
}

/// Mean realized/base multiplier per route for trips that know both values.
pub fn route_baselines(history: &[TripRecord]) -> HashMap<String, f64> {
    let mut sums: HashMap<String, (f64, usize)> = HashMap::new();

    for trip in history {
        let (Some(actual), Some(route), Some(key)) =
            (trip.realized_duration(), trip.route.as_ref(), trip.route_key())
        else {
            continue;
        };
        let entry = sums.entry(key.to_string()).or_insert((0.0, 0));
        entry.0 += actual / multiplier_base(route);
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(id, (sum, count))| (id, sum / count as f64))
        .collect()
}

/// Point every split child in a serialized model at `to(node_id)`.
#[cfg(test)]
pub(crate) fn rewire_splits(value: &mut serde_json::Value, to: fn(usize) -> usize) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::Array(nodes)) = map.get_mut("nodes") {
                for (id, node) in nodes.iter_mut().enumerate() {
                    if let Some(split) = node.get_mut("Split") {
                        split["left"] = to(id).into();
                        split["right"] = to(id).into();
                    }
                }
            }
            for child in map.values_mut() {
                rewire_splits(child, to);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                rewire_splits(item, to);
            }
        }
        _ => {}
    }
}
