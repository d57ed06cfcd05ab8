use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;

use crate::analysis::{FeatureVector, PredictedRoute};
use crate::config::constants::ensemble::{CONFIDENCE_HEURISTIC, CONFIDENCE_TRAINED};
use crate::config::constants::features::{EVENING_RUSH_HOURS, MIDDAY_HOURS, MORNING_RUSH_HOURS};
use crate::config::constants::heuristic::{
    DEFAULT_MULTIPLIER, MIDDAY_TREND, OFF_PEAK_TREND, RUSH_TREND,
};
use crate::config::constants::model::{MAX_MULTIPLIER, MIN_MULTIPLIER, MIN_TRAINING_SAMPLES};
#[cfg(debug_assertions)]
use crate::config::DF;
use crate::data::{ModelStore, load_snapshot_or_default, parse_history};
use crate::domain::{RouteCandidate, TrafficLevel, TrafficSnapshot, TripRecord};
use crate::models::{
    DurationModel, ENSEMBLE_WEIGHTS, EnsembleWeights, ModelError, PredictorSnapshot,
    multiplier_base, route_baselines,
};
use crate::utils::{WallClock, now_local, round1};

use super::confidence::ConfidenceCache;
use super::state::ModelHandle;

/// Which path produced a multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MultiplierSource {
    Ensemble,
    /// Inference failed and the rule-based estimate was used instead.
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationEstimate {
    pub minutes: f64,
    /// Final multiplier after clamping.
    pub multiplier: f64,
    pub source: MultiplierSource,
    pub traffic_level: TrafficLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingOutcome {
    pub records_seen: usize,
    pub samples_used: usize,
    pub trained: bool,
    pub persisted: bool,
}

/// Blends the trained model, per-route history and live conditions into a
/// predicted duration. Shared behind an `Arc`; all methods take `&self`.
pub struct TrafficPredictor {
    handle: ModelHandle,
    confidence: ConfidenceCache,
    store: Option<Arc<dyn ModelStore>>,
    weights: EnsembleWeights,
}

impl Default for TrafficPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficPredictor {
    /// Untrained and not persisted.
    pub fn new() -> Self {
        Self::from_snapshot(PredictorSnapshot::default())
    }

    pub fn from_snapshot(snapshot: PredictorSnapshot) -> Self {
        Self {
            handle: ModelHandle::new(snapshot),
            confidence: ConfidenceCache::new(),
            store: None,
            weights: ENSEMBLE_WEIGHTS,
        }
    }

    /// Restore from `store` (untrained if that fails) and persist future training runs to it.
    pub fn with_store(store: Arc<dyn ModelStore>) -> Self {
        let snapshot = load_snapshot_or_default(store.as_ref());
        Self {
            store: Some(store),
            ..Self::from_snapshot(snapshot)
        }
    }

    pub fn is_trained(&self) -> bool {
        self.handle.load().is_trained()
    }

    pub fn snapshot(&self) -> Arc<PredictorSnapshot> {
        self.handle.load()
    }

    pub fn feature_importance(&self) -> BTreeMap<&'static str, f64> {
        self.handle.load().model.feature_importance()
    }

    /// Weighted blend of model output (neutral while untrained) and the two supplied multipliers.
    pub fn predict(
        &self,
        features: &FeatureVector,
        historical_multiplier: f64,
        current_multiplier: f64,
    ) -> Result<f64, ModelError> {
        let snapshot = self.handle.load();
        self.blend(&snapshot.model, features, historical_multiplier, current_multiplier)
    }

    fn blend(
        &self,
        model: &DurationModel,
        features: &FeatureVector,
        historical_multiplier: f64,
        current_multiplier: f64,
    ) -> Result<f64, ModelError> {
        let model_multiplier = model.predict(features)?;
        let blended = self
            .weights
            .blend(model_multiplier, historical_multiplier, current_multiplier);
        if blended.is_finite() {
            Ok(blended)
        } else {
            Err(ModelError::NonFinite)
        }
    }

    /// Predicted minutes for `route`, `horizon_minutes` ahead of now. Always returns a number.
    pub fn predict_duration(
        &self,
        route: &RouteCandidate,
        traffic: Option<&TrafficSnapshot>,
        horizon_minutes: u32,
    ) -> f64 {
        self.estimate_duration_at(route, traffic, horizon_minutes, &now_local())
            .minutes
    }

    /// Full estimate with the multiplier source exposed.
    /// Features are taken halfway through the horizon.
    pub fn estimate_duration_at(
        &self,
        route: &RouteCandidate,
        traffic: Option<&TrafficSnapshot>,
        horizon_minutes: u32,
        now: &DateTime<FixedOffset>,
    ) -> DurationEstimate {
        let base = route.duration_minutes.max(0.0);
        let at = *now + Duration::minutes(i64::from(horizon_minutes / 2));
        let features = FeatureVector::extract(route, traffic, &at);

        let snapshot = self.handle.load();
        let current = Self::heuristic_multiplier(traffic, now);
        let historical = snapshot.historical_multiplier(&route.id);

        let (raw, source) = match self.blend(&snapshot.model, &features, historical, current) {
            Ok(m) => (m, MultiplierSource::Ensemble),
            Err(e) => {
                log::warn!(
                    "Prediction for route {} fell back to heuristic: {}",
                    route.id,
                    e
                );
                (current, MultiplierSource::Heuristic)
            }
        };
        let multiplier = raw.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER);
        let minutes = round1(base * multiplier);

        #[cfg(debug_assertions)]
        if DF.log_predictions {
            log::info!(
                "PREDICT [{}]: base {:.1} x {:.3} ({:?}; hist {:.3}, current {:.3}) = {:.1} min",
                route.id,
                base,
                multiplier,
                source,
                historical,
                current,
                minutes
            );
        }

        DurationEstimate {
            minutes,
            multiplier,
            source,
            traffic_level: traffic.map(|t| t.level).unwrap_or_default(),
        }
    }

    /// Rule-based multiplier from live conditions: inverse speed ratio adjusted
    /// by the time-of-day trend, capped at the maximum multiplier.
    pub fn heuristic_multiplier<T: WallClock>(traffic: Option<&TrafficSnapshot>, at: &T) -> f64 {
        let speed_ratio = traffic.map_or(1.0, TrafficSnapshot::speed_ratio_or_default);
        let base = if speed_ratio > 0.0 {
            1.0 / speed_ratio
        } else {
            DEFAULT_MULTIPLIER
        };

        let hour = at.hour_of_day();
        let trend = if MORNING_RUSH_HOURS.contains(&hour) || EVENING_RUSH_HOURS.contains(&hour) {
            RUSH_TREND
        } else if MIDDAY_HOURS.contains(&hour) {
            MIDDAY_TREND
        } else {
            OFF_PEAK_TREND
        };

        (base * trend).min(MAX_MULTIPLIER)
    }

    /// 0.7 with a trained model, 0.4 on heuristics alone. Memoised per route id
    /// until the next snapshot is installed.
    pub fn confidence(&self, route: &RouteCandidate) -> f64 {
        self.confidence.get_or_insert_with(&route.id, || {
            if self.handle.load().is_trained() {
                CONFIDENCE_TRAINED
            } else {
                CONFIDENCE_HEURISTIC
            }
        })
    }

    /// Predict one candidate and package it for comparison.
    pub fn predict_route(
        &self,
        route: RouteCandidate,
        traffic: Option<&TrafficSnapshot>,
        horizon_minutes: u32,
        now: &DateTime<FixedOffset>,
    ) -> PredictedRoute {
        let estimate = self.estimate_duration_at(&route, traffic, horizon_minutes, now);
        let confidence = self.confidence(&route);
        PredictedRoute {
            route,
            predicted_duration_minutes: estimate.minutes,
            traffic_level: estimate.traffic_level,
            confidence,
        }
    }

    /// Train from raw history values. Malformed entries are skipped individually.
    pub fn train_on_history(&self, history: &[serde_json::Value]) -> Result<TrainingOutcome> {
        let records = parse_history(history);
        let mut outcome = self.train_on_records(&records)?;
        outcome.records_seen = history.len();
        Ok(outcome)
    }

    /// Build a complete new snapshot, install it and persist it.
    /// Fewer than the minimum usable samples leaves the active snapshot untouched.
    pub fn train_on_records(&self, records: &[TripRecord]) -> Result<TrainingOutcome> {
        let (features, targets) = training_samples(records);
        let mut outcome = TrainingOutcome {
            records_seen: records.len(),
            samples_used: features.len(),
            ..TrainingOutcome::default()
        };

        if features.len() < MIN_TRAINING_SAMPLES {
            log::info!(
                "Skipping training: {} usable samples (need {})",
                features.len(),
                MIN_TRAINING_SAMPLES
            );
            return Ok(outcome);
        }

        let mut model = DurationModel::untrained();
        crate::trace_time!("Train duration model", 50_000, {
            model.fit(&features, &targets);
        });
        let snapshot = Arc::new(PredictorSnapshot::new(model, route_baselines(records)));
        outcome.trained = snapshot.is_trained();

        self.install(Arc::clone(&snapshot));

        if let Some(store) = &self.store {
            store
                .save(&snapshot)
                .context("persisting trained model")?;
            outcome.persisted = true;
        }

        #[cfg(debug_assertions)]
        if DF.log_training {
            log::info!(
                "TRAIN: {} of {} records used, {} route baselines, persisted = {}",
                outcome.samples_used,
                outcome.records_seen,
                snapshot.route_baselines.len(),
                outcome.persisted
            );
        }

        Ok(outcome)
    }

    /// Swap in a new snapshot and drop memoised confidences tied to the old one.
    pub fn install(&self, snapshot: Arc<PredictorSnapshot>) {
        self.handle.swap(snapshot);
        self.confidence.clear();
    }
}

/// (features, multiplier target) per record with a realized duration.
/// Records without an embedded route use neutral route features and base 1 minute.
fn training_samples(records: &[TripRecord]) -> (Vec<FeatureVector>, Vec<f64>) {
    let mut features = Vec::with_capacity(records.len());
    let mut targets = Vec::with_capacity(records.len());

    for trip in records {
        let Some(actual) = trip.realized_duration() else {
            continue;
        };
        let route = trip.route.clone().unwrap_or_default();
        let expected = multiplier_base(&route);

        let fv = FeatureVector::extract(&route, trip.traffic_conditions.as_ref(), &trip.started_at);
        let target = actual / expected;
        if !fv.is_finite() || !target.is_finite() {
            log::warn!("Skipping trip {} with non-finite training values", trip.id);
            continue;
        }
        features.push(fv);
        targets.push(target);
    }

    (features, targets)
}
