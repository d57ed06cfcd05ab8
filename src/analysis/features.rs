//! Fixed-layout feature vector shared by training and inference.
//!
//! The order and normalisation of every dimension is a contract: a trained
//! model is only valid for vectors built by [`FeatureVector::extract`].

use std::f64::consts::PI;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::config::FEATURE_COUNT;
use crate::config::constants::features::{
    EVENING_RUSH_HOURS, FIRST_WEEKEND_DAY, MAX_DISTANCE_KM, MAX_DURATION_MINUTES, MAX_INCIDENTS,
    MAX_SPEED_KMH, MORNING_RUSH_HOURS, NEUTRAL_AVG_SPEED,
};
use crate::domain::{RouteCandidate, TrafficLevel, TrafficSnapshot};
use crate::utils::{TimeUtils, WallClock};

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "hour_sin",
    "hour_cos",
    "dow_sin",
    "dow_cos",
    "is_weekend",
    "is_morning_rush",
    "is_evening_rush",
    "month_sin",
    "month_cos",
    "speed_ratio",
    "traffic_level",
    "incident_ratio",
    "has_severe_incident",
    "distance_norm",
    "duration_norm",
    "avg_speed_norm",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Build the feature vector for `route` under `traffic` at wall-clock time `at`.
    /// Never fails: absent traffic counts as free flow with an unknown level.
    pub fn extract<T: WallClock>(
        route: &RouteCandidate,
        traffic: Option<&TrafficSnapshot>,
        at: &T,
    ) -> Self {
        let mut values = [0.0; FEATURE_COUNT];

        let temporal = temporal_features(at);
        let traffic = traffic_features(traffic);
        let route = route_features(route);

        values[..9].copy_from_slice(&temporal);
        values[9..13].copy_from_slice(&traffic);
        values[13..].copy_from_slice(&route);

        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl AsRef<[f64]> for FeatureVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

impl Deref for FeatureVector {
    type Target = [f64; FEATURE_COUNT];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[inline]
fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

#[inline]
fn flag(on: bool) -> f64 {
    if on { 1.0 } else { 0.0 }
}

fn temporal_features<T: WallClock>(at: &T) -> [f64; 9] {
    let (hour_sin, hour_cos) = cyclical(at.fractional_hour(), TimeUtils::HOURS_IN_D as f64);

    let dow = at.weekday_index();
    let (dow_sin, dow_cos) = cyclical(dow as f64, TimeUtils::DAYS_IN_W as f64);

    let hour = at.hour_of_day();
    let (month_sin, month_cos) =
        cyclical(at.month_of_year() as f64, TimeUtils::MONTHS_IN_Y as f64);

    [
        hour_sin,
        hour_cos,
        dow_sin,
        dow_cos,
        flag(dow >= FIRST_WEEKEND_DAY),
        flag(MORNING_RUSH_HOURS.contains(&hour)),
        flag(EVENING_RUSH_HOURS.contains(&hour)),
        month_sin,
        month_cos,
    ]
}

fn traffic_features(traffic: Option<&TrafficSnapshot>) -> [f64; 4] {
    let Some(traffic) = traffic else {
        return [1.0, TrafficLevel::Unknown.score(), 0.0, 0.0];
    };

    let incident_ratio = traffic.incidents.len().min(MAX_INCIDENTS) as f64 / MAX_INCIDENTS as f64;

    [
        traffic.speed_ratio_or_default(),
        traffic.level.score(),
        incident_ratio,
        flag(traffic.has_severe_incident()),
    ]
}

fn route_features(route: &RouteCandidate) -> [f64; 3] {
    let distance = route.distance_km;
    let duration = route.duration_minutes;

    let avg_speed_norm = if duration > 0.0 {
        let avg_speed_kmh = distance / (duration / 60.0);
        (avg_speed_kmh / MAX_SPEED_KMH).min(1.0)
    } else {
        NEUTRAL_AVG_SPEED
    };

    [
        (distance / MAX_DISTANCE_KM).min(1.0),
        (duration / MAX_DURATION_MINUTES).min(1.0),
        avg_speed_norm,
    ]
}
