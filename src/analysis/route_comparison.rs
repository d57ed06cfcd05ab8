//! Route comparison and the reroute threshold policy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(debug_assertions)]
use crate::config::DF;
use crate::domain::{GeoPoint, RouteCandidate, TrafficLevel};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComparisonError {
    #[error("No routes available")]
    NoRoutes,
    #[error("Current route {0:?} is not among the candidates")]
    UnknownCurrentRoute(String),
}

/// A candidate route paired with its predicted duration.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedRoute {
    pub route: RouteCandidate,
    pub predicted_duration_minutes: f64,
    pub traffic_level: TrafficLevel,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOption {
    pub id: String,
    pub name: String,
    pub distance_km: f64,
    pub duration_minutes: f64,
    /// Traffic-adjusted duration
    pub predicted_duration_minutes: f64,
    pub traffic_level: TrafficLevel,
    pub geometry: Vec<GeoPoint>,
    /// Minutes saved compared to the current route (negative = slower)
    pub savings_vs_current: f64,
    pub confidence: f64,
}

impl RouteOption {
    fn from_prediction(p: PredictedRoute, savings_vs_current: f64) -> Self {
        Self {
            id: p.route.id,
            name: p.route.name,
            distance_km: p.route.distance_km,
            duration_minutes: p.route.duration_minutes,
            predicted_duration_minutes: p.predicted_duration_minutes,
            traffic_level: p.traffic_level,
            geometry: p.route.geometry,
            savings_vs_current,
            confidence: p.confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteComparison {
    pub current_route: RouteOption,
    /// Sorted by predicted duration, fastest first
    pub alternatives: Vec<RouteOption>,
    /// Id of the route to switch to, if any
    pub recommended_switch: Option<String>,
    pub recommendation_reason: Option<String>,
}

impl RouteComparison {
    pub fn recommended(&self) -> Option<&RouteOption> {
        let id = self.recommended_switch.as_deref()?;
        self.alternatives.iter().find(|alt| alt.id == id)
    }
}

fn sort_by_prediction(routes: &mut [PredictedRoute]) {
    routes.sort_by(|a, b| {
        a.predicted_duration_minutes
            .total_cmp(&b.predicted_duration_minutes)
    });
}

/// Rank the candidates, make the fastest one current and decide whether any
/// alternative saves at least `threshold_minutes`.
pub fn compare(
    candidates: Vec<PredictedRoute>,
    threshold_minutes: f64,
) -> Result<RouteComparison, ComparisonError> {
    let mut ranked = candidates;
    if ranked.is_empty() {
        return Err(ComparisonError::NoRoutes);
    }
    sort_by_prediction(&mut ranked);

    let current = ranked.remove(0);
    Ok(build_comparison(current, ranked, threshold_minutes))
}

/// Same policy, but for a traveler already committed to `current_route_id`:
/// every other candidate is an alternative measured against that route.
pub fn compare_with_current(
    candidates: Vec<PredictedRoute>,
    current_route_id: &str,
    threshold_minutes: f64,
) -> Result<RouteComparison, ComparisonError> {
    if candidates.is_empty() {
        return Err(ComparisonError::NoRoutes);
    }

    let (mut current, mut alternatives): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|p| p.route.id == current_route_id);

    if current.is_empty() {
        return Err(ComparisonError::UnknownCurrentRoute(
            current_route_id.to_string(),
        ));
    }
    // Suppliers guarantee distinct ids; anything extra is just another alternative.
    let current_route = current.remove(0);
    alternatives.extend(current);
    sort_by_prediction(&mut alternatives);

    Ok(build_comparison(current_route, alternatives, threshold_minutes))
}

fn build_comparison(
    current: PredictedRoute,
    alternatives: Vec<PredictedRoute>,
    threshold_minutes: f64,
) -> RouteComparison {
    let current_minutes = current.predicted_duration_minutes;
    let current_level = current.traffic_level;

    let alternatives: Vec<RouteOption> = alternatives
        .into_iter()
        .map(|alt| {
            let savings = current_minutes - alt.predicted_duration_minutes;
            RouteOption::from_prediction(alt, savings)
        })
        .collect();

    // Earliest sufficient saver wins, not the largest one.
    let recommendation = alternatives
        .iter()
        .find(|alt| alt.savings_vs_current >= threshold_minutes);

    let (recommended_switch, recommendation_reason) = match recommendation {
        Some(alt) => (
            Some(alt.id.clone()),
            Some(format!(
                "Switch to {} to save ~{:.1} minutes. Traffic on current route is {}.",
                alt.name, alt.savings_vs_current, current_level
            )),
        ),
        None => (None, None),
    };

    #[cfg(debug_assertions)]
    if DF.log_comparison {
        log::info!(
            "Compared {} routes: current {} at {:.1} min, switch = {:?}",
            alternatives.len() + 1,
            current.route.id,
            current_minutes,
            recommended_switch
        );
    }

    RouteComparison {
        current_route: RouteOption::from_prediction(current, 0.0),
        alternatives,
        recommended_switch,
        recommendation_reason,
    }
}
